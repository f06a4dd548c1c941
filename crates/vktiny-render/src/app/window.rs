use crate::config::ContextCreateInfo;
use anyhow::Result;
use winit::{
    dpi::PhysicalSize,
    event_loop::ActiveEventLoop,
    window::{
        Window,
        WindowAttributes,
    },
};

/// Fixed-size window; the swapchain is never recreated.
pub fn create_window(
    event_loop: &ActiveEventLoop,
    create_info: &ContextCreateInfo,
) -> Result<Window> {
    let window_attributes = WindowAttributes::default()
        .with_title(create_info.title.clone())
        .with_inner_size(PhysicalSize::new(create_info.width, create_info.height))
        .with_resizable(false);
    Ok(event_loop.create_window(window_attributes)?)
}
