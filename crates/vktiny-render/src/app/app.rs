use super::window::create_window;
use crate::{
    config::ContextCreateInfo,
    context::Context,
    utils::time::{
        get_fps,
        Timer,
    },
};
use anyhow::Result;
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{
        ActiveEventLoop,
        ControlFlow,
        EventLoop,
    },
    window::WindowId,
};

const FPS_LOG_INTERVAL: Duration = Duration::from_secs(1);

pub trait Example: Sized {
    fn prepare(context: &mut Context) -> Result<Self>;

    fn draw(&mut self, context: &mut Context) -> Result<()>;
}

/// Runs an [`Example`] inside a winit event loop.
///
/// The example is dropped before the context.
pub struct App<E: Example> {
    example: Option<E>,
    context: Option<Context>,
    create_info: ContextCreateInfo,
    timer: Timer,
    frame_count: u32,
    error: Option<anyhow::Error>,
}

impl<E: Example> App<E> {
    pub fn new(create_info: ContextCreateInfo) -> Self {
        Self {
            example: None,
            context: None,
            create_info,
            timer: Timer::new(),
            frame_count: 0,
            error: None,
        }
    }

    pub fn run(create_info: ContextCreateInfo) -> Result<()> {
        let event_loop = EventLoop::builder().build()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        let mut app = Self::new(create_info);
        event_loop.run_app(&mut app)?;
        match app.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        log::info!("creating window");
        let window = create_window(event_loop, &self.create_info)?;
        let mut context = Context::new(window, &self.create_info)?;

        log::info!("preparing example");
        let example = E::prepare(&mut context)?;
        self.context = Some(context);
        self.example = Some(example);
        self.timer = Timer::new();
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        let (Some(example), Some(context)) = (self.example.as_mut(), self.context.as_mut()) else {
            return Ok(());
        };
        example.draw(context)?;

        self.frame_count += 1;
        if self.timer.get_elapsed() >= FPS_LOG_INTERVAL {
            let elapsed = self.timer.get_elapsed_and_reset();
            log::info!("{:.1} fps", self.frame_count as f32 * get_fps(&elapsed));
            self.frame_count = 0;
        }
        Ok(())
    }

    fn exit_with_error(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.error.get_or_insert(err);
        event_loop.exit();
    }
}

impl<E: Example> ApplicationHandler for App<E> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() || self.error.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.exit_with_error(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        window_event: WindowEvent,
    ) {
        match window_event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                if let Some(context) = self.context.as_ref() {
                    if let Err(err) = context.device_wait_idle() {
                        self.exit_with_error(event_loop, err);
                        return;
                    }
                }
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.draw_frame() {
                    self.exit_with_error(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if event_loop.exiting() {
            return;
        }
        if let Some(context) = self.context.as_ref() {
            context.window().request_redraw();
        }
    }
}

impl<E: Example> Drop for App<E> {
    fn drop(&mut self) {
        if let Some(context) = self.context.as_ref() {
            if let Err(err) = context.device_wait_idle() {
                log::error!("failed to wait for device idle: {:?}", err);
            }
        }
    }
}
