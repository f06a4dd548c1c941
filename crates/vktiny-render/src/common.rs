pub mod buffer;
pub mod command_buffer;
pub mod command_pool;
pub mod consts;
pub mod debug;
pub mod descriptor_pool;
pub mod descriptor_set_layout;
pub mod device;
pub mod extension;
pub mod extra_functions;
pub mod image;
pub mod image_view;
pub mod index;
pub mod instance;
pub mod layer;
pub mod memory;
pub mod mesh;
pub mod pipeline_layout;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod vertex;
