pub mod accel_struct;
pub mod app;
pub mod common;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod pipeline;
pub mod raytracing;
pub mod resource;
pub mod shader;
pub mod utils;

pub use app::{
    App,
    Example,
};
pub use config::ContextCreateInfo;
pub use context::{
    Context,
    FrameInfo,
};
pub use resource::ResourceManager;
