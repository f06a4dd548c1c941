pub mod app;
pub mod window;

pub use app::{
    App,
    Example,
};
