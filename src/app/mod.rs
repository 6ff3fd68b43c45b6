pub mod commands;
pub mod render;

pub use commands::{run, App};
pub use render::Renderer;
