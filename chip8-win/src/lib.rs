mod app;
mod config;
mod error;
mod inputmap;
mod render;
mod window;

pub use self::{
    app::Chip8App,
    config::{AppConfig, CONFIG_ENV, DEFAULT_CONFIG},
    error::{AppError, ErrorKind},
    inputmap::{InputDef, InputKind, InputMap},
};

pub type EventLoop = winit::event_loop::EventLoop<()>;

/// Named actions that can be bound to keys in the configuration.
pub mod actions {
    pub const EXIT: &str = "exit";
}
