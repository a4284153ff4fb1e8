//! Application errors
use std::fmt;

#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Chip8(err) => Some(err),
            ErrorKind::Io(err) => Some(err),
            ErrorKind::Window(err) => Some(err),
            ErrorKind::Gl(err) => Some(err),
            ErrorKind::Config(err) => Some(err),
            ErrorKind::Platform(_) | ErrorKind::Usage => None,
        }
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    Chip8(chip8::prelude::Chip8Error),
    Io(std::io::Error),
    Window(winit::error::OsError),
    /// OpenGL context or surface.
    Gl(glutin::error::Error),
    /// Display and window setup failed before a context existed.
    Platform(String),
    Config(serde_yaml::Error),
    /// Command line arguments are missing.
    Usage,
}

impl AppError {
    pub fn usage() -> Self {
        Self {
            kind: ErrorKind::Usage,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "application error: {}", self.kind)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chip8(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Window(err) => write!(f, "{err}"),
            Self::Gl(err) => write!(f, "opengl: {err}"),
            Self::Platform(msg) => write!(f, "platform: {msg}"),
            Self::Config(err) => write!(f, "config: {err}"),
            Self::Usage => write!(f, "usage: chip8-win FILE"),
        }
    }
}

impl From<chip8::prelude::Chip8Error> for AppError {
    fn from(err: chip8::prelude::Chip8Error) -> Self {
        Self {
            kind: ErrorKind::Chip8(err),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::Io(err),
        }
    }
}

impl From<winit::error::OsError> for AppError {
    fn from(err: winit::error::OsError) -> Self {
        Self {
            kind: ErrorKind::Window(err),
        }
    }
}

impl From<glutin::error::Error> for AppError {
    fn from(err: glutin::error::Error) -> Self {
        Self {
            kind: ErrorKind::Gl(err),
        }
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        Self {
            kind: ErrorKind::Config(err),
        }
    }
}
