//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::{Address, MAX_PROGRAM_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize },
    /// Instruction word that matches no known opcode.
    ///
    /// The machine state is left untouched when this is returned.
    UnknownOpcode { opcode: u16, address: Address },
    /// Subroutine call with a full call stack.
    StackOverflow { address: Address },
    /// Return from subroutine with an empty call stack.
    StackUnderflow { address: Address },
    /// Program file could not be read.
    Io(std::io::Error),
    Fmt(fmt::Error),
}

impl Chip8Error {
    /// Whether the error was raised by the interpreter loop, as opposed
    /// to loading or formatting.
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::UnknownOpcode { .. } | Self::StackOverflow { .. } | Self::StackUnderflow { .. }
        )
    }
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeProgram { size } => write!(
                f,
                "program too large for VM memory: {size} bytes, maximum is {MAX_PROGRAM_SIZE}"
            ),
            Self::UnknownOpcode { opcode, address } => {
                write!(f, "runtime error: unknown opcode {opcode:04X} at {address:04X}")
            }
            Self::StackOverflow { address } => {
                write!(f, "runtime error: call stack overflow at {address:04X}")
            }
            Self::StackUnderflow { address } => {
                write!(f, "runtime error: call stack underflow at {address:04X}")
            }
            Self::Io(err) => write!(f, "{}", err),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Fmt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
