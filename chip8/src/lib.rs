//! Chip-8 virtual machine.
mod bytecode;
mod clock;
pub mod constants;
mod cpu;
mod devices;
mod disasm;
mod display;
mod error;
mod instr;
mod timer;
mod vm;

pub use self::{
    clock::{Clock, Hz},
    devices::{Devices, InvalidKeyCode, KeyCode},
    display::FrameBuffer,
    instr::Op,
    timer::Timers,
    vm::Flow,
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        cpu::Chip8Cpu,
        devices::{Devices, KeyCode},
        disasm::Disassembler,
        error::{Chip8Error, Chip8Result},
        vm::{Chip8Conf, Chip8Vm, Flow},
    };
}
