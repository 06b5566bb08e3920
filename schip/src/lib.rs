mod bytecode;
pub mod constants;
mod cpu;
mod display;
mod error;
mod keys;
mod vm;

pub use self::{
    bytecode::{disassemble, Instr},
    error::{Chip8Error, Chip8Result},
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        display::DisplayMode,
        error::{Chip8Error, Chip8Result},
        keys::{InvalidKeyCode, KeyCode},
        vm::{Chip8Conf, Chip8Vm, Flow, Quirks, Timers},
    };
}
