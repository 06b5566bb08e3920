//! Result and errors.
use std::fmt::{self, Display, Formatter};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Program or font source could not be read.
    Io(std::io::Error),
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram,
    /// Font data does not match the expected glyph table size.
    Font(String),
    /// Key index outside of the 16 keypad keys.
    InvalidKey(u8),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "load error: {}", err),
            Self::LargeProgram => write!(f, "program too large for VM memory"),
            Self::Font(msg) => write!(f, "font error: {}", msg),
            Self::InvalidKey(key) => write!(f, "key index {} is out of range 0-15", key),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
