//! Helpers for extracting data from opcodes.
use std::fmt::{self, Display, Formatter};

use crate::constants::*;

/// A single decoded instruction.
///
/// Each instruction is two bytes, big-endian, with the opcode
/// family in the first 4-bit nibble. The remaining fields are
/// all extracted up front; which of them are meaningful depends
/// on the family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    /// Opcode family. `0xF000`
    pub op: u8,
    /// Register index X. `0x0F00`
    pub x: u8,
    /// Register index Y. `0x00F0`
    pub y: u8,
    /// 4-bit count or sub-opcode. `0x000F`
    pub n: u8,
    /// 8-bit immediate. `0x00FF`
    pub nn: u8,
    /// 12-bit address. `0x0FFF`
    pub nnn: Address,
}

impl Instr {
    #[inline(always)]
    pub fn from_bytes([a, b]: [u8; 2]) -> Self {
        Self {
            op: a >> 4,
            x: a & 0xF,
            y: b >> 4,
            n: b & 0xF,
            nn: b,
            nnn: (((a as u16) & 0xF) << 8) | b as u16,
        }
    }

    /// Fetch the instruction from the buffer at the cursor.
    ///
    /// The cursor wraps around the address space.
    #[inline(always)]
    pub fn fetch(bytecode: &[u8], cursor: usize) -> Self {
        Self::from_bytes([
            bytecode[cursor & ADDRESS_MASK],
            bytecode[(cursor + 1) & ADDRESS_MASK],
        ])
    }

    /// Raw 16-bit encoding.
    #[inline]
    pub fn code(&self) -> u16 {
        ((self.op as u16) << 12) | ((self.x as u16) << 8) | self.nn as u16
    }
}

/// Assembly-style mnemonic, for tracing and disassembly listings.
impl Display for Instr {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self { op, x, y, n, nn, nnn } = *self;

        match (op, nn) {
            (0x0, 0xE0) => write!(f, "CLS"),
            (0x0, 0xEE) => write!(f, "RET"),
            (0x0, 0xFB) => write!(f, "SCR"),
            (0x0, 0xFC) => write!(f, "SCL"),
            (0x0, 0xFD) => write!(f, "EXIT"),
            (0x0, 0xFE) => write!(f, "LOW"),
            (0x0, 0xFF) => write!(f, "HIGH"),
            (0x0, _) if x == 0 && y == 0xC => write!(f, "SCD  {n:X}"),
            (0x1, _) => write!(f, "JP   {nnn:03X}"),
            (0x2, _) => write!(f, "CALL {nnn:03X}"),
            (0x3, _) => write!(f, "SE   V{x:X}, {nn:02X}"),
            (0x4, _) => write!(f, "SNE  V{x:X}, {nn:02X}"),
            (0x5, _) if n == 0 => write!(f, "SE   V{x:X}, V{y:X}"),
            (0x6, _) => write!(f, "LD   V{x:X}, {nn:02X}"),
            (0x7, _) => write!(f, "ADD  V{x:X}, {nn:02X}"),
            (0x8, _) => match n {
                0x0 => write!(f, "LD   V{x:X}, V{y:X}"),
                0x1 => write!(f, "OR   V{x:X}, V{y:X}"),
                0x2 => write!(f, "AND  V{x:X}, V{y:X}"),
                0x3 => write!(f, "XOR  V{x:X}, V{y:X}"),
                0x4 => write!(f, "ADD  V{x:X}, V{y:X}"),
                0x5 => write!(f, "SUB  V{x:X}, V{y:X}"),
                0x6 => write!(f, "SHR  V{x:X}"),
                0x7 => write!(f, "SUBN V{x:X}, V{y:X}"),
                0xE => write!(f, "SHL  V{x:X}"),
                _ => self.fmt_data(f),
            },
            (0x9, _) if n == 0 => write!(f, "SNE  V{x:X}, V{y:X}"),
            (0xA, _) => write!(f, "LD   I, {nnn:03X}"),
            (0xB, _) => write!(f, "JP   V0, {nnn:03X}"),
            (0xC, _) => write!(f, "RND  V{x:X}, {nn:02X}"),
            (0xD, _) => write!(f, "DRW  V{x:X}, V{y:X}, {n:X}"),
            (0xE, 0x9E) => write!(f, "SKP  V{x:X}"),
            (0xE, 0xA1) => write!(f, "SKNP V{x:X}"),
            (0xF, 0x07) => write!(f, "LD   V{x:X}, DT"),
            (0xF, 0x0A) => write!(f, "LD   V{x:X}, K"),
            (0xF, 0x15) => write!(f, "LD   DT, V{x:X}"),
            (0xF, 0x18) => write!(f, "LD   ST, V{x:X}"),
            (0xF, 0x1E) => write!(f, "ADD  I, V{x:X}"),
            (0xF, 0x29) => write!(f, "LD   F, V{x:X}"),
            (0xF, 0x30) => write!(f, "LD   HF, V{x:X}"),
            (0xF, 0x33) => write!(f, "LD   B, V{x:X}"),
            (0xF, 0x55) => write!(f, "LD   [I], V{x:X}"),
            (0xF, 0x65) => write!(f, "LD   V{x:X}, [I]"),
            (0xF, 0x75) => write!(f, "LD   R, V{x:X}"),
            (0xF, 0x85) => write!(f, "LD   V{x:X}, R"),
            _ => self.fmt_data(f),
        }
    }
}

impl Instr {
    /// Unrecognised words are listed as raw data.
    fn fmt_data(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DW   {:04X}", self.code())
    }
}

/// Write a listing of the given bytecode, one instruction per line,
/// addressed as if it were loaded at [`MEM_START`].
pub fn disassemble<W: fmt::Write>(bytecode: &[u8], w: &mut W) -> fmt::Result {
    for (i, chunk) in bytecode.chunks(2).enumerate() {
        let offset = MEM_START + i * 2;
        match *chunk {
            [a, b] => writeln!(w, "{offset:04X}: {a:02X}{b:02X}  {}", Instr::from_bytes([a, b]))?,
            // Odd trailing byte.
            [a] => writeln!(w, "{offset:04X}: {a:02X}    DB   {a:02X}")?,
            _ => unreachable!("chunks(2) yields one or two bytes"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_fields() {
        let instr = Instr::from_bytes([0xD1, 0x2F]);
        assert_eq!(instr.op, 0xD);
        assert_eq!(instr.x, 0x1);
        assert_eq!(instr.y, 0x2);
        assert_eq!(instr.n, 0xF);
        assert_eq!(instr.nn, 0x2F);
        assert_eq!(instr.nnn, 0x12F);
        assert_eq!(instr.code(), 0xD12F);
    }

    #[test]
    fn test_fetch_wraps_address() {
        let mut ram = [0u8; MEM_SIZE];
        ram[MEM_SIZE - 1] = 0x12;
        ram[0] = 0x34;
        let instr = Instr::fetch(&ram, MEM_SIZE - 1);
        assert_eq!(instr.code(), 0x1234);
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Instr::from_bytes([0x00, 0xE0]).to_string(), "CLS");
        assert_eq!(Instr::from_bytes([0x00, 0xC4]).to_string(), "SCD  4");
        assert_eq!(Instr::from_bytes([0x12, 0x34]).to_string(), "JP   234");
        assert_eq!(Instr::from_bytes([0x80, 0x14]).to_string(), "ADD  V0, V1");
        assert_eq!(Instr::from_bytes([0xF3, 0x0A]).to_string(), "LD   V3, K");
        assert_eq!(Instr::from_bytes([0x51, 0x23]).to_string(), "DW   5123");
    }

    #[test]
    fn test_disassemble_listing() {
        let mut buf = String::new();
        disassemble(&[0x60, 0x05, 0x00, 0xEE, 0xAB], &mut buf).unwrap();
        let lines: Vec<&str> = buf.lines().collect();
        assert_eq!(lines[0], "0200: 6005  LD   V0, 05");
        assert_eq!(lines[1], "0202: 00EE  RET");
        assert_eq!(lines[2], "0204: AB    DB   AB");
    }
}
