//! Constant values of the SuperCHIP architecture.

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 0x10; // 16

/// Index of the VF register, which doubles as the carry, borrow and collision flag.
pub const FLAG_REGISTER: usize = 0xF;

/// The lower memory space was historically used for the interpreter itself,
/// but is now used for fonts.
pub const MEM_START: usize = 0x200; // 512
pub const MEM_SIZE: usize = 0x1000; // 4096

/// Largest program that fits between the load base and the end of memory.
pub const MAX_PROGRAM_SIZE: usize = MEM_SIZE - MEM_START;

/// Memory addressing wraps around the 12-bit address space.
///
/// Every address computed from the program counter or the address
/// register, plus an offset, is masked with this value before access.
pub const ADDRESS_MASK: usize = MEM_SIZE - 1;

/// Levels of nesting allowed in the call stack.
///
/// A call made while the stack is full is dropped, and execution
/// continues at the next instruction. A return on an empty stack
/// is dropped in the same way.
pub const STACK_SIZE: usize = 16;

/// Standard (low resolution) display dimensions.
pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Extended (high resolution) display dimensions.
pub const EXT_DISPLAY_WIDTH: usize = 128;
pub const EXT_DISPLAY_HEIGHT: usize = 64;

/// The display buffer is sized for the larger of the two modes.
pub const DISPLAY_BUFFER_SIZE: usize = EXT_DISPLAY_WIDTH * EXT_DISPLAY_HEIGHT;

/// Number of columns shifted by the horizontal scroll instructions.
pub const SCROLL_COLUMNS: usize = 4;

/// Start of the 5-byte hexadecimal glyphs in memory.
pub const FONT_START: usize = 0x000;
pub const FONT_GLYPH_SIZE: usize = 5;
pub const FONT_GLYPH_COUNT: usize = 16;
pub const FONT_DATA_LENGTH: usize = FONT_GLYPH_SIZE * FONT_GLYPH_COUNT; // 80

/// Start of the 10-byte decimal glyphs used in extended mode.
///
/// Packed directly after the standard font.
pub const HIRES_FONT_START: usize = FONT_START + FONT_DATA_LENGTH; // 0x050
pub const HIRES_FONT_GLYPH_SIZE: usize = 10;
pub const HIRES_FONT_GLYPH_COUNT: usize = 10;
pub const HIRES_FONT_DATA_LENGTH: usize = HIRES_FONT_GLYPH_SIZE * HIRES_FONT_GLYPH_COUNT; // 100

/// Number of RPL user flags available to `Fx75` and `Fx85`.
pub const USER_FLAG_COUNT: usize = 8;

/// Instruction cycles executed per step when not configured.
///
/// One step is one 60 Hz timer tick, so this runs programs at 24,000
/// instructions per second, fast enough for SuperCHIP games.
pub const DEFAULT_CYCLES_PER_STEP: usize = 400;

/// Number of keys on the keyboard (0x0-0xF)
pub const KEY_COUNT: u8 = 16;

/// Type for storing the 12-bit memory addresses.
pub type Address = u16;
