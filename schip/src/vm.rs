//! Virtual machine.
use std::{
    fmt::{self, Write},
    io::Read,
};

use rand::prelude::*;

use crate::{
    bytecode::Instr,
    constants::*,
    cpu::Chip8Cpu,
    display::DisplayMode,
    error::{Chip8Error, Chip8Result},
    keys::KeyCode,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    conf: Chip8Conf,
    rng: StdRng,
    /// Host supplied glyph tables, reinstalled on every reset.
    font: Vec<u8>,
    hires_font: Vec<u8>,
    /// Number of unrecognised instructions encountered since the last reset.
    unknown_count: usize,
}

/// VM Configuration Parameters.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Chip8Conf {
    /// Number of instructions executed by each call to [`Chip8Vm::step`].
    pub cycles_per_step: usize,
    pub quirks: Quirks,
    /// Seed for the random number instruction. Seeded from the
    /// operating system when not set.
    pub rng_seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            cycles_per_step: DEFAULT_CYCLES_PER_STEP,
            quirks: Quirks::default(),
            rng_seed: None,
        }
    }
}

/// Behaviours that differ between historical interpreters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Quirks {
    /// `Fx1E` (`ADD I, Vx`) sets VF to 1 when the address passes the end
    /// of the 12-bit address space, and 0 otherwise. When disabled, VF
    /// is left untouched.
    pub add_index_flag: bool,
}

/// Signal returned to the host after executing instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer changed.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// The program executed `00FD` (`EXIT`) and the machine is halted.
    Exit,
    /// An unrecognised instruction was skipped.
    Unknown,
}

/// Timer values for the host to sample.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm {
            cpu: Chip8Cpu::new(),
            conf,
            rng,
            font: Vec::new(),
            hires_font: Vec::new(),
            unknown_count: 0,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    pub fn set_cycles_per_step(&mut self, cycles: usize) {
        self.conf.cycles_per_step = cycles;
    }

    /// Install the 16 hexadecimal glyphs, 5 bytes each, at [`FONT_START`].
    pub fn load_font(&mut self, fontset: &[u8]) -> Chip8Result<()> {
        check_font(fontset, FONT_DATA_LENGTH)?;

        self.font = fontset.to_vec();
        self.install_fonts();

        Ok(())
    }

    /// Install the 10 decimal glyphs, 10 bytes each, at [`HIRES_FONT_START`].
    pub fn load_hires_font(&mut self, fontset: &[u8]) -> Chip8Result<()> {
        check_font(fontset, HIRES_FONT_DATA_LENGTH)?;

        self.hires_font = fontset.to_vec();
        self.install_fonts();

        Ok(())
    }

    /// Read a whole standard font from the source, then load it.
    ///
    /// Memory is not touched when reading or validation fails.
    pub fn load_font_from(&mut self, reader: impl Read) -> Chip8Result<()> {
        let fontset = read_all(reader)?;
        self.load_font(&fontset)
    }

    /// Read a whole hi-res font from the source, then load it.
    pub fn load_hires_font_from(&mut self, reader: impl Read) -> Chip8Result<()> {
        let fontset = read_all(reader)?;
        self.load_hires_font(&fontset)
    }

    fn install_fonts(&mut self) {
        if !self.font.is_empty() {
            self.cpu.ram[FONT_START..FONT_START + FONT_DATA_LENGTH].copy_from_slice(&self.font);
        }
        if !self.hires_font.is_empty() {
            self.cpu.ram[HIRES_FONT_START..HIRES_FONT_START + HIRES_FONT_DATA_LENGTH]
                .copy_from_slice(&self.hires_font);
        }
    }

    /// Copy a program into memory at [`MEM_START`].
    ///
    /// Only the bytes covered by the program are written. The rest of the
    /// machine state is left as is, so call [`Chip8Vm::reset`] first for a
    /// clean start.
    pub fn load_program(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram);
        }

        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);
        log::debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Read a whole program from the source, then load it.
    ///
    /// Memory is not touched when reading fails.
    pub fn load_program_from(&mut self, reader: impl Read) -> Chip8Result<()> {
        let bytecode = read_all(reader)?;
        self.load_program(&bytecode)
    }

    /// Restore the machine to its power-on state.
    ///
    /// Memory is zeroed and the host supplied fonts are installed again.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.install_fonts();
        self.unknown_count = 0;
        log::debug!("machine reset");
    }
}

fn read_all(mut reader: impl Read) -> Chip8Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

fn check_font(fontset: &[u8], expected: usize) -> Chip8Result<()> {
    if fontset.len() != expected {
        return Err(Chip8Error::Font(format!(
            "fontset data must be {expected} bytes, got {}",
            fontset.len()
        )));
    }
    Ok(())
}

/// Host inspection
impl Chip8Vm {
    /// Pixels of the active display region, one byte per pixel.
    ///
    /// The row length is the width of the current [`DisplayMode`].
    pub fn framebuffer(&self) -> &[u8] {
        self.cpu.display.pixels()
    }

    /// Pixel of the active display region, 0 or 1.
    ///
    /// Panics when the coordinate is outside the current mode's dimensions.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        let [w, h] = self.display_mode().size();
        assert!(x < w && y < h, "pixel ({x}, {y}) outside of {w}x{h} display");
        self.cpu.display.pixel(x, y)
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.cpu.display.mode()
    }

    pub fn timers(&self) -> Timers {
        Timers {
            delay: self.cpu.delay_timer,
            sound: self.cpu.sound_timer,
        }
    }

    /// Whether the key is currently held down.
    pub fn key_state(&self, key: KeyCode) -> bool {
        self.cpu.key_state(key.as_u8())
    }

    /// Whether the program executed `00FD` (`EXIT`).
    pub fn is_halted(&self) -> bool {
        self.cpu.halted
    }

    /// Number of unrecognised instructions skipped since the last reset.
    pub fn unknown_count(&self) -> usize {
        self.unknown_count
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    pub fn pc(&self) -> usize {
        self.cpu.pc
    }

    pub fn address(&self) -> Address {
        self.cpu.address
    }

    pub fn stack_depth(&self) -> usize {
        self.cpu.sp
    }

    pub fn ram(&self) -> &[u8] {
        &self.cpu.ram[..]
    }
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    ///
    /// A press is also latched, to be consumed by a pending or future
    /// `Fx0A` (`LD Vx, K`).
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    /// Same as [`Chip8Vm::set_key`], for hosts that map keys to raw indices.
    pub fn set_key_index(&mut self, key_id: u8, pressed: bool) -> Chip8Result<()> {
        let key = KeyCode::try_from(key_id).map_err(|err| Chip8Error::InvalidKey(err.0))?;
        self.set_key(key, pressed);
        Ok(())
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Advance the machine by one frame.
    ///
    /// Runs the configured number of instruction cycles, then counts
    /// both timers down once.
    pub fn step(&mut self) -> Flow {
        let flow = self.execute(self.conf.cycles_per_step);

        self.cpu.tick_delay();
        self.cpu.tick_sound();

        flow
    }

    /// Run exactly `cycle_count` fetch-decode-execute cycles.
    ///
    /// Timers are not touched.
    pub fn execute(&mut self, cycle_count: usize) -> Flow {
        let mut control_flow = Flow::Ok;
        let mut drawn = false;

        for _ in 0..cycle_count {
            control_flow = self.cycle();
            drawn |= control_flow == Flow::Draw;
        }

        match control_flow {
            Flow::Exit | Flow::KeyWait => control_flow,
            _ if drawn => Flow::Draw,
            _ => control_flow,
        }
    }

    /// Skip the next instruction.
    #[inline(always)]
    fn skip(&mut self) {
        self.cpu.pc = (self.cpu.pc + 2) & ADDRESS_MASK;
    }

    /// Set the program counter back onto the current instruction.
    #[inline(always)]
    fn rewind(&mut self) {
        self.cpu.pc = (self.cpu.pc + MEM_SIZE - 2) & ADDRESS_MASK;
    }

    /// Address of the instruction currently executing.
    #[inline(always)]
    fn current_address(&self) -> usize {
        (self.cpu.pc + MEM_SIZE - 2) & ADDRESS_MASK
    }

    fn unknown(&mut self, instr: Instr) -> Flow {
        self.unknown_count += 1;
        log::warn!(
            "unsupported opcode {:04X} at {:04X}",
            instr.code(),
            self.current_address()
        );
        Flow::Unknown
    }

    /// Execute a single instruction.
    fn cycle(&mut self) -> Flow {
        if self.cpu.halted {
            return Flow::Exit;
        }

        let instr = Instr::fetch(&*self.cpu.ram, self.cpu.pc);
        op_trace(self.cpu.pc, &instr);

        let Instr {
            op,
            x,
            y,
            n,
            nn,
            nnn,
        } = instr;
        let (vx, vy) = (x as usize, y as usize);

        // Handlers that jump overwrite this.
        self.skip();

        match op {
            // System and display instructions identified by nn
            0x0 => self.exec_sys(instr),
            // 1nnn (JP addr)
            //
            // Jump to address.
            0x1 => {
                self.cpu.pc = nnn as usize;
                Flow::Jump
            }
            // 2nnn (CALL addr)
            //
            // Call subroutine at nnn.
            // The address of this call is pushed, and the return resumes after it.
            // When the stack is full the call is dropped.
            0x2 => {
                let here = self.current_address() as Address;
                if self.cpu.push(here) {
                    self.cpu.pc = nnn as usize;
                    Flow::Jump
                } else {
                    log::debug!("call stack full, dropped call to {:03X}", nnn);
                    Flow::Ok
                }
            }
            // 3xnn (SE Vx, byte)
            //
            // Skip the next instruction if register Vx equals value nn.
            0x3 => {
                if self.cpu.registers[vx] == nn {
                    self.skip();
                }
                Flow::Ok
            }
            // 4xnn (SNE Vx, byte)
            //
            // Skip the next instruction if register Vx does not equal value nn.
            0x4 => {
                if self.cpu.registers[vx] != nn {
                    self.skip();
                }
                Flow::Ok
            }
            // 5xy0 (SE Vx, Vy)
            //
            // Skip the next instruction if register Vx equals register Vy.
            0x5 if n == 0 => {
                if self.cpu.registers[vx] == self.cpu.registers[vy] {
                    self.skip();
                }
                Flow::Ok
            }
            // 6xnn (LD Vx, byte)
            //
            // Set register Vx to value nn.
            0x6 => {
                self.cpu.registers[vx] = nn;
                Flow::Ok
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value nn to register Vx. Carry flag is not set.
            0x7 => {
                self.cpu.registers[vx] = self.cpu.registers[vx].wrapping_add(nn);
                Flow::Ok
            }
            // Arithmetic instructions identified by n
            0x8 => self.exec_math(instr),
            // 9xy0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            0x9 if n == 0 => {
                if self.cpu.registers[vx] != self.cpu.registers[vy] {
                    self.skip();
                }
                Flow::Ok
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value nnn.
            0xA => {
                self.cpu.address = nnn;
                Flow::Ok
            }
            // Bnnn (JP V0, addr)
            //
            // Jump to address nnn plus V0.
            0xB => {
                self.cpu.pc = (self.cpu.registers[0] as usize + nnn as usize) & ADDRESS_MASK;
                Flow::Jump
            }
            // Cxnn (RND Vx, byte)
            //
            // Set register Vx to the result of bitwise AND between a random number and nn.
            0xC => {
                self.cpu.registers[vx] = nn & self.rng.gen::<u8>();
                Flow::Ok
            }
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
            // Sprite is encoded as 8 pixels wide, n pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // In extended mode, n == 0 draws a 16x16 sprite of 32 bytes instead.
            //
            // If the drawing operation erases existing pixels in the display buffer, register VF is set to
            // 1, and set to 0 if no display bits are unset. This is used for collision detection.
            0xD => {
                let wide = n == 0 && self.cpu.display.mode() == DisplayMode::Extended;
                let len = if wide { 32 } else { n as usize };

                let mut sprite = [0u8; 32];
                for (i, byte) in sprite[..len].iter_mut().enumerate() {
                    *byte = self.cpu.read_indexed(i);
                }

                let (px, py) = (
                    self.cpu.registers[vx] as usize,
                    self.cpu.registers[vy] as usize,
                );
                let is_erased = self.cpu.display.draw_sprite(px, py, &sprite[..len], wide);

                // If a pixel was erased, then a collision occurred.
                self.cpu.registers[FLAG_REGISTER] = is_erased as u8;
                Flow::Draw
            }
            // Keyboard instructions identified by nn
            0xE => self.exec_keys(instr),
            // Miscellaneous instructions identified by nn
            0xF => self.exec_misc(instr),
            // Unsupported operation.
            _ => self.unknown(instr),
        }
    }

    /// Execute a system or display instruction
    #[inline]
    #[must_use]
    fn exec_sys(&mut self, instr: Instr) -> Flow {
        debug_assert_eq!(instr.op, 0x0);

        match (instr.x, instr.nn) {
            // 00Cn (SCD nibble)
            //
            // Scroll the display down by n rows. Extended mode only.
            (0x0, nn) if nn >> 4 == 0xC => {
                if self.cpu.display.mode() == DisplayMode::Extended {
                    self.cpu.display.scroll_down(instr.n as usize);
                    Flow::Draw
                } else {
                    Flow::Ok
                }
            }
            // 00E0 (CLS)
            //
            // Clear display
            (0x0, 0xE0) => {
                self.cpu.display.clear();
                Flow::Draw
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Resume after the call address at the top of the stack.
            // Returning with an empty stack does nothing.
            (0x0, 0xEE) => match self.cpu.pop() {
                Some(address) => {
                    self.cpu.pc = (address as usize + 2) & ADDRESS_MASK;
                    Flow::Jump
                }
                None => {
                    log::debug!("call stack empty, dropped return");
                    Flow::Ok
                }
            },
            // 00FB (SCR)
            //
            // Scroll the display right by 4 columns. Extended mode only.
            (0x0, 0xFB) => {
                if self.cpu.display.mode() == DisplayMode::Extended {
                    self.cpu.display.scroll_right(SCROLL_COLUMNS);
                    Flow::Draw
                } else {
                    Flow::Ok
                }
            }
            // 00FC (SCL)
            //
            // Scroll the display left by 4 columns. Extended mode only.
            (0x0, 0xFC) => {
                if self.cpu.display.mode() == DisplayMode::Extended {
                    self.cpu.display.scroll_left(SCROLL_COLUMNS);
                    Flow::Draw
                } else {
                    Flow::Ok
                }
            }
            // 00FD (EXIT)
            //
            // Halt the interpreter.
            (0x0, 0xFD) => {
                self.cpu.halted = true;
                log::debug!("program exited at {:04X}", self.current_address());
                Flow::Exit
            }
            // 00FE (LOW)
            (0x0, 0xFE) => {
                self.cpu.display.set_mode(DisplayMode::Standard);
                Flow::Draw
            }
            // 00FF (HIGH)
            (0x0, 0xFF) => {
                self.cpu.display.set_mode(DisplayMode::Extended);
                Flow::Draw
            }
            // ----------------------------------------------------------------
            // Unsupported operation, including 0nnn machine code routines.
            _ => self.unknown(instr),
        }
    }

    /// Execute an arithmetic instruction
    ///
    /// Flag setting instructions capture their operands first, write
    /// the result to Vx, and write VF last. When Vx is VF the flag
    /// overwrites the result.
    #[inline]
    #[must_use]
    fn exec_math(&mut self, instr: Instr) -> Flow {
        debug_assert_eq!(instr.op, 0x8);

        let (vx, vy) = (instr.x as usize, instr.y as usize);
        let (x, y) = (self.cpu.registers[vx], self.cpu.registers[vy]);

        let (result, flag) = match instr.n {
            // 8xy0 (LD Vx, Vy)
            //
            // Store the value of register Vy in register Vx.
            0x0 => (y, None),
            // 8xy1 (OR Vx, Vy)
            0x1 => (x | y, None),
            // 8xy2 (AND Vx, Vy)
            0x2 => (x & y, None),
            // 8xy3 (XOR Vx, Vy)
            0x3 => (x ^ y, None),
            // 8xy4 (ADD Vx, Vy)
            //
            // Overflow is wrapped.
            // If overflow, set VF to 1, else 0.
            0x4 => {
                let (result, carry) = x.overflowing_add(y);
                (result, Some(carry as u8))
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // Subtracts Vy from Vx, and stores the result in Vx.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            0x5 => (x.wrapping_sub(y), Some((x >= y) as u8)),
            // 8xy6 (SHR Vx)
            //
            // VF is set to the least-significant bit of Vx.
            // Vy is unused.
            0x6 => (x >> 1, Some(x & 1)),
            // 8xy7 (SUBN Vx, Vy)
            //
            // Subtracts Vx from Vy, and stores the result in Vx.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            0x7 => (y.wrapping_sub(x), Some((y >= x) as u8)),
            // 8xyE (SHL Vx)
            //
            // VF is set to the most-significant bit of Vx.
            // Vy is unused.
            0xE => (x << 1, Some(x >> 7)),
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => return self.unknown(instr),
        };

        self.cpu.registers[vx] = result;
        if let Some(flag) = flag {
            self.cpu.registers[FLAG_REGISTER] = flag;
        }

        Flow::Ok
    }

    /// Execute a keyboard instruction
    #[inline]
    #[must_use]
    fn exec_keys(&mut self, instr: Instr) -> Flow {
        debug_assert_eq!(instr.op, 0xE);

        let key = self.cpu.registers[instr.x as usize] & 0xF;

        match instr.nn {
            // Ex9E (SKP Vx)
            //
            // Skip the next instruction if the key in Vx is pressed.
            0x9E => {
                if self.cpu.key_state(key) {
                    self.skip();
                }
                Flow::Ok
            }
            // ExA1 (SKNP Vx)
            //
            // Skip the next instruction if the key in Vx is not pressed.
            0xA1 => {
                if !self.cpu.key_state(key) {
                    self.skip();
                }
                Flow::Ok
            }
            _ => self.unknown(instr),
        }
    }

    /// Execute a miscellaneous instruction
    #[inline]
    #[must_use]
    fn exec_misc(&mut self, instr: Instr) -> Flow {
        debug_assert_eq!(instr.op, 0xF);

        let vx = instr.x as usize;

        match instr.nn {
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            0x07 => {
                self.cpu.registers[vx] = self.cpu.delay_timer;
                Flow::Ok
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // All execution stops until a key is pressed, then the value of that key is stored in Vx.
            0x0A => match self.cpu.take_key_latch() {
                Some(k) => {
                    self.cpu.registers[vx] = k;
                    Flow::Ok
                }
                None => {
                    // rewind the program counter to stall the machine
                    self.rewind();
                    Flow::KeyWait
                }
            },
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            0x15 => {
                self.cpu.delay_timer = self.cpu.registers[vx];
                Flow::Ok
            }
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            0x18 => {
                self.cpu.sound_timer = self.cpu.registers[vx];
                Flow::Sound
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I. Whether VF reports overflow past the
            // address space depends on the quirk setting.
            0x1E => {
                let sum = self.cpu.address as usize + self.cpu.registers[vx] as usize;
                self.cpu.address = (sum & ADDRESS_MASK) as Address;
                if self.conf.quirks.add_index_flag {
                    self.cpu.registers[FLAG_REGISTER] = (sum > ADDRESS_MASK) as u8;
                }
                Flow::Ok
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of the 5-byte sprite for hexadecimal digit Vx.
            0x29 => {
                let x = (self.cpu.registers[vx] & 0xF) as usize;
                self.cpu.address = (FONT_START + x * FONT_GLYPH_SIZE) as Address;
                Flow::Ok
            }
            // Fx30 (LD HF, Vx)
            //
            // Set I = location of the 10-byte sprite for decimal digit Vx.
            0x30 => {
                let x = (self.cpu.registers[vx] % 10) as usize;
                self.cpu.address = (HIRES_FONT_START + x * HIRES_FONT_GLYPH_SIZE) as Address;
                Flow::Ok
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            0x33 => {
                let x = self.cpu.registers[vx];
                self.cpu.write_indexed(0, x / 100 % 10);
                self.cpu.write_indexed(1, x / 10  % 10);
                self.cpu.write_indexed(2, x       % 10);
                Flow::Ok
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            // I is left pointing after the last stored byte.
            0x55 => {
                for i in 0..=vx {
                    self.cpu.write_indexed(i, self.cpu.registers[i]);
                }
                self.cpu.address = ((self.cpu.address as usize + vx + 1) & ADDRESS_MASK) as Address;
                Flow::Ok
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            // I is left pointing after the last loaded byte.
            0x65 => {
                for i in 0..=vx {
                    self.cpu.registers[i] = self.cpu.read_indexed(i);
                }
                self.cpu.address = ((self.cpu.address as usize + vx + 1) & ADDRESS_MASK) as Address;
                Flow::Ok
            }
            // Fx75 (LD R, Vx)
            //
            // Save V0 through Vx into the RPL user flags. Only 8 flags exist.
            0x75 => {
                let count = (vx + 1).min(USER_FLAG_COUNT);
                self.cpu.user_flags[..count].copy_from_slice(&self.cpu.registers[..count]);
                Flow::Ok
            }
            // Fx85 (LD Vx, R)
            //
            // Restore V0 through Vx from the RPL user flags.
            0x85 => {
                let count = (vx + 1).min(USER_FLAG_COUNT);
                self.cpu.registers[..count].copy_from_slice(&self.cpu.user_flags[..count]);
                Flow::Ok
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => self.unknown(instr),
        }
    }
}

/// Troubleshooting
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            let next = self.cpu.ram[(i + 1) & ADDRESS_MASK];
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, next)?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        let width = self.display_mode().width();

        for row in self.framebuffer().chunks(width) {
            for px in row {
                if *px != 0 {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys: ")?;
            for i in 0..KEY_COUNT {
                if self.cpu.key_state(i) {
                    write!(buf, "k{i:x}")?;
                }
            }
        }

        Ok(buf)
    }

    pub fn dump_registers(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for (i, v) in self.cpu.registers.iter().enumerate() {
            write!(buf, "V{i:X}={v:02X} ")?;
        }
        write!(
            buf,
            "I={:03X} PC={:04X} SP={}",
            self.cpu.address, self.cpu.pc, self.cpu.sp
        )?;

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(pc: usize, instr: &Instr) {
    log::trace!("{:04X}: {:04X} {}", pc, instr.code(), instr);
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: usize, _: &Instr) {}
