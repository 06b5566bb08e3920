//! CPU and memory state.
use crate::{constants::*, display::Display};

/// Core state for a SuperCHIP interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction in memory.
    pub(crate) pc: usize,
    /// Stack pointer, the number of return addresses on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address. Since addresses are 12 bits, only the
    /// lowest (rightmost) bits are used.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// RPL user flags, saved and restored by `Fx75` and `Fx85`.
    pub(crate) user_flags: [u8; USER_FLAG_COUNT],

    // ------------------------------------------------------------------------
    // Input
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,
    /// Most recent key pressed since the key wait instruction last consumed it.
    pub(crate) key_latch: Option<u8>,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn to.
    pub(crate) display: Display,

    // ------------------------------------------------------------------------
    // Control
    /// Set by the exit instruction. The machine stops executing until reset.
    pub(crate) halted: bool,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: MEM_START,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            user_flags: [0; USER_FLAG_COUNT],

            key_state: 0,
            key_latch: None,

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Display::default(),

            halted: false,
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Restore every register, buffer and flag to its power-on value,
    /// reusing the existing allocations.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.user_flags.fill(0);
        self.key_state = 0;
        self.key_latch = None;
        self.ram.fill(0);
        self.stack.fill(0);
        self.display.reset();
        self.halted = false;
    }

    // ------------------------------------------------------------------------
    // Stack

    /// Push a return address.
    ///
    /// Returns `false` without touching the stack when it is full.
    #[inline]
    pub(crate) fn push(&mut self, address: Address) -> bool {
        if self.sp < STACK_SIZE {
            self.stack[self.sp] = address;
            self.sp += 1;
            true
        } else {
            false
        }
    }

    /// Pop a return address, if there is one.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Address> {
        if self.sp > 0 {
            self.sp -= 1;
            Some(self.stack[self.sp])
        } else {
            None
        }
    }

    // ------------------------------------------------------------------------
    // Memory

    /// Read a byte at an offset from the address register.
    #[inline(always)]
    pub(crate) fn read_indexed(&self, offset: usize) -> u8 {
        self.ram[(self.address as usize + offset) & ADDRESS_MASK]
    }

    /// Write a byte at an offset from the address register.
    #[inline(always)]
    pub(crate) fn write_indexed(&mut self, offset: usize, value: u8) {
        self.ram[(self.address as usize + offset) & ADDRESS_MASK] = value;
    }

    // ------------------------------------------------------------------------
    // Input

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
                self.key_latch = Some(key_id);
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    pub fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// Take the latched key press, leaving the latch empty.
    #[inline]
    pub(crate) fn take_key_latch(&mut self) -> Option<u8> {
        self.key_latch.take()
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
        self.key_latch = None;
    }

    // ------------------------------------------------------------------------
    // Timers

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut cpu = Chip8Cpu::default();

        cpu.set_key_state(0, true);
        assert_eq!(cpu.key_state, 0b00000000_00000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(!cpu.key_state(7));

        cpu.set_key_state(7, true);
        assert_eq!(cpu.key_state, 0b00000000_10000001);
        assert!(cpu.key_state(7));

        cpu.set_key_state(0, false);
        assert_eq!(cpu.key_state, 0b00000000_10000000);
        assert!(!cpu.key_state(0));

        cpu.set_key_state(15, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(cpu.key_state(15));

        // Out of range keys are ignored.
        cpu.set_key_state(16, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(!cpu.key_state(16));
    }

    #[test]
    fn test_key_latch() {
        let mut cpu = Chip8Cpu::default();
        assert_eq!(cpu.take_key_latch(), None);

        cpu.set_key_state(3, true);
        cpu.set_key_state(9, true);
        // Releasing does not clear the latch.
        cpu.set_key_state(9, false);

        assert_eq!(cpu.take_key_latch(), Some(9));
        assert_eq!(cpu.take_key_latch(), None);
    }

    #[test]
    fn test_stack_bounds() {
        let mut cpu = Chip8Cpu::default();
        assert_eq!(cpu.pop(), None);

        for i in 0..STACK_SIZE {
            assert!(cpu.push(i as Address));
        }
        assert!(!cpu.push(0xABC));
        assert_eq!(cpu.sp, STACK_SIZE);
        assert_eq!(cpu.pop(), Some((STACK_SIZE - 1) as Address));
    }

    #[test]
    fn test_timers_floor_at_zero() {
        let mut cpu = Chip8Cpu::default();
        cpu.delay_timer = 1;
        cpu.tick_delay();
        cpu.tick_delay();
        cpu.tick_sound();
        assert_eq!(cpu.delay_timer, 0);
        assert_eq!(cpu.sound_timer, 0);
    }

    #[test]
    fn test_indexed_access_wraps() {
        let mut cpu = Chip8Cpu::default();
        cpu.address = (MEM_SIZE - 1) as Address;
        cpu.write_indexed(2, 0x42);
        assert_eq!(cpu.ram[1], 0x42);
        assert_eq!(cpu.read_indexed(2), 0x42);
    }

    #[test]
    fn test_reset() {
        let mut cpu = Chip8Cpu::default();
        cpu.pc = 0x300;
        cpu.registers[4] = 9;
        cpu.ram[0x400] = 1;
        cpu.push(0x222);
        cpu.halted = true;
        cpu.set_key_state(2, true);

        cpu.reset();
        assert_eq!(cpu.pc, MEM_START);
        assert_eq!(cpu.registers, [0; REGISTER_COUNT]);
        assert_eq!(cpu.ram[0x400], 0);
        assert_eq!(cpu.sp, 0);
        assert!(!cpu.halted);
        assert!(!cpu.any_key());
        assert_eq!(cpu.key_latch, None);
    }
}
