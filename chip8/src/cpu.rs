//! CPU and memory state.
use crate::{
    bytecode::word,
    constants::*,
    display::FrameBuffer,
    error::{Chip8Error, Chip8Result},
    timer::Timers,
};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction to fetch.
    pub(crate) pc: Address,
    /// Stack pointer, the number of return addresses currently pushed.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register (I) used for temporarily storing an address.
    pub(crate) address: Address,
    /// Delay and sound timers.
    pub(crate) timers: Timers,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn to.
    pub(crate) display: FrameBuffer,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut cpu = Self {
            pc: MEM_START as Address,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            timers: Timers::default(),
            key_state: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: FrameBuffer::new(),
        };
        cpu.load_font();
        cpu
    }
}

impl Chip8Cpu {
    /// Zeroed machine with the builtin font loaded and the program
    /// counter at the start of program memory.
    pub fn new() -> Self {
        Default::default()
    }

    /// Erase the contents of memory, registers, stack and display.
    ///
    /// The font is reloaded and the program counter is rewound.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    fn load_font(&mut self) {
        self.ram[FONTSET_START..FONTSET_START + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Copy the program into memory at [`MEM_START`].
    ///
    /// Memory beyond the program is left as it was.
    pub(crate) fn load_program(&mut self, bytecode: &[u8]) -> Chip8Result<usize> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        self.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        Ok(bytecode.len())
    }

    // ------------------------------------------------------------------------
    // Memory access. Addresses wrap around the 4KB address space.

    #[inline(always)]
    pub fn read(&self, address: usize) -> u8 {
        self.ram[address & MEM_MASK]
    }

    #[inline(always)]
    pub fn write(&mut self, address: usize, value: u8) {
        self.ram[address & MEM_MASK] = value;
    }

    /// Extract the instruction word at the current program counter.
    #[inline(always)]
    pub fn fetch(&self) -> u16 {
        let pc = self.pc as usize;
        word(self.read(pc), self.read(pc + 1))
    }

    /// Copy `len` bytes starting at register I.
    #[inline]
    pub(crate) fn sprite(&self, len: u8) -> ([u8; 0xF], usize) {
        let mut rows = [0; 0xF];
        let len = (len as usize).min(rows.len());
        for (r, row) in rows[..len].iter_mut().enumerate() {
            *row = self.read(self.address as usize + r);
        }
        (rows, len)
    }

    // ------------------------------------------------------------------------
    // Call stack

    /// Push a return address.
    ///
    /// A full stack fails fast instead of wrapping the pointer.
    pub(crate) fn push(&mut self, address: Address) -> Chip8Result<()> {
        if self.sp >= STACK_SIZE {
            return Err(Chip8Error::StackOverflow { address: self.pc });
        }
        self.stack[self.sp] = address;
        self.sp += 1;
        Ok(())
    }

    /// Pop the most recent return address.
    pub(crate) fn pop(&mut self) -> Chip8Result<Address> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow { address: self.pc });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    // ------------------------------------------------------------------------
    // Keyboard

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    /// Replace the whole keyboard state with a snapshot from the host.
    pub fn set_keys(&mut self, keys: &[bool; KEY_COUNT as usize]) {
        self.key_state = keys
            .iter()
            .enumerate()
            .filter(|(_, pressed)| **pressed)
            .fold(0, |acc, (k, _)| acc | (1 << k));
    }

    /// Whether the given key is pressed. Keys outside the keypad are never pressed.
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

    /// Retrieve the value of the first key that is pressed down, by index order.
    #[inline]
    pub fn first_key(&self) -> Option<u8> {
        if self.any_key() {
            (0..KEY_COUNT).find(|k| self.key_state(*k))
        } else {
            None
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }
}
