//! Helpers for extracting data from opcodes.
//!
//! Each instruction is two bytes, stored big-endian, with the opcode
//! identity in the first 4-bit nibble.
//!
//! ```text
//! op   x    y    n
//! 1111 0000 0000 0000
//!      nnn..........
//!           nn......
//! ```

/// Join two bytes read from memory into an instruction word.
#[inline(always)]
pub fn word(a: u8, b: u8) -> u16 {
    ((a as u16) << 8) | b as u16
}

/// Extract the opcode identity, the upper nibble.
#[inline(always)]
pub fn op_code(word: u16) -> u8 {
    ((word & 0xF000) >> 12) as u8
}

/// Extract operand X, the register in the second nibble.
#[inline(always)]
pub fn op_x(word: u16) -> u8 {
    ((word & 0x0F00) >> 8) as u8
}

/// Extract operand Y, the register in the third nibble.
#[inline(always)]
pub fn op_y(word: u16) -> u8 {
    ((word & 0x00F0) >> 4) as u8
}

/// Extract operand N, the lowest nibble.
#[inline(always)]
pub fn op_n(word: u16) -> u8 {
    (word & 0x000F) as u8
}

/// Extract operand NN, the lowest byte.
#[inline(always)]
pub fn op_nn(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Extract operand NNN, the lowest 12 bits.
#[inline(always)]
pub fn op_nnn(word: u16) -> u16 {
    word & 0x0FFF
}

/// Extract operands X, Y and N.
#[inline(always)]
pub fn op_xyn(word: u16) -> (u8, u8, u8) {
    (op_x(word), op_y(word), op_n(word))
}
