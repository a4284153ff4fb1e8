//! Decoded instructions.
//!
//! Instruction words are decoded once per cycle into an [`Op`], which the
//! interpreter matches exhaustively.
use std::fmt::{self, Formatter};

use crate::{bytecode::*, constants::Address};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    Jump { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`
    Skip_Eq_Byte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    Skip_NotEq_Byte { vx: u8, nn: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    Load_Byte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// The carry flag is not touched.
    Add_Byte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    ///
    /// Store the value of register VY in register VX.
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// ADDs VY to VX, and stores the result in VX.
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// Subtracts VY from VX, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx)
    ///
    /// VF is set to the least-significant bit of Vx, then Vx is shifted right by 1.
    /// VY is unused.
    ShiftRight { vx: u8, vy: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx)
    ///
    /// VF is set to the most-significant bit of Vx, then Vx is shifted left by 1.
    /// VY is unused.
    ShiftLeft { vx: u8, vy: u8 },
    /// 9xy0 (SNE Vx, Vy)
    Skip_NotEq { vx: u8, vy: u8 },

    /// Annn (LD I, addr)
    ///
    /// Load address into register `I`.
    Load_Address { address: Address },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to location nnn + V0.
    Jump_V0 { address: Address },
    /// Cxnn (RND Vx, byte)
    ///
    /// Generate random number, masked by `nn`.
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer.
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    Skip_Pressed { vx: u8 },
    /// ExA1 (SKNP Vx)
    Skip_NotPressed { vx: u8 },

    // ------------------------------------------------------------------------
    // Misc
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    ///
    /// Stall until a key is pressed, then store the key in `Vx`.
    Load_Vx_Key { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    Add_Address_Vx { vx: u8 },
    /// Fx29 (LD F, Vx)
    ///
    /// Point `I` at the font glyph for the digit in `Vx`.
    Load_Font { vx: u8 },
    /// Fx33 (LD B, Vx)
    ///
    /// Store the binary-coded decimal digits of `Vx` at I, I+1 and I+2.
    Load_Bcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    Store_Registers { vx: u8 },
    /// Fx65 (LD Vx, [I])
    Load_Registers { vx: u8 },
}

impl Op {
    /// Decode an instruction word.
    ///
    /// Returns `None` when the word matches no known opcode.
    pub fn decode(word: u16) -> Option<Op> {
        let (vx, vy, n) = op_xyn(word);
        let nn = op_nn(word);
        let address = op_nnn(word);

        let op = match op_code(word) {
            // Secondary dispatch on the low byte.
            0x0 => match nn {
                0xE0 => Op::ClearScreen,
                0xEE => Op::Return,
                _ => return None,
            },
            0x1 => Op::Jump { address },
            0x2 => Op::Call { address },
            0x3 => Op::Skip_Eq_Byte { vx, nn },
            0x4 => Op::Skip_NotEq_Byte { vx, nn },
            0x5 => Op::Skip_Eq { vx, vy },
            0x6 => Op::Load_Byte { vx, nn },
            0x7 => Op::Add_Byte { vx, nn },
            // Secondary dispatch on the low nibble.
            0x8 => match n {
                0x0 => Op::Load_Vx_Vy { vx, vy },
                0x1 => Op::Or_Vx_Vy { vx, vy },
                0x2 => Op::And_Vx_Vy { vx, vy },
                0x3 => Op::Xor_Vx_Vy { vx, vy },
                0x4 => Op::Add_Vx_Vy { vx, vy },
                0x5 => Op::Sub_Vx_Vy { vx, vy },
                0x6 => Op::ShiftRight { vx, vy },
                0x7 => Op::SubReverse_Vx_Vy { vx, vy },
                0xE => Op::ShiftLeft { vx, vy },
                _ => return None,
            },
            0x9 => Op::Skip_NotEq { vx, vy },
            0xA => Op::Load_Address { address },
            0xB => Op::Jump_V0 { address },
            0xC => Op::Random { vx, nn },
            0xD => Op::Draw { vx, vy, n },
            0xE => match nn {
                0x9E => Op::Skip_Pressed { vx },
                0xA1 => Op::Skip_NotPressed { vx },
                _ => return None,
            },
            0xF => match nn {
                0x07 => Op::Load_Vx_Delay { vx },
                0x0A => Op::Load_Vx_Key { vx },
                0x15 => Op::Load_Delay_Vx { vx },
                0x18 => Op::Load_Sound_Vx { vx },
                0x1E => Op::Add_Address_Vx { vx },
                0x29 => Op::Load_Font { vx },
                0x33 => Op::Load_Bcd { vx },
                0x55 => Op::Store_Registers { vx },
                0x65 => Op::Load_Registers { vx },
                _ => return None,
            },
            _ => unreachable!("opcode identity is a single nibble"),
        };

        Some(op)
    }

    /// Assembly mnemonic of the operation.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::ClearScreen => "CLS",
            Op::Return => "RET",
            Op::Jump { .. } | Op::Jump_V0 { .. } => "JP",
            Op::Call { .. } => "CALL",
            Op::Skip_Eq_Byte { .. } | Op::Skip_Eq { .. } => "SE",
            Op::Skip_NotEq_Byte { .. } | Op::Skip_NotEq { .. } => "SNE",
            Op::Add_Byte { .. } | Op::Add_Vx_Vy { .. } | Op::Add_Address_Vx { .. } => "ADD",
            Op::Or_Vx_Vy { .. } => "OR",
            Op::And_Vx_Vy { .. } => "AND",
            Op::Xor_Vx_Vy { .. } => "XOR",
            Op::Sub_Vx_Vy { .. } => "SUB",
            Op::ShiftRight { .. } => "SHR",
            Op::SubReverse_Vx_Vy { .. } => "SUBN",
            Op::ShiftLeft { .. } => "SHL",
            Op::Random { .. } => "RND",
            Op::Draw { .. } => "DRW",
            Op::Skip_Pressed { .. } => "SKP",
            Op::Skip_NotPressed { .. } => "SKNP",
            Op::Load_Byte { .. }
            | Op::Load_Vx_Vy { .. }
            | Op::Load_Address { .. }
            | Op::Load_Vx_Delay { .. }
            | Op::Load_Vx_Key { .. }
            | Op::Load_Delay_Vx { .. }
            | Op::Load_Sound_Vx { .. }
            | Op::Load_Font { .. }
            | Op::Load_Bcd { .. }
            | Op::Store_Registers { .. }
            | Op::Load_Registers { .. } => "LD",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = self.mnemonic();

        match *self {
            Op::ClearScreen | Op::Return => write!(f, "{name}"),
            Op::Jump { address } | Op::Call { address } => write!(f, "{name:4} 0x{address:03X}"),
            Op::Load_Address { address } => write!(f, "{name:4} I, 0x{address:03X}"),
            Op::Jump_V0 { address } => write!(f, "{name:4} V0, 0x{address:03X}"),
            Op::Skip_Eq_Byte { vx, nn }
            | Op::Skip_NotEq_Byte { vx, nn }
            | Op::Load_Byte { vx, nn }
            | Op::Add_Byte { vx, nn }
            | Op::Random { vx, nn } => write!(f, "{name:4} V{vx:X}, 0x{nn:02X}"),
            Op::Skip_Eq { vx, vy }
            | Op::Skip_NotEq { vx, vy }
            | Op::Load_Vx_Vy { vx, vy }
            | Op::Or_Vx_Vy { vx, vy }
            | Op::And_Vx_Vy { vx, vy }
            | Op::Xor_Vx_Vy { vx, vy }
            | Op::Add_Vx_Vy { vx, vy }
            | Op::Sub_Vx_Vy { vx, vy }
            | Op::SubReverse_Vx_Vy { vx, vy } => write!(f, "{name:4} V{vx:X}, V{vy:X}"),
            Op::ShiftRight { vx, .. } | Op::ShiftLeft { vx, .. } => write!(f, "{name:4} V{vx:X}"),
            Op::Draw { vx, vy, n } => write!(f, "{name:4} V{vx:X}, V{vy:X}, {n}"),
            Op::Skip_Pressed { vx } | Op::Skip_NotPressed { vx } => write!(f, "{name:4} V{vx:X}"),
            Op::Load_Vx_Delay { vx } => write!(f, "{name:4} V{vx:X}, DT"),
            Op::Load_Vx_Key { vx } => write!(f, "{name:4} V{vx:X}, K"),
            Op::Load_Delay_Vx { vx } => write!(f, "{name:4} DT, V{vx:X}"),
            Op::Load_Sound_Vx { vx } => write!(f, "{name:4} ST, V{vx:X}"),
            Op::Add_Address_Vx { vx } => write!(f, "{name:4} I, V{vx:X}"),
            Op::Load_Font { vx } => write!(f, "{name:4} F, V{vx:X}"),
            Op::Load_Bcd { vx } => write!(f, "{name:4} B, V{vx:X}"),
            Op::Store_Registers { vx } => write!(f, "{name:4} [I], V{vx:X}"),
            Op::Load_Registers { vx } => write!(f, "{name:4} V{vx:X}, [I]"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_primary() {
        assert_eq!(Op::decode(0x00E0), Some(Op::ClearScreen));
        assert_eq!(Op::decode(0x00EE), Some(Op::Return));
        assert_eq!(Op::decode(0x1ABC), Some(Op::Jump { address: 0xABC }));
        assert_eq!(Op::decode(0x2ABC), Some(Op::Call { address: 0xABC }));
        assert_eq!(
            Op::decode(0xD125),
            Some(Op::Draw {
                vx: 1,
                vy: 2,
                n: 5
            })
        );
        assert_eq!(Op::decode(0xB300), Some(Op::Jump_V0 { address: 0x300 }));
    }

    #[test]
    fn test_decode_secondary() {
        assert_eq!(
            Op::decode(0x8AB4),
            Some(Op::Add_Vx_Vy { vx: 0xA, vy: 0xB })
        );
        assert_eq!(
            Op::decode(0x812E),
            Some(Op::ShiftLeft { vx: 1, vy: 2 })
        );
        assert_eq!(Op::decode(0xE39E), Some(Op::Skip_Pressed { vx: 3 }));
        assert_eq!(Op::decode(0xE3A1), Some(Op::Skip_NotPressed { vx: 3 }));
        assert_eq!(Op::decode(0xF40A), Some(Op::Load_Vx_Key { vx: 4 }));
        assert_eq!(Op::decode(0xF565), Some(Op::Load_Registers { vx: 5 }));
    }

    #[test]
    fn test_decode_unknown() {
        for word in [0x0000, 0x0123, 0x00E1, 0x8008, 0x800F, 0xE000, 0xE19F, 0xF000, 0xFFFF] {
            assert_eq!(Op::decode(word), None, "{word:04X} must not decode");
        }
    }

    #[test]
    fn test_display() {
        let repr = |word| Op::decode(word).unwrap().to_string();

        assert_eq!(repr(0x00E0), "CLS");
        assert_eq!(repr(0x1200), "JP   0x200");
        assert_eq!(repr(0xB210), "JP   V0, 0x210");
        assert_eq!(repr(0x6A42), "LD   VA, 0x42");
        assert_eq!(repr(0x8125), "SUB  V1, V2");
        assert_eq!(repr(0x8106), "SHR  V1");
        assert_eq!(repr(0xD014), "DRW  V0, V1, 4");
        assert_eq!(repr(0xF155), "LD   [I], V1");
        assert_eq!(repr(0xF20A), "LD   V2, K");
    }
}
