//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{bytecode::word, constants::MEM_START, instr::Op};

/// Produces a listing of a program, one line per instruction word.
///
/// Programs mix code and data freely, so words that don't decode are
/// listed as raw data rather than treated as errors.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    cursor: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            cursor: 0,
        }
    }

    /// Write the full listing to the given writer.
    pub fn disassemble<W: FmtWrite>(&mut self, w: &mut W) -> fmt::Result {
        self.cursor = 0;
        while self.cursor < self.bytecode.len() {
            self.disassemble_one(w)?;
            self.cursor += 2;
        }
        self.cursor = 0;

        Ok(())
    }

    /// Write a single instruction to the given writer.
    pub fn disassemble_one<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        let addr = MEM_START + self.cursor;
        let a = self.bytecode[self.cursor];

        // Odd sized programs end in a single data byte.
        let b = match self.bytecode.get(self.cursor + 1) {
            Some(b) => *b,
            None => return writeln!(w, "0x{addr:04X}: {a:02X}    DB   0x{a:02X}"),
        };

        let code = word(a, b);
        match Op::decode(code) {
            Some(op) => writeln!(w, "0x{addr:04X}: {code:04X}  {op}"),
            None => writeln!(w, "0x{addr:04X}: {code:04X}  DW   0x{code:04X}"),
        }
    }
}

impl fmt::Display for Disassembler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cursor = Disassembler::new(self.bytecode);
        cursor.disassemble(f)
    }
}
