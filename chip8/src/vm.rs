//! Virtual machine.
use std::{fmt::Write, fs, path::Path};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    constants::*,
    cpu::Chip8Cpu,
    devices::{Devices, KeyCode},
    error::{Chip8Error, Chip8Result},
    instr::Op,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    conf: Chip8Conf,
}

/// Outcome of executing a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer changed and should be presented.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`) when no key is
    /// pressed. The program counter is not advanced, so the same instruction
    /// executes again on the next step.
    KeyWait,
}

/// VM Configuration Parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Instructions executed per 60Hz frame.
    ///
    /// Not part of the Chip-8 architecture. Higher values make programs
    /// run faster and respond to input sooner.
    pub cycles_per_frame: usize,
    /// Seed for the random number generator behind `Cxnn` (`RND Vx, byte`).
    ///
    /// Seeded from system entropy when not set.
    pub seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            cycles_per_frame: DEFAULT_CYCLES_PER_FRAME,
            seed: None,
        }
    }
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng,
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Load a program into memory, and prepare the machine for execution.
    ///
    /// Returns the number of bytes loaded. An oversized program is rejected
    /// before the machine is touched.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<usize> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.cpu.reset();

        let size = self.cpu.load_program(bytecode)?;
        log::debug!("loaded {size} byte program at 0x{MEM_START:04X}");

        Ok(size)
    }

    /// Read a program file from disk and load it.
    pub fn load_file(&mut self, filepath: impl AsRef<Path>) -> Chip8Result<usize> {
        let filepath = filepath.as_ref();
        log::debug!("load program: {}", filepath.display());

        let bytecode = fs::read(filepath)?;
        self.load_bytecode(&bytecode)
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer<'_> {
        self.cpu.display.pixels()
    }

    /// Whether the display buffer changed since it was last presented.
    pub fn draw_flag(&self) -> bool {
        self.cpu.display.draw_flag()
    }

    /// Called by the presenting host once it has consumed the display buffer.
    pub fn clear_draw_flag(&mut self) {
        self.cpu.display.clear_draw_flag()
    }
}

/// Machine state inspection
impl Chip8Vm {
    pub fn pc(&self) -> Address {
        self.cpu.pc
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    /// Index register I.
    pub fn address(&self) -> Address {
        self.cpu.address
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.timers.delay
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.timers.sound
    }

    /// Number of return addresses on the call stack.
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
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    /// Replace the keyboard state with a snapshot of all 16 keys.
    pub fn set_keys(&mut self, keys: &[bool; KEY_COUNT as usize]) {
        self.cpu.set_keys(keys);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Count down the delay and sound timers. Must be called at 60Hz.
    ///
    /// Returns `true` when the sound timer ran out on this tick.
    pub fn tick_timers(&mut self) -> bool {
        self.cpu.timers.tick()
    }

    /// Run one frame of the host loop.
    ///
    /// 1. Sample the keypad.
    /// 2. Execute up to [`Chip8Conf::cycles_per_frame`] instructions.
    /// 3. Count down the timers once.
    /// 4. Present the display if it changed.
    ///
    /// A machine stalled on `Fx0A` stops executing for the rest of the frame,
    /// since the keypad can't change until the next sample.
    pub fn run_frame(&mut self, devices: &mut impl Devices) -> Chip8Result<()> {
        let keys = devices.keys();
        self.cpu.set_keys(&keys);

        for _ in 0..self.conf.cycles_per_frame {
            if self.step()? == Flow::KeyWait {
                break;
            }
        }

        if self.tick_timers() {
            devices.tone_stop();
        }

        if self.draw_flag() {
            devices.draw(self.display_buffer());
            self.clear_draw_flag();
        }

        Ok(())
    }

    /// Execute up to `step_count` instructions.
    ///
    /// Timers are not touched.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?;
        }

        Ok(flow)
    }

    /// Fetch, decode and execute exactly one instruction.
    ///
    /// An unknown opcode is reported before anything is executed,
    /// so the machine state is left as it was.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        let pc = self.cpu.pc;
        let code = self.cpu.fetch();

        let op = Op::decode(code).ok_or(Chip8Error::UnknownOpcode {
            opcode: code,
            address: pc,
        });

        op.and_then(|op| {
            op_trace(pc, code, &op);
            self.exec(op)
        })
        .map_err(|err| {
            log::warn!("{err}");
            err
        })
    }

    /// Advance to the next instruction.
    #[inline(always)]
    fn next(&mut self) -> Flow {
        self.cpu.pc = self.cpu.pc.wrapping_add(2);
        Flow::Ok
    }

    /// Advance, skipping over the next instruction when the condition holds.
    #[inline(always)]
    fn skip_if(&mut self, condition: bool) -> Flow {
        let offset = if condition { 4 } else { 2 };
        self.cpu.pc = self.cpu.pc.wrapping_add(offset);
        Flow::Ok
    }

    /// Store the result of an arithmetic instruction, followed by its flag.
    ///
    /// The flag is written last, so it wins when `vx` is VF.
    #[inline(always)]
    fn set_with_flag(&mut self, vx: u8, result: u8, flag: bool) {
        self.cpu.registers[vx as usize] = result;
        self.cpu.registers[FLAG_REGISTER] = flag as u8;
    }

    fn exec(&mut self, op: Op) -> Chip8Result<Flow> {
        let flow = match op {
            // 00E0 (CLS)
            //
            // Clear display
            Op::ClearScreen => {
                self.cpu.display.clear();
                self.next();
                Flow::Draw
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // The popped address is the call instruction itself,
            // so execution resumes after it.
            Op::Return => {
                let address = self.cpu.pop()?;
                self.cpu.pc = address.wrapping_add(2);
                Flow::Jump
            }
            // 1NNN (JP addr)
            Op::Jump { address } => {
                self.cpu.pc = address;
                Flow::Jump
            }
            // 2NNN (CALL addr)
            //
            // Call subroutine at NNN.
            Op::Call { address } => {
                self.cpu.push(self.cpu.pc)?;
                self.cpu.pc = address;
                Flow::Jump
            }
            // 3XNN (SE Vx, byte)
            Op::Skip_Eq_Byte { vx, nn } => self.skip_if(self.cpu.registers[vx as usize] == nn),
            // 4XNN (SNE Vx, byte)
            Op::Skip_NotEq_Byte { vx, nn } => {
                self.skip_if(self.cpu.registers[vx as usize] != nn)
            }
            // 5XY0 (SE Vx, Vy)
            Op::Skip_Eq { vx, vy } => {
                let (x, y) = self.xy(vx, vy);
                self.skip_if(x == y)
            }
            // 6XNN (LD Vx, byte)
            Op::Load_Byte { vx, nn } => {
                self.cpu.registers[vx as usize] = nn;
                self.next()
            }
            // 7xnn (ADD Vx, byte)
            //
            // Carry flag is not set.
            Op::Add_Byte { vx, nn } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x.wrapping_add(nn);
                self.next()
            }
            // 8XY0 (LD Vx, Vy)
            Op::Load_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] = self.cpu.registers[vy as usize];
                self.next()
            }
            // 8XY1 (OR Vx, Vy)
            Op::Or_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] |= self.cpu.registers[vy as usize];
                self.next()
            }
            // 8XY2 (AND Vx, Vy)
            Op::And_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] &= self.cpu.registers[vy as usize];
                self.next()
            }
            // 8XY3 (XOR Vx, Vy)
            Op::Xor_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] ^= self.cpu.registers[vy as usize];
                self.next()
            }
            // 8XY4 (ADD Vx, Vy)
            //
            // If overflow, set VF to 1, else 0.
            Op::Add_Vx_Vy { vx, vy } => {
                let (x, y) = self.xy(vx, vy);
                let (result, carry) = x.overflowing_add(y);
                self.set_with_flag(vx, result, carry);
                self.next()
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub_Vx_Vy { vx, vy } => {
                let (x, y) = self.xy(vx, vy);
                self.set_with_flag(vx, x.wrapping_sub(y), x >= y);
                self.next()
            }
            // 8XY6 (SHR Vx)
            Op::ShiftRight { vx, .. } => {
                let x = self.cpu.registers[vx as usize];
                self.set_with_flag(vx, x >> 1, x & 1 == 1);
                self.next()
            }
            // 8XY7 (SUBN Vx, Vy)
            Op::SubReverse_Vx_Vy { vx, vy } => {
                let (x, y) = self.xy(vx, vy);
                self.set_with_flag(vx, y.wrapping_sub(x), y >= x);
                self.next()
            }
            // 8XYE (SHL Vx)
            Op::ShiftLeft { vx, .. } => {
                let x = self.cpu.registers[vx as usize];
                self.set_with_flag(vx, x << 1, (x >> 7) & 1 == 1);
                self.next()
            }
            // 9xy0 (SNE Vx, Vy)
            Op::Skip_NotEq { vx, vy } => {
                let (x, y) = self.xy(vx, vy);
                self.skip_if(x != y)
            }
            // Annn (LD I, addr)
            Op::Load_Address { address } => {
                self.cpu.address = address;
                self.next()
            }
            // Bnnn (JP V0, addr)
            Op::Jump_V0 { address } => {
                self.cpu.pc = address + self.cpu.registers[0] as Address;
                Flow::Jump
            }
            // CXNN (RND Vx, byte)
            Op::Random { vx, nn } => {
                self.cpu.registers[vx as usize] = self.rng.gen::<u8>() & nn;
                self.next()
            }
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // If the drawing operation erases existing pixels in the display buffer, register VF is set to
            // 1, and set to 0 if no display bits are unset. This is used for collision detection.
            Op::Draw { vx, vy, n } => {
                let (x, y) = self.xy(vx, vy);
                let (rows, len) = self.cpu.sprite(n);

                self.cpu.registers[FLAG_REGISTER] = 0;
                let is_erased = self
                    .cpu
                    .display
                    .draw_sprite(x as usize, y as usize, &rows[..len]);
                self.cpu.registers[FLAG_REGISTER] = is_erased as u8;

                self.next();
                Flow::Draw
            }
            // Ex9E (SKP Vx)
            Op::Skip_Pressed { vx } => {
                let key = self.cpu.registers[vx as usize];
                self.skip_if(self.cpu.key_state(key))
            }
            // ExA1 (SKNP Vx)
            Op::Skip_NotPressed { vx } => {
                let key = self.cpu.registers[vx as usize];
                self.skip_if(!self.cpu.key_state(key))
            }
            // Fx07 (LD Vx, DT)
            Op::Load_Vx_Delay { vx } => {
                self.cpu.registers[vx as usize] = self.cpu.timers.delay;
                self.next()
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            Op::Load_Vx_Key { vx } => match self.cpu.first_key() {
                Some(k) => {
                    self.cpu.registers[vx as usize] = k;
                    self.next()
                }
                // Leave the program counter in place to stall the machine.
                None => Flow::KeyWait,
            },
            // Fx15 (LD DT, Vx)
            Op::Load_Delay_Vx { vx } => {
                self.cpu.timers.delay = self.cpu.registers[vx as usize];
                self.next()
            }
            // Fx18 (LD ST, Vx)
            Op::Load_Sound_Vx { vx } => {
                self.cpu.timers.sound = self.cpu.registers[vx as usize];
                self.next();
                Flow::Sound
            }
            // Fx1E (ADD I, Vx)
            //
            // VF is not affected.
            Op::Add_Address_Vx { vx } => {
                let x = self.cpu.registers[vx as usize] as Address;
                self.cpu.address = self.cpu.address.wrapping_add(x);
                self.next()
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Op::Load_Font { vx } => {
                let x = self.cpu.registers[vx as usize] as Address;
                self.cpu.address = FONTSET_START as Address + x * FONTSET_HEIGHT as Address;
                self.next()
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Op::Load_Bcd { vx } => {
                let addr = self.cpu.address as usize;
                let x = self.cpu.registers[vx as usize];
                self.cpu.write(addr,     x / 100);
                self.cpu.write(addr + 1, x / 10  % 10);
                self.cpu.write(addr + 2, x       % 10);
                self.next()
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            // I itself is left unmodified.
            Op::Store_Registers { vx } => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx as usize {
                    self.cpu.write(addr + v, self.cpu.registers[v]);
                }
                self.next()
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            // I itself is left unmodified.
            Op::Load_Registers { vx } => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx as usize {
                    self.cpu.registers[v] = self.cpu.read(addr + v);
                }
                self.next()
            }
        };

        Ok(flow)
    }

    #[inline(always)]
    fn xy(&self, vx: u8, vy: u8) -> (u8, u8) {
        (
            self.cpu.registers[vx as usize],
            self.cpu.registers[vy as usize],
        )
    }
}

/// Troubleshooting
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the contents of program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, std::fmt::Error> {
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
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, self.cpu.read(i + 1))?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, std::fmt::Error> {
        self.cpu.display.dump()
    }

    pub fn dump_keys(&self) -> Result<String, std::fmt::Error> {
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

    pub fn dump_registers(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();

        for (i, v) in self.cpu.registers.iter().enumerate() {
            write!(buf, "V{i:X}={v:02X} ")?;
        }
        writeln!(buf)?;
        write!(
            buf,
            "PC={:04X} I={:04X} SP={} DT={} ST={}",
            self.cpu.pc,
            self.cpu.address,
            self.cpu.sp,
            self.cpu.timers.delay,
            self.cpu.timers.sound
        )?;

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(pc: Address, code: u16, op: &Op) {
    log::trace!("{pc:04X}: {code:04X} {op}");
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Address, _: u16, _: &Op) {}

#[cfg(test)]
mod test {
    use super::*;

    const START: Address = MEM_START as Address;

    fn vm_with(program: &[u8]) -> Chip8Vm {
        let mut vm = Chip8Vm::new(Chip8Conf {
            seed: Some(2),
            ..Chip8Conf::default()
        });
        vm.load_bytecode(program).unwrap();
        vm
    }

    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a keypress, then store the key value in Vx.
    /// The VM must stall while waiting, and signal the state to the outer executer.
    #[test]
    #[rustfmt::skip]
    fn test_key_wait() {
        let mut vm = vm_with(&[
            0xF1, 0x0A, // LD v1, K
            0x62, 0x42  // LD v2, 0x42  ; sentinal
        ]);

        // machine must stall
        for _ in 0..6 {
            assert_eq!(vm.step().unwrap(), Flow::KeyWait);
            assert_eq!(vm.cpu.pc, START);
        }

        // machine has yielded, waiting for any key to be pressed.
        vm.set_key(KeyCode::Key5, true);
        vm.set_key(KeyCode::Key9, true);

        // machine will now advance, taking the lowest key
        assert_eq!(vm.step().unwrap(), Flow::Ok);
        assert_eq!(vm.cpu.pc, START + 2);
        assert_eq!(vm.cpu.registers[1], 0x05);

        // Ensure the machine is continuing
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc, START + 4);
        assert_eq!(vm.cpu.registers[2], 0x42); // sentinal
    }

    /// The stalled machine must not count down timers on its own.
    #[test]
    fn test_key_wait_timers() {
        let mut vm = vm_with(&[0xF0, 0x0A]);
        vm.cpu.timers.delay = 3;

        vm.run_steps(10).unwrap();
        assert_eq!(vm.delay_timer(), 3);
    }

    /// Flags are written to VF as exactly 1 or 0.
    #[test]
    fn test_flag_values() {
        // ADD v0, v1 with and without carry.
        let mut vm = vm_with(&[0x60, 0xFF, 0x61, 0x02, 0x80, 0x14, 0x80, 0x14]);

        vm.run_steps(3).unwrap();
        assert_eq!(vm.cpu.registers[0], 0x01);
        assert_eq!(vm.cpu.registers[0xF], 1);

        vm.step().unwrap();
        assert_eq!(vm.cpu.registers[0], 0x03);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    #[rustfmt::skip]
    fn test_draw_collision() {
        // Draw two sprites next to each other.
        // The zero bits of the second draw must not erase
        // the pixels of the first draw
        //
        // draw sprite 1 at x=4
        // ____####, vf == 0
        //
        // draw sprite 2 at x=0
        // ########, vf == 0
        let mut vm = vm_with(&[
            0xA2, 0x0C, // LD I, .sprite
            0x60, 0x04, // LD v0, 4
            0x61, 0x00, // LD v1, 0
            0xD0, 0x11, // DRW v0, v1, 1
            0x60, 0x00, // LD v0, 0
            0xD0, 0x11, // DRW v0, v1, 1
            // .sprite
            0b11110000,
            0b00000000,
        ]);

        vm.run_steps(6).unwrap();

        assert!(vm.display_buffer()[0]); // sprite 2
        assert!(vm.display_buffer()[4]); // sprite 1
        assert!(vm.display_buffer()[7]); // sprite 1
        assert!(!vm.display_buffer()[8]);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    #[rustfmt::skip]
    fn test_draw_erase() {
        let mut vm = vm_with(&[
            0x6F, 0x07, // LD vF, 7 ; clobbered by the draw
            0xA2, 0x0A, // LD I, .sprite
            0xD0, 0x02, // DRW v0, v0, 2
            0xD0, 0x02, // DRW v0, v0, 2
            0x12, 0x08, // JP self
            // .sprite
            0b10000001,
            0b01000010,
        ]);

        vm.run_steps(3).unwrap();
        assert_eq!(vm.cpu.registers[0xF], 0);
        assert!(vm.display_buffer()[0]);
        assert!(vm.display_buffer()[DISPLAY_WIDTH + 1]);

        assert_eq!(vm.step().unwrap(), Flow::Draw);
        assert_eq!(vm.cpu.registers[0xF], 1);
        assert!(vm.display_buffer().iter().all(|px| !*px));
        assert!(vm.draw_flag());
    }

    #[test]
    fn test_clear_screen() {
        let mut vm = vm_with(&[0x00, 0xE0]);
        vm.cpu.display.draw_sprite(0, 0, &[0xFF]);
        vm.clear_draw_flag();

        assert_eq!(vm.step().unwrap(), Flow::Draw);
        assert!(vm.display_buffer().iter().all(|px| !*px));
        assert!(vm.draw_flag());
        assert_eq!(vm.pc(), START + 2);
    }

    #[test]
    #[rustfmt::skip]
    fn test_call_return() {
        let mut vm = vm_with(&[
            0x22, 0x06, // CALL 0x206
            0x60, 0x11, // LD v0, 0x11
            0x12, 0x04, // JP self
            0x61, 0x22, // LD v1, 0x22
            0x00, 0xEE, // RET
        ]);

        assert_eq!(vm.step().unwrap(), Flow::Jump);
        assert_eq!(vm.pc(), 0x206);
        assert_eq!(vm.stack_depth(), 1);
        assert_eq!(vm.cpu.stack[0], START);

        vm.step().unwrap();
        assert_eq!(vm.step().unwrap(), Flow::Jump);
        assert_eq!(vm.pc(), START + 2);
        assert_eq!(vm.stack_depth(), 0);

        vm.step().unwrap();
        assert_eq!(vm.cpu.registers[0], 0x11);
        assert_eq!(vm.cpu.registers[1], 0x22);
    }

    #[test]
    fn test_return_underflow() {
        let mut vm = vm_with(&[0x00, 0xEE]);

        let err = vm.step().unwrap_err();
        assert!(matches!(err, Chip8Error::StackUnderflow { address: 0x200 }));
        assert_eq!(vm.pc(), START);
        assert_eq!(vm.stack_depth(), 0);
    }

    #[test]
    fn test_call_overflow() {
        // Recursive call to itself.
        let mut vm = vm_with(&[0x22, 0x00]);

        vm.run_steps(STACK_SIZE).unwrap();
        assert_eq!(vm.stack_depth(), STACK_SIZE);

        let err = vm.step().unwrap_err();
        assert!(matches!(err, Chip8Error::StackOverflow { .. }));
        assert_eq!(vm.stack_depth(), STACK_SIZE);
        assert_eq!(vm.pc(), START);
    }

    #[test]
    fn test_jump_v0() {
        let mut vm = vm_with(&[0x60, 0x10, 0xB3, 0x00]);
        vm.run_steps(2).unwrap();
        assert_eq!(vm.pc(), 0x310);
    }

    #[test]
    fn test_skip_register_pairs() {
        // SE v0, v1 with equal registers, then SNE v0, v2.
        let mut vm = vm_with(&[0x50, 0x10, 0x00, 0x00, 0x62, 0x01, 0x90, 0x20]);
        vm.step().unwrap();
        assert_eq!(vm.pc(), START + 4);
        vm.run_steps(2).unwrap();
        assert_eq!(vm.pc(), START + 10);
    }

    #[test]
    fn test_skip_keys() {
        let mut vm = vm_with(&[0x60, 0x0C, 0xE0, 0x9E, 0x00, 0x00, 0xE0, 0xA1]);
        vm.set_key(KeyCode::KeyC, true);

        vm.run_steps(2).unwrap();
        assert_eq!(vm.pc(), START + 6);

        vm.step().unwrap();
        assert_eq!(vm.pc(), START + 8);
    }

    #[test]
    fn test_skip_key_out_of_range() {
        // Keys beyond F are never pressed.
        let mut vm = vm_with(&[0x60, 0x1F, 0xE0, 0x9E]);
        vm.set_keys(&[true; KEY_COUNT as usize]);

        vm.run_steps(2).unwrap();
        assert_eq!(vm.pc(), START + 4);
    }

    #[test]
    fn test_shift_flags() {
        let mut vm = vm_with(&[0x60, 0x81, 0x80, 0x06, 0x61, 0x81, 0x81, 0x0E]);

        vm.run_steps(2).unwrap();
        assert_eq!(vm.cpu.registers[0], 0x40);
        assert_eq!(vm.cpu.registers[0xF], 1);

        vm.run_steps(2).unwrap();
        assert_eq!(vm.cpu.registers[1], 0x02);
        assert_eq!(vm.cpu.registers[0xF], 1);

        // Nothing shifted out.
        let mut vm = vm_with(&[0x60, 0x82, 0x80, 0x06, 0x61, 0x41, 0x81, 0x0E]);

        vm.run_steps(2).unwrap();
        assert_eq!(vm.cpu.registers[0], 0x41);
        assert_eq!(vm.cpu.registers[0xF], 0);

        vm.run_steps(2).unwrap();
        assert_eq!(vm.cpu.registers[1], 0x82);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    #[rustfmt::skip]
    fn test_logic_ops() {
        let mut vm = vm_with(&[
            0x60, 0xCA, // LD  v0, 0xCA
            0x61, 0x5F, // LD  v1, 0x5F
            0x82, 0x00, // LD  v2, v0
            0x82, 0x11, // OR  v2, v1
            0x83, 0x00, // LD  v3, v0
            0x83, 0x12, // AND v3, v1
            0x84, 0x00, // LD  v4, v0
            0x84, 0x13, // XOR v4, v1
        ]);

        vm.run_steps(3).unwrap();
        assert_eq!(vm.cpu.registers[2], 0xCA);

        vm.run_steps(5).unwrap();
        assert_eq!(vm.cpu.registers[2], 0xCA | 0x5F);
        assert_eq!(vm.cpu.registers[3], 0xCA & 0x5F);
        assert_eq!(vm.cpu.registers[4], 0xCA ^ 0x5F);
        // Sources untouched, and VF not affected.
        assert_eq!(vm.cpu.registers[0], 0xCA);
        assert_eq!(vm.cpu.registers[1], 0x5F);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    /// When the destination is VF itself, the flag overwrites the result.
    #[test]
    fn test_flag_register_destination() {
        let mut vm = vm_with(&[0x6F, 0xFF, 0x61, 0x01, 0x8F, 0x14]);
        vm.run_steps(3).unwrap();
        assert_eq!(vm.cpu.registers[0xF], 1);
    }

    #[test]
    fn test_subtract_reverse() {
        let mut vm = vm_with(&[0x60, 0x05, 0x61, 0x03, 0x80, 0x17]);
        vm.run_steps(3).unwrap();
        assert_eq!(vm.cpu.registers[0], 0xFE);
        assert_eq!(vm.cpu.registers[0xF], 0);

        // No borrow, including equal operands.
        let mut vm = vm_with(&[0x60, 0x03, 0x61, 0x05, 0x80, 0x17, 0x62, 0x05, 0x82, 0x17]);
        vm.run_steps(3).unwrap();
        assert_eq!(vm.cpu.registers[0], 0x02);
        assert_eq!(vm.cpu.registers[0xF], 1);

        vm.run_steps(2).unwrap();
        assert_eq!(vm.cpu.registers[2], 0x00);
        assert_eq!(vm.cpu.registers[0xF], 1);
    }

    #[test]
    fn test_random_masked() {
        let mut vm = vm_with(&[0xC0, 0x0F, 0x12, 0x00]);

        for _ in 0..50 {
            vm.run_steps(2).unwrap();
            assert_eq!(vm.cpu.registers[0] & 0xF0, 0);
        }
    }

    #[test]
    fn test_random_seeded() {
        let program = [0xC0, 0xFF, 0xC1, 0xFF, 0xC2, 0xFF];

        let mut a = vm_with(&program);
        let mut b = vm_with(&program);
        a.run_steps(3).unwrap();
        b.run_steps(3).unwrap();

        assert_eq!(a.registers(), b.registers());
    }

    #[test]
    fn test_timers_instructions() {
        let mut vm = vm_with(&[0x60, 0x03, 0xF0, 0x15, 0xF0, 0x18, 0xF1, 0x07]);

        vm.run_steps(2).unwrap();
        assert_eq!(vm.delay_timer(), 3);
        assert_eq!(vm.step().unwrap(), Flow::Sound);
        assert_eq!(vm.sound_timer(), 3);

        assert!(!vm.tick_timers());
        vm.step().unwrap();
        assert_eq!(vm.cpu.registers[1], 2);

        assert!(!vm.tick_timers());
        assert!(vm.tick_timers());
        assert_eq!(vm.sound_timer(), 0);
    }

    #[test]
    fn test_font_address() {
        let mut vm = vm_with(&[0x60, 0x0A, 0xF0, 0x29]);
        vm.run_steps(2).unwrap();
        assert_eq!(vm.address(), 0x050 + 5 * 0xA);
        assert_eq!(vm.ram()[vm.address() as usize], 0xF0);
    }

    #[test]
    fn test_add_address() {
        let mut vm = vm_with(&[0x6F, 0x00, 0x60, 0xFF, 0xAF, 0xFF, 0xF0, 0x1E]);
        vm.run_steps(4).unwrap();
        assert_eq!(vm.address(), 0xFFF + 0xFF);
        // VF not affected
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    fn test_load_resets_machine() {
        let mut vm = vm_with(&[0x60, 0x42, 0x61, 0x43]);
        vm.run_steps(2).unwrap();

        vm.load_bytecode(&[0x00, 0xE0]).unwrap();
        assert_eq!(vm.pc(), START);
        assert_eq!(vm.cpu.registers, [0; REGISTER_COUNT]);
        assert_eq!(vm.ram()[START as usize + 2], 0);
    }

    #[test]
    fn test_load_too_large() {
        let mut vm = vm_with(&[0x60, 0x42]);
        vm.step().unwrap();

        let err = vm.load_bytecode(&[0; MAX_PROGRAM_SIZE + 1]).unwrap_err();
        assert!(matches!(err, Chip8Error::LargeProgram { .. }));

        // No partial load, and the running machine is untouched.
        assert_eq!(vm.cpu.registers[0], 0x42);
        assert_eq!(vm.ram()[START as usize], 0x60);
    }

    #[test]
    fn test_dump_registers() {
        let vm = vm_with(&[]);
        let dump = vm.dump_registers().unwrap();
        assert!(dump.starts_with("V0=00 V1=00"));
        assert!(dump.contains("PC=0200"));
    }

    #[test]
    fn test_dump_ram() {
        let vm = vm_with(&[0xA2, 0x1E, 0x12, 0x00, 0x80]);
        let dump = vm.dump_ram(5).unwrap();
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines, vec!["0200: A21E", "0202: 1200", "0204: 8000"]);
    }

    #[test]
    fn test_dump_keys() {
        let mut vm = vm_with(&[]);
        assert_eq!(vm.dump_keys().unwrap(), "");

        vm.set_key(KeyCode::Key1, true);
        vm.set_key(KeyCode::KeyF, true);
        assert_eq!(vm.dump_keys().unwrap(), "keys: k1kf");

        vm.clear_keys();
        assert_eq!(vm.dump_keys().unwrap(), "");
    }

    /// Releasing the keypad unblocks nothing, the key wait keeps stalling.
    #[test]
    fn test_clear_keys_key_wait() {
        let mut vm = vm_with(&[0xF0, 0x0A]);
        vm.set_keys(&[true; KEY_COUNT as usize]);
        vm.clear_keys();

        assert_eq!(vm.step().unwrap(), Flow::KeyWait);
        assert_eq!(vm.pc(), START);
    }
}
