//! Entrypoint for CLI
use std::{env, error::Error, fs, time::Instant};

use chip8::{constants::*, prelude::*, Clock, Hz, IMPL_VERSION};
use log::{debug, info};

static USAGE: &str = r#"
usage: chip8 CMD FILE [FRAMES]

commands:
    run     Run the target ROM file without a window, then print the display
    dis     Disassemble the target ROM into readable assembly

examples:
    chip8 run maze.rom
    chip8 run maze.rom 120
    chip8 dis maze.rom
"#;

const DEFAULT_FRAMES: usize = 600;

/// Devices for running without a window or keyboard.
#[derive(Default)]
struct Headless {
    presented: usize,
}

impl Devices for Headless {
    fn keys(&mut self) -> [bool; KEY_COUNT as usize] {
        [false; KEY_COUNT as usize]
    }

    fn draw(&mut self, _display: Chip8DisplayBuffer) {
        self.presented += 1;
    }

    fn tone_stop(&mut self) {
        info!("tone stop");
    }
}

fn run_bytecode(filepath: impl AsRef<str>, frames: usize) -> Chip8Result<()> {
    println!("Running Bytecode Interpreter");

    let mut vm = Chip8Vm::new(Chip8Conf::default());
    let size = vm.load_file(filepath.as_ref())?;
    debug!("program memory:\n{}", vm.dump_ram(size)?);

    let mut devices = Headless::default();
    let mut clock = Clock::new(Hz::default());

    let start = Instant::now();
    let mut result = Ok(());
    for _ in 0..frames {
        result = vm.run_frame(&mut devices);
        if result.is_err() {
            break;
        }
        clock.wait();
    }
    let end = Instant::now();

    println!(
        "time taken: {}ms",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis
    debug!("frames presented: {}", devices.presented);
    debug!("\n{}", vm.dump_registers()?);
    println!("{}", vm.dump_display()?);

    result
}

fn run_disassembler(filepath: impl AsRef<str>) -> Chip8Result<()> {
    let bytecode = fs::read(filepath.as_ref())?;

    let mut buf = String::new();
    Disassembler::new(bytecode.as_slice()).disassemble(&mut buf)?;
    print!("{buf}");

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init()?;

    match parse_args() {
        Some(Cmd::Run { filepath, frames }) => run_bytecode(filepath, frames)?,
        Some(Cmd::Dis { filepath }) => run_disassembler(filepath)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(cmd) => {
            // don't format me T.T
            match cmd.as_str() {
                "run" => Some(Cmd::Run {
                    filepath: args.next()?,
                    frames: match args.next() {
                        Some(frames) => frames.parse().ok()?,
                        None => DEFAULT_FRAMES,
                    },
                }),
                "dis" => Some(Cmd::Dis {
                    filepath: args.next()?,
                }),
                _ => None,
            }
        }
        None => None,
    }
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run { filepath: String, frames: usize },
    /// Disassemble
    Dis { filepath: String },
}
