use std::{env, process};

#[macro_use]
extern crate slog;
use chip8_win::{AppConfig, AppError, Chip8App, ErrorKind};
use log::{error, info};
use slog::Drain;

fn main() {
    let decorator = slog_term::PlainDecorator::new(std::io::stdout());
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = slog::Logger::root(drain, o!("version" => chip8::IMPL_VERSION));

    let scope_guard = slog_scope::set_global_logger(logger);
    if let Err(err) = slog_stdlog::init_with_level(log::Level::Info) {
        eprintln!("failed to install log bridge: {err}");
    }

    let code = match run() {
        Ok(_) => {
            info!("done");
            0
        }
        Err(AppError {
            kind: ErrorKind::Usage,
        }) => {
            error!("usage: chip8-win FILE");
            // FreeBSD EX_USAGE (64)
            64
        }
        Err(err) => {
            error!("{err}");
            1
        }
    };

    // Flush the async drain before exiting.
    drop(scope_guard);
    process::exit(code);
}

fn run() -> Result<(), AppError> {
    let filepath = env::args().nth(1).ok_or_else(AppError::usage)?;

    info!("starting...");
    let config = AppConfig::load()?;

    let mut event_loop = Chip8App::create_event_loop();
    let mut app = Chip8App::new(&event_loop, &config)?;
    app.load_rom(&filepath)?;
    app.run(&mut event_loop)
}
