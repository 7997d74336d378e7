//! Structured logging setup. Levels mirror the six used by the project this
//! emulator is modelled after (TRACE/DEBUG/INFO/WARN/ERROR/FATAL); the `log`
//! crate only has five, so FATAL is expressed as an `error!` line prefixed
//! `FATAL:` rather than inventing a sixth level.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::File;
use std::path::Path;

/// Initializes the global logger. `level` sets the minimum severity passed
/// through; `log_file` redirects output to a file instead of stderr.
pub fn init(level: LevelFilter, log_file: Option<&Path>) {
    let mut builder = Builder::new();
    builder.filter_level(level);
    match log_file {
        Some(path) => match File::create(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("cemu: could not open log file {}: {e}", path.display());
            }
        },
        None => {
            builder.target(Target::Stderr);
        }
    }
    let _ = builder.try_init();
}

/// Logs a fatal condition immediately before the process terminates.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {
        log::error!("FATAL: {}", format!($($arg)*))
    };
}
