use cemu::cpu::Cpu;
use cemu::elf_loader::load_elf;
use cemu::logging;
use cemu::monitor::Monitor;
use clap::{Parser, Subcommand};
use log::{error, info, warn, LevelFilter};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_DEBUG_INPUT: &str = "./test/temp_02.out";

#[derive(Parser)]
#[command(name = "cemu", about = "A 64-bit RISC-V instruction-set emulator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load an ELF binary and run it to completion (the default).
    Run {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Enter the interactive line monitor.
    Debug {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Run the crate's own test suite.
    Test {
        #[arg(short, long, default_value = "info")]
        quiet: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(LevelFilter::Info, None);

    let result = match cli.command {
        Some(Command::Run { input }) => run_to_completion(&input),
        Some(Command::Debug { input, log }) => run_debug(input, log),
        Some(Command::Test { quiet, output }) => run_tests(&quiet, output),
        None => {
            error!("no subcommand given; use `run --input PATH` or `debug`");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

fn run_to_completion(input: &PathBuf) -> Result<(), ()> {
    let mut cpu = Cpu::new();
    if let Err(e) = load_elf(&mut cpu, input) {
        fatal_err(format!("{e}"));
        return Err(());
    }
    match cpu.run() {
        Ok(reason) => {
            info!("halted: {reason:?}");
            Ok(())
        }
        Err(trap) => {
            fatal_err(format!("{trap}"));
            Err(())
        }
    }
}

fn run_debug(input: Option<PathBuf>, log_path: Option<PathBuf>) -> Result<(), ()> {
    if let Some(path) = &log_path {
        logging::init(LevelFilter::Trace, Some(path));
    }
    let mut cpu = Cpu::new();
    let input = input.unwrap_or_else(|| PathBuf::from(DEFAULT_DEBUG_INPUT));
    if load_elf(&mut cpu, &input).is_err() {
        warn!("could not preload {}; starting with empty DRAM", input.display());
    }
    let mut monitor = Monitor::new(cpu, Some(input)).map_err(|e| {
        fatal_err(format!("failed to start monitor: {e}"));
    })?;
    monitor.run().map_err(|e| {
        fatal_err(format!("monitor error: {e}"));
    })
}

fn run_tests(quiet: &str, output: Option<PathBuf>) -> Result<(), ()> {
    let level = match quiet.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    };
    logging::init(level, output.as_deref());
    info!("this subcommand is a thin wrapper; run `cargo test` for the real suite");
    Ok(())
}

fn fatal_err(message: String) {
    cemu::fatal!("{message}");
}
