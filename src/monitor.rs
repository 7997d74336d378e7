//! Line-oriented interactive debug monitor: `run`/`step N`/`load PATH`/`quit`.

use crate::cpu::{Cpu, StepOutcome};
use crate::elf_loader::load_elf;
use log::{info, warn};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

const HISTORY_FILE: &str = "history.txt";
const MAX_STEP: u32 = 10_000;

pub struct Monitor {
    editor: DefaultEditor,
    cpu: Cpu,
    loaded_path: Option<PathBuf>,
}

impl Monitor {
    pub fn new(cpu: Cpu, initial_path: Option<PathBuf>) -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        let _ = editor.load_history(HISTORY_FILE);
        Ok(Monitor {
            editor,
            cpu,
            loaded_path: initial_path,
        })
    }

    pub fn run(&mut self) -> rustyline::Result<()> {
        loop {
            match self.editor.readline("cemu> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(line)?;
                    if self.dispatch(line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    warn!("readline error: {e}");
                    break;
                }
            }
        }
        let _ = self.editor.save_history(HISTORY_FILE);
        Ok(())
    }

    /// Returns true when the REPL should exit.
    fn dispatch(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        match cmd {
            "help" | "h" => print_help(),
            "run" | "r" => self.cmd_run(),
            "step" | "si" => {
                let n = parts.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(1);
                self.cmd_step(n);
            }
            "load" | "l" => match parts.next() {
                Some(path) => self.cmd_load(path),
                None => warn!("load requires a file path"),
            },
            "quit" | "q" => return true,
            other => warn!("unknown command: {other} (try `help`)"),
        }
        false
    }

    fn cmd_run(&mut self) {
        match self.cpu.run() {
            Ok(reason) => info!("halted: {reason:?}"),
            Err(trap) => warn!("trap: {trap}"),
        }
    }

    fn cmd_step(&mut self, n: u32) {
        let n = n.min(MAX_STEP);
        for _ in 0..n {
            match self.cpu.step_one() {
                Ok(StepOutcome::Continue) => continue,
                Ok(StepOutcome::Halt(reason)) => {
                    info!("halted: {reason:?}");
                    break;
                }
                Err(trap) => {
                    warn!("trap: {trap}");
                    break;
                }
            }
        }
        info!("pc={:#x}", self.cpu.pc);
    }

    fn cmd_load(&mut self, path: &str) {
        match load_elf(&mut self.cpu, path) {
            Ok(()) => self.loaded_path = Some(PathBuf::from(path)),
            Err(e) => warn!("load failed: {e}"),
        }
    }
}

fn print_help() {
    info!("commands: help (h), run (r), step [N] (si), load PATH (l), quit (q)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_quit_requests_exit() {
        let cpu = Cpu::new();
        let mut monitor = Monitor::new(cpu, None).unwrap();
        assert!(monitor.dispatch("quit"));
        assert!(!monitor.dispatch("help"));
    }

    #[test]
    fn dispatch_step_alias_advances_pc() {
        let mut cpu = Cpu::new();
        cpu.bus.alloc_data(&0x0070_0093u32.to_le_bytes()).unwrap();
        let mut monitor = Monitor::new(cpu, None).unwrap();
        monitor.dispatch("si 1");
        assert_eq!(monitor.cpu.pc, crate::dram::DRAM_BASE + 4);
    }
}
