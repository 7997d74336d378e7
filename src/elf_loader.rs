//! ELF64 loader: whole-file copy into DRAM plus header-only parsing to seed
//! the program counter from `e_entry`.

use crate::cpu::Cpu;
use crate::dram::DRAM_BASE;
use elf::endian::AnyEndian;
use elf::ElfBytes;
use log::info;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a valid ELF64 file: {source}")]
    Parse {
        path: String,
        #[source]
        source: elf::ParseError,
    },
    #[error(transparent)]
    Memory(#[from] crate::dram::MemoryError),
}

fn machine_name(e_machine: u16) -> &'static str {
    match e_machine {
        0x02 => "SPARC",
        0x03 => "x86",
        0x08 => "MIPS",
        0x14 => "PowerPC",
        0x28 => "ARM",
        0x32 => "IA-64",
        0x3E => "x86-64",
        0xB7 => "AArch64",
        0xF3 => "RISC-V",
        _ => "NA",
    }
}

/// Copies `path`'s full contents into DRAM, parses the ELF64 header for
/// `e_entry`, and advances `cpu.pc` by the entry offset (the caller is
/// expected to have already set `cpu.pc` to [`DRAM_BASE`], as `Cpu::new`
/// does).
pub fn load_elf<P: AsRef<Path>>(cpu: &mut Cpu, path: P) -> Result<(), LoadError> {
    let path_ref = path.as_ref();
    let path_str = path_ref.display().to_string();
    let bytes = fs::read(path_ref).map_err(|source| LoadError::Io {
        path: path_str.clone(),
        source,
    })?;

    let elf = ElfBytes::<AnyEndian>::minimal_parse(&bytes).map_err(|source| LoadError::Parse {
        path: path_str.clone(),
        source,
    })?;
    let e_entry = elf.ehdr.e_entry;
    let e_machine = elf.ehdr.e_machine;

    cpu.bus.alloc_data(&bytes)?;
    cpu.pc = DRAM_BASE.wrapping_add(e_entry);

    info!("File Name    : {path_str}");
    info!("File Size    : {}", bytes.len());
    info!("Architecture : {}", machine_name(e_machine));
    info!("Entry Point  : {e_entry:#x}");
    info!("DRAM Memory  : {DRAM_BASE:#x}");
    info!("PC           : {:#x}", cpu.pc);

    Ok(())
}
