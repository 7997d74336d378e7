use cemu::cpu::{Cpu, HaltReason, StepOutcome};
use cemu::dram::DRAM_BASE;

fn cpu_with_program(words: &[u32]) -> Cpu {
    let mut cpu = Cpu::new();
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    cpu.bus.alloc_data(&bytes).unwrap();
    cpu
}

#[test]
fn addi_add_sequence_computes_expected_sum() {
    // addi x1, x0, 7 ; add x2, x1, x1 ; addi x3, x2, 1
    let mut cpu = cpu_with_program(&[0x0070_0093, 0x0010_8133, 0x0011_0193]);
    for _ in 0..3 {
        cpu.step_one().unwrap();
    }
    assert_eq!(cpu.regs.read(1).unwrap(), 7);
    assert_eq!(cpu.regs.read(2).unwrap(), 14);
    assert_eq!(cpu.regs.read(3).unwrap(), 15);
    assert_eq!(cpu.pc, DRAM_BASE + 12);
}

#[test]
fn program_halts_on_trailing_zero_word() {
    let mut cpu = cpu_with_program(&[0x0070_0093, 0x0000_0000]);
    assert_eq!(cpu.step_one().unwrap(), StepOutcome::Continue);
    assert_eq!(
        cpu.step_one().unwrap(),
        StepOutcome::Halt(HaltReason::NullInstruction)
    );
}

#[test]
fn run_executes_until_ecall() {
    // addi x1, x0, 1 ; addi x1, x1, 1 ; ecall
    let mut cpu = cpu_with_program(&[0x0010_0093, 0x0010_8093, 0b1110011]);
    let reason = cpu.run().unwrap();
    assert_eq!(reason, HaltReason::Ecall);
    assert_eq!(cpu.regs.read(1).unwrap(), 2);
}

#[test]
fn loop_with_branch_counts_down_to_zero() {
    // x1 = 3
    // loop: addi x1, x1, -1
    //       bne x1, x0, loop
    // ecall
    let addi = |rd: u32, rs1: u32, imm: i32| -> u32 {
        ((imm as u32 & 0xfff) << 20) | (rs1 << 15) | (rd << 7) | 0b0010011
    };
    let bne_back_4: u32 = {
        // bne x1, x0, -4: branches from offset 8 back to offset 4 (the loop body)
        let imm: i32 = -4;
        let u = imm as u32 & 0x1fff;
        let bit12 = (u >> 12) & 1;
        let bit11 = (u >> 11) & 1;
        let bits10_5 = (u >> 5) & 0x3f;
        let bits4_1 = (u >> 1) & 0xf;
        (bit12 << 31) | (bits10_5 << 25) | (0 << 20) | (1 << 15) | (0b001 << 12) | (bits4_1 << 8) | (bit11 << 7) | 0b1100011
    };
    let mut cpu = cpu_with_program(&[addi(1, 0, 3), addi(1, 1, -1), bne_back_4, 0b1110011]);
    let reason = cpu.run().unwrap();
    assert_eq!(reason, HaltReason::Ecall);
    assert_eq!(cpu.regs.read(1).unwrap(), 0);
}
