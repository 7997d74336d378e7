//! Instruction decoding: turns a raw 32-bit word into a [`DecodedInstruction`],
//! kept separate from execution so decode can be unit tested on its own.

use crate::opcodes::*;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#09b} in instruction {inst:#010x}")]
    UnknownOpcode { opcode: u32, inst: u32 },
    #[error("unknown funct3 {funct3:#05b} for opcode {opcode:#09b} in instruction {inst:#010x}")]
    UnknownFunct3 { opcode: u32, funct3: u32, inst: u32 },
    #[error("unknown funct7 {funct7:#09b} for opcode {opcode:#09b}/funct3 {funct3:#05b} in instruction {inst:#010x}")]
    UnknownFunct7 {
        opcode: u32,
        funct3: u32,
        funct7: u32,
        inst: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOp {
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Lb,
    Lh,
    Lw,
    Ld,
    Lbu,
    Lhu,
    Lwu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Sb,
    Sh,
    Sw,
    Sd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegImmOp {
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    Addiw,
    Slliw,
    Srliw,
    Sraiw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegRegOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Addw,
    Subw,
    Sllw,
    Srlw,
    Sraw,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    Mulw,
    Divw,
    Divuw,
    Remw,
    Remuw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrOp {
    Csrrw,
    Csrrs,
    Csrrc,
    Csrrwi,
    Csrrsi,
    Csrrci,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemOp {
    Ecall,
    Ebreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmoWidth {
    Word,
    Doubleword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmoOp {
    Add,
    Xor,
    And,
    Or,
    /// Decoded but not behaviourally specified: swap/min/max/lr/sc.
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedInstruction {
    Lui { rd: u8, imm: i64 },
    Auipc { rd: u8, imm: i64 },
    Jal { rd: u8, imm: i64 },
    Jalr { rd: u8, rs1: u8, imm: i64 },
    Branch { op: BranchOp, rs1: u8, rs2: u8, imm: i64 },
    Load { op: LoadOp, rd: u8, rs1: u8, imm: i64 },
    Store { op: StoreOp, rs1: u8, rs2: u8, imm: i64 },
    RegImm { op: RegImmOp, rd: u8, rs1: u8, imm: i64 },
    RegReg { op: RegRegOp, rd: u8, rs1: u8, rs2: u8 },
    Csr { op: CsrOp, rd: u8, rs1_or_uimm: u8, csr: u16 },
    System { op: SystemOp },
    Amo { width: AmoWidth, op: AmoOp, rd: u8, rs1: u8, rs2: u8 },
    Fence,
}

fn sign_extend(value: u32, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value as i64) << shift) >> shift
}

pub fn imm_i(inst: u32) -> i64 {
    sign_extend(inst >> 20, 12)
}

pub fn imm_s(inst: u32) -> i64 {
    let hi = (inst >> 25) & 0x7f;
    let lo = (inst >> 7) & 0x1f;
    sign_extend((hi << 5) | lo, 12)
}

pub fn imm_b(inst: u32) -> i64 {
    let bit12 = (inst >> 31) & 0x1;
    let bit11 = (inst >> 7) & 0x1;
    let bits10_5 = (inst >> 25) & 0x3f;
    let bits4_1 = (inst >> 8) & 0xf;
    let value = (bit12 << 12) | (bit11 << 11) | (bits10_5 << 5) | (bits4_1 << 1);
    sign_extend(value, 13)
}

pub fn imm_u(inst: u32) -> i64 {
    sign_extend(inst & 0xffff_f000, 32)
}

pub fn imm_j(inst: u32) -> i64 {
    let bit20 = (inst >> 31) & 0x1;
    let bits10_1 = (inst >> 21) & 0x3ff;
    let bit11 = (inst >> 20) & 0x1;
    let bits19_12 = (inst >> 12) & 0xff;
    let value = (bit20 << 20) | (bits19_12 << 12) | (bit11 << 11) | (bits10_1 << 1);
    sign_extend(value, 21)
}

pub fn decode(inst: u32) -> Result<DecodedInstruction, DecodeError> {
    let op = opcode(inst);
    let f3 = funct3(inst);
    let f7 = funct7(inst);
    let d = rd(inst);
    let s1 = rs1(inst);
    let s2 = rs2(inst);

    match op {
        OP_LUI => Ok(DecodedInstruction::Lui { rd: d, imm: imm_u(inst) }),
        OP_AUIPC => Ok(DecodedInstruction::Auipc { rd: d, imm: imm_u(inst) }),
        OP_JAL => Ok(DecodedInstruction::Jal { rd: d, imm: imm_j(inst) }),
        OP_JALR => Ok(DecodedInstruction::Jalr {
            rd: d,
            rs1: s1,
            imm: imm_i(inst),
        }),
        OP_BRANCH => {
            let bop = match f3 {
                FUNCT3_BEQ => BranchOp::Beq,
                FUNCT3_BNE => BranchOp::Bne,
                FUNCT3_BLT => BranchOp::Blt,
                FUNCT3_BGE => BranchOp::Bge,
                FUNCT3_BLTU => BranchOp::Bltu,
                FUNCT3_BGEU => BranchOp::Bgeu,
                _ => {
                    return Err(DecodeError::UnknownFunct3 {
                        opcode: op,
                        funct3: f3,
                        inst,
                    })
                }
            };
            Ok(DecodedInstruction::Branch {
                op: bop,
                rs1: s1,
                rs2: s2,
                imm: imm_b(inst),
            })
        }
        OP_LOAD => {
            let lop = match f3 {
                FUNCT3_B => LoadOp::Lb,
                FUNCT3_H => LoadOp::Lh,
                FUNCT3_W => LoadOp::Lw,
                FUNCT3_D => LoadOp::Ld,
                FUNCT3_BU => LoadOp::Lbu,
                FUNCT3_HU => LoadOp::Lhu,
                FUNCT3_WU => LoadOp::Lwu,
                _ => {
                    return Err(DecodeError::UnknownFunct3 {
                        opcode: op,
                        funct3: f3,
                        inst,
                    })
                }
            };
            Ok(DecodedInstruction::Load {
                op: lop,
                rd: d,
                rs1: s1,
                imm: imm_i(inst),
            })
        }
        OP_STORE => {
            let sop = match f3 {
                FUNCT3_B => StoreOp::Sb,
                FUNCT3_H => StoreOp::Sh,
                FUNCT3_W => StoreOp::Sw,
                FUNCT3_D => StoreOp::Sd,
                _ => {
                    return Err(DecodeError::UnknownFunct3 {
                        opcode: op,
                        funct3: f3,
                        inst,
                    })
                }
            };
            Ok(DecodedInstruction::Store {
                op: sop,
                rs1: s1,
                rs2: s2,
                imm: imm_s(inst),
            })
        }
        OP_MISC_MEM => Ok(DecodedInstruction::Fence),
        OP_IMM => {
            let rop = match f3 {
                FUNCT3_ADD_SUB => RegImmOp::Addi,
                FUNCT3_SLT => RegImmOp::Slti,
                FUNCT3_SLTU => RegImmOp::Sltiu,
                FUNCT3_XOR => RegImmOp::Xori,
                FUNCT3_OR => RegImmOp::Ori,
                FUNCT3_AND => RegImmOp::Andi,
                FUNCT3_SLL => RegImmOp::Slli,
                FUNCT3_SR => match f7 >> 1 {
                    0b000000 => RegImmOp::Srli,
                    0b010000 => RegImmOp::Srai,
                    _ => {
                        return Err(DecodeError::UnknownFunct7 {
                            opcode: op,
                            funct3: f3,
                            funct7: f7,
                            inst,
                        })
                    }
                },
                _ => unreachable!("funct3 is a 3-bit field"),
            };
            let imm = if matches!(rop, RegImmOp::Slli | RegImmOp::Srli | RegImmOp::Srai) {
                shamt6(inst) as i64
            } else {
                imm_i(inst)
            };
            Ok(DecodedInstruction::RegImm {
                op: rop,
                rd: d,
                rs1: s1,
                imm,
            })
        }
        OP_IMM_32 => {
            let rop = match f3 {
                FUNCT3_ADD_SUB => RegImmOp::Addiw,
                FUNCT3_SLL => RegImmOp::Slliw,
                FUNCT3_SR => match f7 {
                    FUNCT7_SRL => RegImmOp::Srliw,
                    FUNCT7_SRA => RegImmOp::Sraiw,
                    _ => {
                        return Err(DecodeError::UnknownFunct7 {
                            opcode: op,
                            funct3: f3,
                            funct7: f7,
                            inst,
                        })
                    }
                },
                _ => {
                    return Err(DecodeError::UnknownFunct3 {
                        opcode: op,
                        funct3: f3,
                        inst,
                    })
                }
            };
            let imm = if matches!(rop, RegImmOp::Slliw | RegImmOp::Srliw | RegImmOp::Sraiw) {
                shamt5(inst) as i64
            } else {
                imm_i(inst)
            };
            Ok(DecodedInstruction::RegImm {
                op: rop,
                rd: d,
                rs1: s1,
                imm,
            })
        }
        OP => {
            let rop = decode_op_reg_reg(f3, f7, op, inst, false)?;
            Ok(DecodedInstruction::RegReg {
                op: rop,
                rd: d,
                rs1: s1,
                rs2: s2,
            })
        }
        OP_32 => {
            let rop = decode_op_reg_reg(f3, f7, op, inst, true)?;
            Ok(DecodedInstruction::RegReg {
                op: rop,
                rd: d,
                rs1: s1,
                rs2: s2,
            })
        }
        OP_SYSTEM => decode_system(inst, f3, d, s1),
        OP_AMO => decode_amo(inst, f3, d, s1, s2),
        _ => Err(DecodeError::UnknownOpcode { opcode: op, inst }),
    }
}

fn decode_op_reg_reg(
    f3: u32,
    f7: u32,
    op: u32,
    inst: u32,
    is_word: bool,
) -> Result<RegRegOp, DecodeError> {
    if f7 == FUNCT7_MULDIV {
        return Ok(if is_word {
            match f3 {
                FUNCT3_MUL => RegRegOp::Mulw,
                FUNCT3_DIV => RegRegOp::Divw,
                FUNCT3_DIVU => RegRegOp::Divuw,
                FUNCT3_REM => RegRegOp::Remw,
                FUNCT3_REMU => RegRegOp::Remuw,
                _ => {
                    return Err(DecodeError::UnknownFunct3 {
                        opcode: op,
                        funct3: f3,
                        inst,
                    })
                }
            }
        } else {
            match f3 {
                FUNCT3_MUL => RegRegOp::Mul,
                FUNCT3_MULH => RegRegOp::Mulh,
                FUNCT3_MULHSU => RegRegOp::Mulhsu,
                FUNCT3_MULHU => RegRegOp::Mulhu,
                FUNCT3_DIV => RegRegOp::Div,
                FUNCT3_DIVU => RegRegOp::Divu,
                FUNCT3_REM => RegRegOp::Rem,
                FUNCT3_REMU => RegRegOp::Remu,
                _ => {
                    return Err(DecodeError::UnknownFunct3 {
                        opcode: op,
                        funct3: f3,
                        inst,
                    })
                }
            }
        });
    }
    if is_word {
        Ok(match (f3, f7) {
            (FUNCT3_ADD_SUB, FUNCT7_ADD) => RegRegOp::Addw,
            (FUNCT3_ADD_SUB, FUNCT7_SUB) => RegRegOp::Subw,
            (FUNCT3_SLL, FUNCT7_ADD) => RegRegOp::Sllw,
            (FUNCT3_SR, FUNCT7_SRL) => RegRegOp::Srlw,
            (FUNCT3_SR, FUNCT7_SRA) => RegRegOp::Sraw,
            _ => {
                return Err(DecodeError::UnknownFunct7 {
                    opcode: op,
                    funct3: f3,
                    funct7: f7,
                    inst,
                })
            }
        })
    } else {
        Ok(match (f3, f7) {
            (FUNCT3_ADD_SUB, FUNCT7_ADD) => RegRegOp::Add,
            (FUNCT3_ADD_SUB, FUNCT7_SUB) => RegRegOp::Sub,
            (FUNCT3_SLL, FUNCT7_ADD) => RegRegOp::Sll,
            (FUNCT3_SLT, FUNCT7_ADD) => RegRegOp::Slt,
            (FUNCT3_SLTU, FUNCT7_ADD) => RegRegOp::Sltu,
            (FUNCT3_XOR, FUNCT7_ADD) => RegRegOp::Xor,
            (FUNCT3_SR, FUNCT7_SRL) => RegRegOp::Srl,
            (FUNCT3_SR, FUNCT7_SRA) => RegRegOp::Sra,
            (FUNCT3_OR, FUNCT7_ADD) => RegRegOp::Or,
            (FUNCT3_AND, FUNCT7_ADD) => RegRegOp::And,
            _ => {
                return Err(DecodeError::UnknownFunct7 {
                    opcode: op,
                    funct3: f3,
                    funct7: f7,
                    inst,
                })
            }
        })
    }
}

fn decode_system(
    inst: u32,
    f3: u32,
    d: u8,
    s1: u8,
) -> Result<DecodedInstruction, DecodeError> {
    if f3 == FUNCT3_PRIV {
        let imm = (inst >> 20) & 0xfff;
        let op = match imm {
            IMM_I_ECALL => SystemOp::Ecall,
            IMM_I_EBREAK => SystemOp::Ebreak,
            _ => {
                return Err(DecodeError::UnknownFunct3 {
                    opcode: OP_SYSTEM,
                    funct3: f3,
                    inst,
                })
            }
        };
        return Ok(DecodedInstruction::System { op });
    }
    let csr_op = match f3 {
        FUNCT3_CSRRW => CsrOp::Csrrw,
        FUNCT3_CSRRS => CsrOp::Csrrs,
        FUNCT3_CSRRC => CsrOp::Csrrc,
        FUNCT3_CSRRWI => CsrOp::Csrrwi,
        FUNCT3_CSRRSI => CsrOp::Csrrsi,
        FUNCT3_CSRRCI => CsrOp::Csrrci,
        _ => {
            return Err(DecodeError::UnknownFunct3 {
                opcode: OP_SYSTEM,
                funct3: f3,
                inst,
            })
        }
    };
    Ok(DecodedInstruction::Csr {
        op: csr_op,
        rd: d,
        rs1_or_uimm: s1,
        csr: csr(inst),
    })
}

fn decode_amo(
    inst: u32,
    f3: u32,
    d: u8,
    s1: u8,
    s2: u8,
) -> Result<DecodedInstruction, DecodeError> {
    let width = match f3 {
        FUNCT3_W => AmoWidth::Word,
        FUNCT3_D => AmoWidth::Doubleword,
        _ => {
            return Err(DecodeError::UnknownFunct3 {
                opcode: OP_AMO,
                funct3: f3,
                inst,
            })
        }
    };
    let op = match funct5(inst) {
        AMO_F5_ADD => AmoOp::Add,
        AMO_F5_XOR => AmoOp::Xor,
        AMO_F5_AND => AmoOp::And,
        AMO_F5_OR => AmoOp::Or,
        AMO_F5_SWAP | AMO_F5_LR | AMO_F5_SC | AMO_F5_MIN | AMO_F5_MAX | AMO_F5_MINU
        | AMO_F5_MAXU => AmoOp::Unspecified,
        _ => {
            return Err(DecodeError::UnknownFunct7 {
                opcode: OP_AMO,
                funct3: f3,
                funct7: funct7(inst),
                inst,
            })
        }
    };
    Ok(DecodedInstruction::Amo {
        width,
        op,
        rd: d,
        rs1: s1,
        rs2: s2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addi_decodes() {
        // addi x1, x0, 7
        let d = decode(0x0070_0093).unwrap();
        assert_eq!(
            d,
            DecodedInstruction::RegImm {
                op: RegImmOp::Addi,
                rd: 1,
                rs1: 0,
                imm: 7,
            }
        );
    }

    #[test]
    fn imm_i_sign_extends() {
        // an I-immediate with the sign bit set: inst[31:20] = 0xfff (-1)
        let inst = 0xfff0_0093;
        assert_eq!(imm_i(inst), -1);
    }

    #[test]
    fn imm_u_uses_correct_mask() {
        // lui x1, 0xfffff -> inst[31:12] all ones
        let inst = 0xffff_f0b7;
        assert_eq!(imm_u(inst), -4096);
    }

    #[test]
    fn imm_b_decodes_positive_offset() {
        // beq x1, x2, +8
        let inst = 0x0020_8463;
        assert_eq!(imm_b(inst), 8);
    }

    #[test]
    fn imm_j_decodes_positive_offset() {
        // jal x1, +16
        let inst = 0x010000ef;
        assert_eq!(imm_j(inst), 16);
    }

    #[test]
    fn shift_immediate_uses_6_bit_shamt() {
        // srai x1, x1, 5 -> funct7 = 0100000, shamt = 5
        let inst = 0x4050_d093;
        let d = decode(inst).unwrap();
        assert_eq!(
            d,
            DecodedInstruction::RegImm {
                op: RegImmOp::Srai,
                rd: 1,
                rs1: 1,
                imm: 5,
            }
        );
    }

    #[test]
    fn unknown_opcode_errors() {
        assert!(decode(0x0000_0001).is_err());
    }

    #[test]
    fn amo_add_word_decodes() {
        // amoadd.w x3, x2, (x1): funct5=00000, funct3=010, opcode=0101111
        let inst = (0b00000 << 27) | (2 << 20) | (1 << 15) | (0b010 << 12) | (3 << 7) | OP_AMO;
        let d = decode(inst).unwrap();
        assert_eq!(
            d,
            DecodedInstruction::Amo {
                width: AmoWidth::Word,
                op: AmoOp::Add,
                rd: 3,
                rs1: 1,
                rs2: 2,
            }
        );
    }
}
