//! Execute handlers: one per decoded [`Op`], implementing the RV32I
//! semantics of chapter 2 of the unprivileged specification.
//!
//! Every handler implicitly advances the PC by 4 unless it explicitly
//! assigns a new PC (jumps and taken branches). Every destination
//! register write goes through [`Machine::regs_write`], so writes to
//! `x0` are silently dropped. All arithmetic wraps modulo 2^XLEN; the
//! final value written to `rd` is passed through [`sext_xlen`] so it
//! stays correctly signed if later widened (relevant once RV64I is
//! layered on top).

use crate::bits::{mask, sext_xlen, signed, trim_32};
use crate::decode::{Branch, Load, Op, RegImm, RegReg, Store};
use crate::instr::InstrWord;
use crate::machine::{ExecutionError, Machine};
use crate::memory::{MemoryPort, Wordsize};

fn illegal(msg: impl Into<String>) -> ExecutionError {
    ExecutionError::IllegalInstruction(msg.into())
}

pub fn execute<M: MemoryPort>(
    m: &mut Machine<M>,
    op: Op,
    w: InstrWord,
) -> Result<(), ExecutionError> {
    match op {
        Op::Lui => exec_lui(m, w),
        Op::Auipc => exec_auipc(m, w),
        Op::Jal => exec_jal(m, w),
        Op::Jalr => exec_jalr(m, w),
        Op::Branch(b) => exec_branch(m, b, w),
        Op::Load(l) => exec_load(m, l, w),
        Op::Store(s) => exec_store(m, s, w),
        Op::RegImm(r) => exec_reg_imm(m, r, w),
        Op::RegReg(r) => exec_reg_reg(m, r, w),
        Op::Fence | Op::FenceI => {
            // No architectural effect on a single-hart in-order
            // simulator with no instruction cache to flush.
            m.advance();
            Ok(())
        }
    }
}

/// `lui rd, u_imm`: rd := u_imm (already has the low 12 bits zero).
fn exec_lui<M: MemoryPort>(m: &mut Machine<M>, w: InstrWord) -> Result<(), ExecutionError> {
    m.regs_write(w.rd(), u64::from(w.u_imm()))?;
    m.advance();
    Ok(())
}

/// `auipc rd, u_imm`: rd := sext_xlen(u_imm + pc).
fn exec_auipc<M: MemoryPort>(m: &mut Machine<M>, w: InstrWord) -> Result<(), ExecutionError> {
    let value = w.u_imm().wrapping_add(m.pc);
    let value = sext_xlen(value, m.xlen().bits());
    m.regs_write(w.rd(), u64::from(value))?;
    m.advance();
    Ok(())
}

/// `jal rd, uj_imm`: tmp := sext_xlen(pc+4); pc := pc + uj_imm; rd := tmp.
fn exec_jal<M: MemoryPort>(m: &mut Machine<M>, w: InstrWord) -> Result<(), ExecutionError> {
    let link = sext_xlen(m.pc.wrapping_add(4), m.xlen().bits());
    m.jump_relative_to_pc(w.uj_imm())?;
    m.regs_write(w.rd(), u64::from(link))?;
    Ok(())
}

/// `jalr rd, rs1, i_imm`: tmp := sext_xlen(pc+4);
/// pc := (rs1 + i_imm) & ~1; rd := tmp.
///
/// The low bit of the target is cleared; the low bit of the link
/// value written to `rd` is *not* cleared.
fn exec_jalr<M: MemoryPort>(m: &mut Machine<M>, w: InstrWord) -> Result<(), ExecutionError> {
    let link = sext_xlen(m.pc.wrapping_add(4), m.xlen().bits());
    let base = m.regs_read(w.rs1())? as u32;
    let target = (base as i64).wrapping_add(w.i_imm()) as u32 & !1;
    m.jump_absolute(target)?;
    m.regs_write(w.rd(), u64::from(link))?;
    Ok(())
}

fn exec_branch<M: MemoryPort>(
    m: &mut Machine<M>,
    mnemonic: Branch,
    w: InstrWord,
) -> Result<(), ExecutionError> {
    let src1 = m.regs_read(w.rs1())? as u32;
    let src2 = m.regs_read(w.rs2())? as u32;
    let xlen = m.xlen().bits();
    let taken = match mnemonic {
        Branch::Beq => src1 == src2,
        Branch::Bne => src1 != src2,
        Branch::Blt => signed(src1, xlen) < signed(src2, xlen),
        Branch::Bge => signed(src1, xlen) >= signed(src2, xlen),
        Branch::Bltu => src1 < src2,
        Branch::Bgeu => src1 >= src2,
    };
    if taken {
        m.jump_relative_to_pc(w.sb_imm())?;
    } else {
        m.advance();
    }
    Ok(())
}

fn exec_load<M: MemoryPort>(
    m: &mut Machine<M>,
    mnemonic: Load,
    w: InstrWord,
) -> Result<(), ExecutionError> {
    let base = m.regs_read(w.rs1())? as u32;
    let addr = (base as i64).wrapping_add(w.i_imm()) as u32;
    let (size, sign_extend_bits) = match mnemonic {
        Load::Lb => (Wordsize::Byte, Some(8)),
        Load::Lh => (Wordsize::Halfword, Some(16)),
        Load::Lw => (Wordsize::Word, Some(32)),
        Load::Lbu => (Wordsize::Byte, None),
        Load::Lhu => (Wordsize::Halfword, None),
    };
    let raw = m.mem.read(u64::from(addr), size)? as u32;
    let value = match sign_extend_bits {
        Some(bits) => sext_xlen(raw, bits),
        None => raw,
    };
    m.regs_write(w.rd(), u64::from(value))?;
    m.advance();
    Ok(())
}

fn exec_store<M: MemoryPort>(
    m: &mut Machine<M>,
    mnemonic: Store,
    w: InstrWord,
) -> Result<(), ExecutionError> {
    let base = m.regs_read(w.rs1())? as u32;
    let addr = (base as i64).wrapping_add(w.s_imm()) as u32;
    let value = m.regs_read(w.rs2())? as u32;
    let size = match mnemonic {
        Store::Sb => Wordsize::Byte,
        Store::Sh => Wordsize::Halfword,
        Store::Sw => Wordsize::Word,
    };
    m.mem.write(u64::from(addr), size, u64::from(trim_32(value)))?;
    m.advance();
    Ok(())
}

fn exec_reg_imm<M: MemoryPort>(
    m: &mut Machine<M>,
    mnemonic: RegImm,
    w: InstrWord,
) -> Result<(), ExecutionError> {
    let src = m.regs_read(w.rs1())? as u32;
    let i_imm = w.i_imm();
    let xlen = m.xlen().bits();
    let value = match mnemonic {
        RegImm::Addi => sext_xlen((src as i64).wrapping_add(i_imm) as u32, xlen),
        RegImm::Slti => (signed(src, xlen) < i_imm) as u32,
        RegImm::Sltiu => (u64::from(src) < (i_imm as u64 & u64::from(mask(xlen)))) as u32,
        RegImm::Xori => src ^ (i_imm as u32),
        RegImm::Ori => src | (i_imm as u32),
        RegImm::Andi => src & (i_imm as u32),
        RegImm::Slli => {
            let shamt = w.shamt_rv32();
            check_shamt_rv32(shamt)?;
            sext_xlen(src << shamt, xlen)
        }
        RegImm::Srli => {
            let shamt = w.shamt_rv32();
            check_shamt_rv32(shamt)?;
            sext_xlen(src >> shamt, xlen)
        }
        RegImm::Srai => {
            let shamt = w.shamt_rv32();
            check_shamt_rv32(shamt)?;
            let result = (signed(src, xlen) >> shamt) as u32;
            sext_xlen(result, xlen)
        }
    };
    m.regs_write(w.rd(), u64::from(value))?;
    m.advance();
    Ok(())
}

fn exec_reg_reg<M: MemoryPort>(
    m: &mut Machine<M>,
    mnemonic: RegReg,
    w: InstrWord,
) -> Result<(), ExecutionError> {
    let src1 = m.regs_read(w.rs1())? as u32;
    let src2 = m.regs_read(w.rs2())? as u32;
    let xlen = m.xlen().bits();
    let shamt = src2 & (xlen - 1);
    let value = match mnemonic {
        RegReg::Add => sext_xlen(src1.wrapping_add(src2), xlen),
        RegReg::Sub => sext_xlen(src1.wrapping_sub(src2), xlen),
        RegReg::Slt => (signed(src1, xlen) < signed(src2, xlen)) as u32,
        RegReg::Sltu => (src1 < src2) as u32,
        RegReg::Xor => src1 ^ src2,
        RegReg::Or => src1 | src2,
        RegReg::And => src1 & src2,
        RegReg::Sll => sext_xlen(src1 << shamt, xlen),
        RegReg::Srl => sext_xlen(src1 >> shamt, xlen),
        RegReg::Sra => sext_xlen((signed(src1, xlen) >> shamt) as u32, xlen),
    };
    m.regs_write(w.rd(), u64::from(value))?;
    m.advance();
    Ok(())
}

/// RV32 shifts use a 5-bit shamt; if the bit that would select a
/// 6-bit (RV64) shift amount is set, the instruction is illegal.
fn check_shamt_rv32(shamt: u8) -> Result<(), ExecutionError> {
    if shamt & 0x20 != 0 {
        Err(illegal(format!(
            "shamt {shamt:#x} has bit 5 set, which is reserved in RV32I"
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::*;
    use crate::machine::Machine;
    use crate::memory::SparseMemory;
    use crate::registers::Xlen;

    fn machine() -> Machine<SparseMemory> {
        Machine::new(SparseMemory::new(), 0, Xlen::Xlen32)
    }

    fn exec_word(m: &mut Machine<SparseMemory>, word: u32) {
        m.mem.write(u64::from(m.pc), Wordsize::Word, word as u64).unwrap();
        m.step().unwrap();
    }

    #[test]
    fn auipc_with_zero_immediate_yields_pc() {
        let mut m = machine();
        m.pc_set(0x2000);
        exec_word(&mut m, auipc!(x5, 0));
        assert_eq!(m.regs_read(5).unwrap(), 0x2000);
    }

    #[test]
    fn addi_with_zero_is_a_copy() {
        let mut m = machine();
        m.regs_write(1, 0x1234).unwrap();
        exec_word(&mut m, addi!(x2, x1, 0));
        assert_eq!(m.regs_read(2).unwrap(), 0x1234);
    }

    #[test]
    fn slti_signed_comparison() {
        let mut m = machine();
        m.regs_write(1, 0xFFFF_FFFF).unwrap(); // -1
        exec_word(&mut m, slti!(x2, x1, 0));
        assert_eq!(m.regs_read(2).unwrap(), 1); // -1 < 0
    }

    #[test]
    fn sltiu_unsigned_comparison() {
        let mut m = machine();
        m.regs_write(1, 0xFFFF_FFFF).unwrap();
        exec_word(&mut m, sltiu!(x2, x1, -1));
        // rs1 (0xFFFFFFFF) is not < sign-extended imm (0xFFFFFFFF)
        assert_eq!(m.regs_read(2).unwrap(), 0);
    }

    #[test]
    fn srai_arithmetic_shift_preserves_sign() {
        let mut m = machine();
        m.regs_write(1, 0xFFFF_FFF0).unwrap(); // -16
        exec_word(&mut m, srai!(x2, x1, 2));
        assert_eq!(m.regs_read(2).unwrap() as i32, -4);
    }

    #[test]
    fn srli_logical_shift_does_not_preserve_sign() {
        let mut m = machine();
        m.regs_write(1, 0xFFFF_FFF0).unwrap();
        exec_word(&mut m, srli!(x2, x1, 4));
        assert_eq!(m.regs_read(2).unwrap(), 0x0FFF_FFFF);
    }

    #[test]
    fn sll_shifts_by_low_bits_of_rs2() {
        let mut m = machine();
        m.regs_write(1, 1).unwrap();
        m.regs_write(2, 4).unwrap();
        exec_word(&mut m, sll!(x3, x1, x2));
        assert_eq!(m.regs_read(3).unwrap(), 16);
    }

    #[test]
    fn sub_wraps_on_underflow() {
        let mut m = machine();
        m.regs_write(1, 0).unwrap();
        m.regs_write(2, 1).unwrap();
        exec_word(&mut m, sub!(x3, x1, x2));
        assert_eq!(m.regs_read(3).unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn jalr_clears_low_bit_of_target_but_not_of_link() {
        let mut m = machine();
        m.pc_set(12);
        m.regs_write(6, 21).unwrap(); // odd base
        exec_word(&mut m, jalr!(x4, x6, 0));
        assert_eq!(m.regs_read(4).unwrap(), 16); // link value, low bit untouched
        assert_eq!(m.pc_get(), 20); // target low bit cleared
    }

    #[test]
    fn bltu_unsigned_branch() {
        let mut m = machine();
        m.regs_write(1, 1).unwrap();
        m.regs_write(2, 0xFFFF_FFFF).unwrap(); // huge unsigned, negative signed
        exec_word(&mut m, bltu!(x1, x2, 8));
        assert_eq!(m.pc_get(), 8);
    }

    #[test]
    fn blt_signed_branch_not_taken_for_same_pair() {
        let mut m = machine();
        m.regs_write(1, 1).unwrap();
        m.regs_write(2, 0xFFFF_FFFF).unwrap(); // -1 signed
        exec_word(&mut m, blt!(x1, x2, 8));
        // 1 < -1 is false
        assert_eq!(m.pc_get(), 4);
    }
}
