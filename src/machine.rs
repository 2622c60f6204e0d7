//! Processor state (PC, register file, memory) and the fetch-decode-
//! execute step/run loop.
//!
//! This is the simplest possible RISC-V hart: a single privilege
//! level, RV32I only, no interrupts. Each call to [`Machine::step`]
//! executes the instruction at the current PC. If a trap occurs,
//! `step` returns it and no architectural state from the failing
//! instruction is committed; the caller may inspect the trap and
//! decide whether to continue.

use thiserror::Error;

use crate::decode::{self, DecodeError, Op};
use crate::exec;
use crate::instr::InstrWord;
use crate::memory::{MemoryError, MemoryPort, Wordsize};
use crate::registers::{RegisterError, Registers, Xlen};

/// A condition that prevents commit of the current instruction and is
/// surfaced to the caller.
#[derive(Error, Debug)]
pub enum Trap {
    #[error("instruction decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("instruction execution failed: {0}")]
    Execution(#[from] ExecutionError),
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("illegal instruction: {0}")]
    IllegalInstruction(String),
    #[error("instruction address {0:#x} is not aligned to a 4-byte boundary")]
    InstructionAddressMisaligned(u32),
    #[error("register access error: {0}")]
    Register(#[from] RegisterError),
    #[error("memory access error: {0}")]
    Memory(#[from] MemoryError),
}

fn check_aligned(addr: u32) -> Result<(), ExecutionError> {
    if addr % 4 != 0 {
        Err(ExecutionError::InstructionAddressMisaligned(addr))
    } else {
        Ok(())
    }
}

/// PC, register file, memory handle, architectural width, and the
/// running/halted flag and retired-instruction counter.
pub struct Machine<M: MemoryPort> {
    pub pc: u32,
    pub rf: Registers,
    pub mem: M,
    xlen: Xlen,
    pub running: bool,
    pub instret: u64,
}

impl<M: MemoryPort> Machine<M> {
    /// Construct a machine with PC at `entry_pc`, all registers zero,
    /// and `running = true`.
    pub fn new(mem: M, entry_pc: u32, xlen: Xlen) -> Self {
        Self {
            pc: entry_pc,
            rf: Registers::new(xlen),
            mem,
            xlen,
            running: true,
            instret: 0,
        }
    }

    pub fn xlen(&self) -> Xlen {
        self.xlen
    }

    pub fn pc_get(&self) -> u32 {
        self.pc
    }

    pub fn pc_set(&mut self, value: u32) {
        self.pc = value;
    }

    pub fn regs_read(&self, idx: u8) -> Result<u64, RegisterError> {
        self.rf.read(idx)
    }

    pub fn regs_write(&mut self, idx: u8, value: u64) -> Result<(), RegisterError> {
        self.rf.write(idx, value)
    }

    /// Cooperative stop request; a step already in progress always
    /// completes or faults first.
    pub fn halt(&mut self) {
        self.running = false;
    }

    fn fetch(&self) -> Result<InstrWord, ExecutionError> {
        let word = self.mem.read(u64::from(self.pc), Wordsize::Word)?;
        Ok(InstrWord::new(word as u32))
    }

    fn jump_to(&mut self, target: u32) -> Result<(), ExecutionError> {
        check_aligned(target)?;
        self.pc = target;
        Ok(())
    }

    fn increment_pc(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Fetch, decode, dispatch and commit one instruction. On
    /// success, `instret` is incremented and the PC has advanced (by
    /// 4 or to a jump/branch target). On failure, neither happens.
    pub fn step(&mut self) -> Result<(), Trap> {
        match self.step_inner() {
            Ok(()) => Ok(()),
            Err(trap) => {
                log::warn!(
                    "trap at pc={:#x} instret={}: {trap}",
                    self.pc,
                    self.instret
                );
                Err(trap)
            }
        }
    }

    fn step_inner(&mut self) -> Result<(), Trap> {
        let word = self.fetch().map_err(Trap::Execution)?;
        let op = decode::decode(word)?;
        exec::execute(self, op, word)?;
        self.instret += 1;
        log::trace!("retired instret={} pc={:#x}", self.instret, self.pc);
        Ok(())
    }

    /// Step until `running` becomes false or a trap aborts execution.
    pub fn run(&mut self) -> Result<(), Trap> {
        while self.running {
            self.step()?;
        }
        Ok(())
    }
}

impl<M: MemoryPort> Machine<M> {
    pub(crate) fn jump_relative_to_pc(&mut self, offset: i64) -> Result<(), ExecutionError> {
        let target = (self.pc as i64).wrapping_add(offset) as u32;
        self.jump_to(target)
    }

    pub(crate) fn jump_absolute(&mut self, target: u32) -> Result<(), ExecutionError> {
        self.jump_to(target)
    }

    pub(crate) fn advance(&mut self) {
        self.increment_pc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::*;
    use crate::memory::SparseMemory;

    fn machine() -> Machine<SparseMemory> {
        Machine::new(SparseMemory::new(), 0x1000, Xlen::Xlen32)
    }

    fn write_instr(m: &mut Machine<SparseMemory>, addr: u32, word: u32) {
        m.mem.write(u64::from(addr), Wordsize::Word, word as u64).unwrap();
    }

    #[test]
    fn lui_sets_upper_bits_and_advances_pc() {
        let mut m = machine();
        write_instr(&mut m, 0x1000, lui!(x1, 0xABCDE));
        m.step().unwrap();
        assert_eq!(m.regs_read(1).unwrap(), 0xABCDE000);
        assert_eq!(m.pc_get(), 0x1004);
    }

    #[test]
    fn addi_negative_one() {
        let mut m = machine();
        write_instr(&mut m, 0x1000, addi!(x2, x0, -1));
        m.step().unwrap();
        assert_eq!(m.regs_read(2).unwrap(), 0xFFFF_FFFF);
        assert_eq!(m.pc_get(), 0x1004);
    }

    #[test]
    fn add_sequence() {
        let mut m = machine();
        write_instr(&mut m, 0x1000, addi!(x1, x0, 5));
        write_instr(&mut m, 0x1004, addi!(x2, x0, -3));
        write_instr(&mut m, 0x1008, add!(x3, x1, x2));
        m.step().unwrap();
        m.step().unwrap();
        m.step().unwrap();
        assert_eq!(m.regs_read(3).unwrap(), 2);
    }

    #[test]
    fn beq_taken() {
        let mut m = machine();
        write_instr(&mut m, 0x1000, beq!(x0, x0, 8));
        m.step().unwrap();
        assert_eq!(m.pc_get(), 0x1008);
    }

    #[test]
    fn jal_and_link() {
        let mut m = machine();
        m.pc_set(0x1004);
        write_instr(&mut m, 0x1004, jal!(x1, -4));
        m.step().unwrap();
        assert_eq!(m.pc_get(), 0x1000);
        assert_eq!(m.regs_read(1).unwrap(), 0x1008);
    }

    #[test]
    fn store_then_load_roundtrip() {
        let mut m = machine();
        // Building 0xDEADBEEF out of instructions is awkward given
        // addi's 12-bit immediate, so seed the register directly.
        m.regs_write(1, 0xDEADBEEF).unwrap();
        m.pc_set(0x2000);
        write_instr(&mut m, 0x2000, sw!(x1, x0, 0));
        write_instr(&mut m, 0x2004, lw!(x2, x0, 0));
        write_instr(&mut m, 0x2008, lb!(x3, x0, 0));
        m.step().unwrap();
        m.step().unwrap();
        m.step().unwrap();
        assert_eq!(m.regs_read(2).unwrap(), 0xDEADBEEF);
        assert_eq!(m.regs_read(3).unwrap(), 0xFFFF_FFEF);
    }

    #[test]
    fn x0_writes_are_always_discarded() {
        let mut m = machine();
        write_instr(&mut m, 0x1000, addi!(x0, x0, 5));
        m.step().unwrap();
        assert_eq!(m.regs_read(0).unwrap(), 0);
    }

    #[test]
    fn illegal_instruction_does_not_advance_pc() {
        let mut m = machine();
        // opcode 0x7f is not a valid RV32I major opcode
        write_instr(&mut m, 0x1000, 0x7f);
        let result = m.step();
        assert!(result.is_err());
        assert_eq!(m.pc_get(), 0x1000);
        assert_eq!(m.instret, 0);
    }

    #[test]
    fn srai_with_shamt_bit5_set_is_illegal() {
        let mut m = machine();
        // shamt field bit 5 (bit 25 of the word) set is reserved in RV32
        let word = (0b0100000u32 << 25) | (1 << 20) | (1 << 15) | (0b101 << 12) | (2 << 7) | 0b0010011;
        write_instr(&mut m, 0x1000, word);
        let result = m.step();
        assert!(matches!(
            result,
            Err(Trap::Execution(ExecutionError::IllegalInstruction(_)))
        ));
    }

    #[test]
    fn run_stops_on_halt() {
        let mut m = machine();
        // jal x0, 0 is an infinite loop (next PC == current PC);
        // halting between steps is the only way out.
        write_instr(&mut m, 0x1000, jal!(x0, 0));
        m.step().unwrap();
        assert_eq!(m.pc_get(), 0x1000);
        assert_eq!(m.instret, 1);
        m.halt();
        assert!(!m.running);
        m.run().unwrap();
        assert_eq!(m.instret, 1);
    }
}
