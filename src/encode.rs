//! Test-only instruction encoders.
//!
//! These mirror the field layouts in [`crate::instr`] from the other
//! direction: given a mnemonic's operands, assemble the 32-bit word a
//! real assembler would produce. Nothing in the interpreter itself
//! calls into this module; it exists so tests can write
//! `addi!(x1, x0, -1)` instead of hand-assembling instruction words.

use crate::opcodes::*;

pub fn itype(imm: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (imm << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

pub fn utype(imm: u32, rd: u32, opcode: u32) -> u32 {
    (imm & 0xffff_f000) | (rd << 7) | opcode
}

/// R-type and S-type share a layout; `a` is funct7 for R-type or
/// imm[11:5] for S-type, `b` is rd for R-type or imm[4:0] for S-type.
pub fn rstype(a: u32, rs2: u32, rs1: u32, funct3: u32, b: u32, opcode: u32) -> u32 {
    (a << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (b << 7) | opcode
}

pub fn btype(imm: i32, rs2: u32, rs1: u32, funct3: u32, opcode: u32) -> u32 {
    let imm = imm as u32;
    let imm12 = (imm >> 12) & 1;
    let imm11 = (imm >> 11) & 1;
    let imm10_5 = (imm >> 5) & 0x3f;
    let imm4_1 = (imm >> 1) & 0xf;
    (imm12 << 31)
        | (imm10_5 << 25)
        | (rs2 << 20)
        | (rs1 << 15)
        | (funct3 << 12)
        | (imm4_1 << 8)
        | (imm11 << 7)
        | opcode
}

pub fn jtype(imm: i32, rd: u32, opcode: u32) -> u32 {
    let imm = imm as u32;
    let imm20 = (imm >> 20) & 1;
    let imm19_12 = (imm >> 12) & 0xff;
    let imm11 = (imm >> 11) & 1;
    let imm10_1 = (imm >> 1) & 0x3ff;
    (imm20 << 31) | (imm19_12 << 12) | (imm11 << 20) | (imm10_1 << 21) | (rd << 7) | opcode
}

/// Parse a register token like `x17` into its numeric index.
pub fn reg_num_impl(reg_name: &str) -> u32 {
    reg_name
        .strip_prefix('x')
        .unwrap_or_else(|| panic!("register name {reg_name} must start with x"))
        .parse()
        .unwrap_or_else(|_| panic!("register name {reg_name} has a non-numeric index"))
}

macro_rules! reg_num {
    ($reg:ident) => {
        $crate::encode::reg_num_impl(std::stringify!($reg))
    };
}
pub(crate) use reg_num;

macro_rules! lui {
    ($rd:ident, $imm:expr) => {
        $crate::encode::utype(($imm as u32) << 12, $crate::encode::reg_num!($rd), OP_LUI)
    };
}
pub(crate) use lui;

macro_rules! auipc {
    ($rd:ident, $imm:expr) => {
        $crate::encode::utype(($imm as u32) << 12, $crate::encode::reg_num!($rd), OP_AUIPC)
    };
}
pub(crate) use auipc;

macro_rules! jal {
    ($rd:ident, $imm:expr) => {
        $crate::encode::jtype($imm, $crate::encode::reg_num!($rd), OP_JAL)
    };
}
pub(crate) use jal;

macro_rules! jalr {
    ($rd:ident, $rs1:ident, $imm:expr) => {
        $crate::encode::itype(
            ($imm as i32) as u32,
            $crate::encode::reg_num!($rs1),
            0,
            $crate::encode::reg_num!($rd),
            OP_JALR,
        )
    };
}
pub(crate) use jalr;

macro_rules! branch_instr {
    ($name:ident, $funct3:expr) => {
        macro_rules! $name {
            ($rs1:ident, $rs2:ident, $imm:expr) => {
                $crate::encode::btype(
                    $imm,
                    $crate::encode::reg_num!($rs2),
                    $crate::encode::reg_num!($rs1),
                    $funct3,
                    OP_BRANCH,
                )
            };
        }
        pub(crate) use $name;
    };
}
branch_instr!(beq, FUNCT3_BEQ);
branch_instr!(bne, FUNCT3_BNE);
branch_instr!(blt, FUNCT3_BLT);
branch_instr!(bge, FUNCT3_BGE);
branch_instr!(bltu, FUNCT3_BLTU);
branch_instr!(bgeu, FUNCT3_BGEU);

macro_rules! load_instr {
    ($name:ident, $funct3:expr) => {
        macro_rules! $name {
            ($rd:ident, $rs1:ident, $imm:expr) => {
                $crate::encode::itype(
                    ($imm as i32) as u32,
                    $crate::encode::reg_num!($rs1),
                    $funct3,
                    $crate::encode::reg_num!($rd),
                    OP_LOAD,
                )
            };
        }
        pub(crate) use $name;
    };
}
load_instr!(lb, FUNCT3_B);
load_instr!(lh, FUNCT3_H);
load_instr!(lw, FUNCT3_W);
load_instr!(lbu, FUNCT3_BU);
load_instr!(lhu, FUNCT3_HU);

macro_rules! store_instr {
    ($name:ident, $funct3:expr) => {
        macro_rules! $name {
            // stype!(rs2, rs1, imm): store value in rs2 to imm(rs1)
            ($rs2:ident, $rs1:ident, $imm:expr) => {{
                let imm = ($imm as i32) as u32;
                $crate::encode::rstype(
                    (imm >> 5) & 0x7f,
                    $crate::encode::reg_num!($rs2),
                    $crate::encode::reg_num!($rs1),
                    $funct3,
                    imm & 0x1f,
                    OP_STORE,
                )
            }};
        }
        pub(crate) use $name;
    };
}
store_instr!(sb, FUNCT3_B);
store_instr!(sh, FUNCT3_H);
store_instr!(sw, FUNCT3_W);

macro_rules! reg_imm_instr {
    ($name:ident, $funct3:expr) => {
        macro_rules! $name {
            ($rd:ident, $rs1:ident, $imm:expr) => {
                $crate::encode::itype(
                    ($imm as i32) as u32,
                    $crate::encode::reg_num!($rs1),
                    $funct3,
                    $crate::encode::reg_num!($rd),
                    OP_IMM,
                )
            };
        }
        pub(crate) use $name;
    };
}
reg_imm_instr!(addi, FUNCT3_ADDI);
reg_imm_instr!(slti, FUNCT3_SLTI);
reg_imm_instr!(sltiu, FUNCT3_SLTIU);
reg_imm_instr!(xori, FUNCT3_XORI);
reg_imm_instr!(ori, FUNCT3_ORI);
reg_imm_instr!(andi, FUNCT3_ANDI);

macro_rules! shift_imm_instr {
    ($name:ident, $upper:expr, $funct3:expr) => {
        macro_rules! $name {
            ($rd:ident, $rs1:ident, $shamt:expr) => {
                $crate::encode::rstype(
                    $upper,
                    $shamt as u32,
                    $crate::encode::reg_num!($rs1),
                    $funct3,
                    $crate::encode::reg_num!($rd),
                    OP_IMM,
                )
            };
        }
        pub(crate) use $name;
    };
}
shift_imm_instr!(slli, FUNCT7_ZERO, FUNCT3_SLLI);
shift_imm_instr!(srli, FUNCT7_ZERO, FUNCT3_SRLI_SRAI);
shift_imm_instr!(srai, FUNCT7_SUB_SRA, FUNCT3_SRLI_SRAI);

macro_rules! reg_reg_instr {
    ($name:ident, $upper:expr, $funct3:expr) => {
        macro_rules! $name {
            ($rd:ident, $rs1:ident, $rs2:ident) => {
                $crate::encode::rstype(
                    $upper,
                    $crate::encode::reg_num!($rs2),
                    $crate::encode::reg_num!($rs1),
                    $funct3,
                    $crate::encode::reg_num!($rd),
                    OP_REG,
                )
            };
        }
        pub(crate) use $name;
    };
}
reg_reg_instr!(add, FUNCT7_ZERO, FUNCT3_ADD_SUB);
reg_reg_instr!(sub, FUNCT7_SUB_SRA, FUNCT3_ADD_SUB);
reg_reg_instr!(sll, FUNCT7_ZERO, FUNCT3_SLL);
reg_reg_instr!(slt, FUNCT7_ZERO, FUNCT3_SLT);
reg_reg_instr!(sltu, FUNCT7_ZERO, FUNCT3_SLTU);
reg_reg_instr!(xor, FUNCT7_ZERO, FUNCT3_XOR);
reg_reg_instr!(srl, FUNCT7_ZERO, FUNCT3_SRL_SRA);
reg_reg_instr!(sra, FUNCT7_SUB_SRA, FUNCT3_SRL_SRA);
reg_reg_instr!(or, FUNCT7_ZERO, FUNCT3_OR);
reg_reg_instr!(and, FUNCT7_ZERO, FUNCT3_AND);
