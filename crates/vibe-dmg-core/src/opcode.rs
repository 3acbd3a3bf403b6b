//! Instruction descriptors for the direct and 0xCB-prefixed opcode pages.
//!
//! Both tables are built at compile time. Cycle counts are machine cycles;
//! `additional_cycles` is only charged when a conditional jump, call or
//! return is taken.

/// Marker byte selecting the prefixed table.
pub const PREFIX: u8 = 0xCB;

/// Instruction family. Operands are decoded from the encoding byte at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Nop,

    // Loads into registers
    LoadRegFromHl,
    LoadAFromHlStep,
    LoadAFromHighImm,
    LoadAFromHighC,
    LoadAFromAbs,
    LoadAFromBc,
    LoadAFromDe,
    LoadRegImm,
    LoadPairImm,
    Pop,

    // Stores to memory
    StoreRegToHl,
    StoreAToHlStep,
    StoreAToHighImm,
    StoreAToHighC,
    StoreAToAbs,
    StoreAToBc,
    StoreAToDe,
    StoreImmToHl,
    StoreSpToAbs,
    Push,

    // Register moves
    MoveReg,
    MoveHlToSp,

    // Arithmetic (bit 3 of the encoding selects the carry/borrow variant)
    AddReg,
    AddImm,
    AddHl,
    SubReg,
    SubImm,
    SubHl,
    CompareReg,
    CompareImm,
    CompareHl,
    IncReg,
    IncHl,
    DecReg,
    DecHl,
    IncPair,
    DecPair,
    AddHlPair,
    AddSpSigned,

    // Logic
    AndReg,
    AndImm,
    AndHl,
    OrReg,
    OrImm,
    OrHl,
    XorReg,
    XorImm,
    XorHl,
    Complement,

    // Rotates and shifts (bit 3 of the encoding selects right)
    RotateA,
    RotateAThroughCarry,
    RotateReg,
    RotateRegThroughCarry,
    RotateHl,
    RotateHlThroughCarry,
    SwapReg,
    SwapHl,
    ShiftLeftReg,
    ShiftLeftHl,
    ShiftRightArithReg,
    ShiftRightArithHl,
    ShiftRightLogicReg,
    ShiftRightLogicHl,

    // Single bits
    TestBitReg,
    TestBitHl,
    ChangeBitReg,
    ChangeBitHl,

    DecimalAdjust,
    SetComplementCarry,

    // Control flow
    JumpHl,
    Jump,
    JumpIf,
    JumpRelative,
    JumpRelativeIf,
    Call,
    CallIf,
    Restart,
    Return,
    ReturnIf,
    ReturnFromInterrupt,
    SetIme,
    Halt,
    Stop,

    /// 0xCB in the direct page. Never dispatched.
    Prefix,
    /// Undefined direct opcode; locks up the CPU.
    Illegal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub family: Family,
    pub encoding: u8,
    pub total_bytes: u8,
    pub cycles: u8,
    pub additional_cycles: u8,
}

const fn op(family: Family, encoding: u8, total_bytes: u8, cycles: u8, additional_cycles: u8) -> Opcode {
    Opcode {
        family,
        encoding,
        total_bytes,
        cycles,
        additional_cycles,
    }
}

/// Register operand field value meaning `(HL)`.
const HL_OPERAND: u8 = 6;

const fn direct(e: u8) -> Opcode {
    use Family::*;

    match e {
        0x00 => op(Nop, e, 1, 1, 0),
        0x01 | 0x11 | 0x21 | 0x31 => op(LoadPairImm, e, 3, 3, 0),
        0x02 => op(StoreAToBc, e, 1, 2, 0),
        0x12 => op(StoreAToDe, e, 1, 2, 0),
        0x22 | 0x32 => op(StoreAToHlStep, e, 1, 2, 0),
        0x03 | 0x13 | 0x23 | 0x33 => op(IncPair, e, 1, 2, 0),
        0x0B | 0x1B | 0x2B | 0x3B => op(DecPair, e, 1, 2, 0),
        0x34 => op(IncHl, e, 1, 3, 0),
        0x35 => op(DecHl, e, 1, 3, 0),
        0x36 => op(StoreImmToHl, e, 2, 3, 0),
        _ if e & 0xC7 == 0x04 => op(IncReg, e, 1, 1, 0),
        _ if e & 0xC7 == 0x05 => op(DecReg, e, 1, 1, 0),
        _ if e & 0xC7 == 0x06 => op(LoadRegImm, e, 2, 2, 0),
        0x07 | 0x0F => op(RotateA, e, 1, 1, 0),
        0x17 | 0x1F => op(RotateAThroughCarry, e, 1, 1, 0),
        0x08 => op(StoreSpToAbs, e, 3, 5, 0),
        0x09 | 0x19 | 0x29 | 0x39 => op(AddHlPair, e, 1, 2, 0),
        0x0A => op(LoadAFromBc, e, 1, 2, 0),
        0x1A => op(LoadAFromDe, e, 1, 2, 0),
        0x2A | 0x3A => op(LoadAFromHlStep, e, 1, 2, 0),
        0x10 => op(Stop, e, 2, 1, 0),
        0x18 => op(JumpRelative, e, 2, 3, 0),
        0x20 | 0x28 | 0x30 | 0x38 => op(JumpRelativeIf, e, 2, 2, 1),
        0x27 => op(DecimalAdjust, e, 1, 1, 0),
        0x2F => op(Complement, e, 1, 1, 0),
        0x37 | 0x3F => op(SetComplementCarry, e, 1, 1, 0),

        0x76 => op(Halt, e, 1, 1, 0),
        0x70..=0x77 => op(StoreRegToHl, e, 1, 2, 0),
        _ if e & 0xC7 == 0x46 => op(LoadRegFromHl, e, 1, 2, 0),
        0x40..=0x7F => op(MoveReg, e, 1, 1, 0),

        0x80..=0xBF => {
            let from_hl = e & 0x07 == HL_OPERAND;
            let family = match ((e >> 3) & 0x07, from_hl) {
                (0 | 1, false) => AddReg,
                (0 | 1, true) => AddHl,
                (2 | 3, false) => SubReg,
                (2 | 3, true) => SubHl,
                (4, false) => AndReg,
                (4, true) => AndHl,
                (5, false) => XorReg,
                (5, true) => XorHl,
                (6, false) => OrReg,
                (6, true) => OrHl,
                (_, false) => CompareReg,
                (_, true) => CompareHl,
            };
            if from_hl {
                op(family, e, 1, 2, 0)
            } else {
                op(family, e, 1, 1, 0)
            }
        }
        _ if e & 0xC7 == 0xC6 => {
            let family = match (e >> 3) & 0x07 {
                0 | 1 => AddImm,
                2 | 3 => SubImm,
                4 => AndImm,
                5 => XorImm,
                6 => OrImm,
                _ => CompareImm,
            };
            op(family, e, 2, 2, 0)
        }

        0xC0 | 0xC8 | 0xD0 | 0xD8 => op(ReturnIf, e, 1, 2, 3),
        0xC1 | 0xD1 | 0xE1 | 0xF1 => op(Pop, e, 1, 3, 0),
        0xC2 | 0xCA | 0xD2 | 0xDA => op(JumpIf, e, 3, 3, 1),
        0xC3 => op(Jump, e, 3, 4, 0),
        0xC4 | 0xCC | 0xD4 | 0xDC => op(CallIf, e, 3, 3, 3),
        0xC5 | 0xD5 | 0xE5 | 0xF5 => op(Push, e, 1, 4, 0),
        _ if e & 0xC7 == 0xC7 => op(Restart, e, 1, 4, 0),
        0xC9 => op(Return, e, 1, 4, 0),
        0xD9 => op(ReturnFromInterrupt, e, 1, 4, 0),
        0xCB => op(Prefix, e, 1, 0, 0),
        0xCD => op(Call, e, 3, 6, 0),
        0xE0 => op(StoreAToHighImm, e, 2, 3, 0),
        0xF0 => op(LoadAFromHighImm, e, 2, 3, 0),
        0xE2 => op(StoreAToHighC, e, 1, 2, 0),
        0xF2 => op(LoadAFromHighC, e, 1, 2, 0),
        0xE8 => op(AddSpSigned, e, 2, 4, 0),
        0xF8 => op(AddSpSigned, e, 2, 3, 0),
        0xE9 => op(JumpHl, e, 1, 1, 0),
        0xEA => op(StoreAToAbs, e, 3, 4, 0),
        0xFA => op(LoadAFromAbs, e, 3, 4, 0),
        0xF3 | 0xFB => op(SetIme, e, 1, 1, 0),
        0xF9 => op(MoveHlToSp, e, 1, 2, 0),
        _ => op(Illegal, e, 1, 1, 0),
    }
}

const fn prefixed(e: u8) -> Opcode {
    use Family::*;

    let on_hl = e & 0x07 == HL_OPERAND;
    let (family, reg_cycles, hl_cycles) = match e >> 6 {
        0 => {
            let family = match ((e >> 3) & 0x07, on_hl) {
                (0 | 1, false) => RotateReg,
                (0 | 1, true) => RotateHl,
                (2 | 3, false) => RotateRegThroughCarry,
                (2 | 3, true) => RotateHlThroughCarry,
                (4, false) => ShiftLeftReg,
                (4, true) => ShiftLeftHl,
                (5, false) => ShiftRightArithReg,
                (5, true) => ShiftRightArithHl,
                (6, false) => SwapReg,
                (6, true) => SwapHl,
                (_, false) => ShiftRightLogicReg,
                (_, true) => ShiftRightLogicHl,
            };
            (family, 2, 4)
        }
        1 => (if on_hl { TestBitHl } else { TestBitReg }, 2, 3),
        _ => (if on_hl { ChangeBitHl } else { ChangeBitReg }, 2, 4),
    };
    op(family, e, 2, if on_hl { hl_cycles } else { reg_cycles }, 0)
}

const fn build(prefixed_page: bool) -> [Opcode; 256] {
    let mut table = [op(Family::Nop, 0, 1, 1, 0); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = if prefixed_page {
            prefixed(i as u8)
        } else {
            direct(i as u8)
        };
        i += 1;
    }
    table
}

pub static DIRECT: [Opcode; 256] = build(false);
pub static PREFIXED: [Opcode; 256] = build(true);
