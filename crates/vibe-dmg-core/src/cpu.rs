use std::cell::Cell;
use std::rc::Rc;

use crate::address_map::{HIGH_RAM, HIGH_RAM_SIZE, INTERRUPTS, REG_IE, REG_IF, RESETS};
use crate::alu::{self, Flag, RotDir, ValueFlags};
use crate::bus::{Bus, Component};
use crate::memory::Ram;
use crate::opcode::{self, Family, Opcode};
use crate::register_file::{Bit, Register, RegisterFile};

// Extra cost of entering an interrupt handler
const INTERRUPT_CYCLES: u64 = 5;

// Base of the LDH page
const HIGH_PAGE: u16 = 0xFF00;

// Only the five defined interrupts can be pending
const INTERRUPT_MASK: u8 = 0x1F;

/// Interrupt sources in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Bit for Interrupt {
    fn index(self) -> u8 {
        self as u8
    }
}

/// Handle on the IF register.
///
/// The CPU owns the register; the timer, LCD controller and joypad hold clones
/// so a request raised earlier in a tick is seen by the CPU in the same tick.
#[derive(Clone, Default)]
pub struct InterruptLine(Rc<Cell<u8>>);

impl InterruptLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, interrupt: Interrupt) {
        self.0.set(self.0.get() | interrupt.mask());
    }

    pub fn get(&self) -> u8 {
        self.0.get()
    }

    pub fn set(&self, value: u8) {
        self.0.set(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
}

impl Register for Reg {
    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg16 {
    AF,
    BC,
    DE,
    HL,
}

impl Reg16 {
    fn halves(self) -> (Reg, Reg) {
        match self {
            Reg16::AF => (Reg::A, Reg::F),
            Reg16::BC => (Reg::B, Reg::C),
            Reg16::DE => (Reg::D, Reg::E),
            Reg16::HL => (Reg::H, Reg::L),
        }
    }
}

/// Where each flag of an instruction comes from.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FlagSrc {
    V0,
    V1,
    Alu,
    Cpu,
}

// Operand field encodings; `None` is (HL)
const ENCODED_REG: [Option<Reg>; 8] = [
    Some(Reg::B),
    Some(Reg::C),
    Some(Reg::D),
    Some(Reg::E),
    Some(Reg::H),
    Some(Reg::L),
    None,
    Some(Reg::A),
];
// AF stands for SP except in PUSH/POP
const ENCODED_REG16: [Reg16; 4] = [Reg16::BC, Reg16::DE, Reg16::HL, Reg16::AF];

pub struct Cpu {
    regs: RegisterFile<Reg, 8>,
    pc: u16,
    sp: u16,
    ime: bool,
    ie: u8,
    if_reg: InterruptLine,
    high_ram: Ram,
    next_non_idle_cycle: u64,
    locked: bool,
}

impl Cpu {
    pub fn new(if_reg: InterruptLine) -> Self {
        Self {
            regs: RegisterFile::new(),
            pc: 0,
            sp: 0,
            ime: false,
            ie: 0,
            if_reg,
            high_ram: Ram::new(HIGH_RAM_SIZE),
            next_non_idle_cycle: 0,
            locked: false,
        }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    pub fn set_sp(&mut self, sp: u16) {
        self.sp = sp;
    }

    pub fn reg(&self, r: Reg) -> u8 {
        self.regs.get(r)
    }

    /// F keeps only its four flag bits.
    pub fn set_reg(&mut self, r: Reg, value: u8) {
        let value = if r == Reg::F { value & 0xF0 } else { value };
        self.regs.set(r, value);
    }

    pub fn reg16(&self, r: Reg16) -> u16 {
        let (h, l) = r.halves();
        u16::from_be_bytes([self.regs.get(h), self.regs.get(l)])
    }

    pub fn set_reg16(&mut self, r: Reg16, value: u16) {
        let (h, l) = r.halves();
        let [hi, lo] = value.to_be_bytes();
        self.set_reg(h, hi);
        self.set_reg(l, lo);
    }

    pub fn ime(&self) -> bool {
        self.ime
    }

    pub fn set_ime(&mut self, ime: bool) {
        self.ime = ime;
    }

    pub fn halted(&self) -> bool {
        self.next_non_idle_cycle == u64::MAX && !self.locked
    }

    /// Hit an undefined opcode; nothing wakes it up again.
    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn next_non_idle_cycle(&self) -> u64 {
        self.next_non_idle_cycle
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.regs.test_bit(Reg::F, flag)
    }

    fn pending_interrupts(&self) -> u8 {
        self.ie & self.if_reg.get() & INTERRUPT_MASK
    }

    /// Run the CPU for global tick `cycle`.
    pub fn cycle(&mut self, cycle: u64, bus: &mut Bus<'_, '_>) {
        debug_assert!(cycle <= self.next_non_idle_cycle);
        if cycle == self.next_non_idle_cycle {
            self.really_cycle(bus);
        } else if self.next_non_idle_cycle == u64::MAX
            && !self.locked
            && self.pending_interrupts() != 0
        {
            self.next_non_idle_cycle = cycle;
            self.really_cycle(bus);
        }
    }

    fn really_cycle(&mut self, bus: &mut Bus<'_, '_>) {
        let pending = self.pending_interrupts();
        if self.ime && pending != 0 {
            let index = pending.trailing_zeros() as usize;
            self.if_reg.set(self.if_reg.get() & !(1 << index));
            self.push16(bus, self.pc);
            self.ime = false;
            self.pc = INTERRUPTS[index];
            self.next_non_idle_cycle += INTERRUPT_CYCLES;
        } else {
            let byte = self.read8(bus, self.pc);
            let op = if byte == opcode::PREFIX {
                &opcode::PREFIXED[usize::from(self.read8_after_opcode(bus))]
            } else {
                &opcode::DIRECT[usize::from(byte)]
            };
            self.dispatch(op, bus);
        }
    }

    fn dispatch(&mut self, op: &Opcode, bus: &mut Bus<'_, '_>) {
        #[cfg(feature = "cpu-trace")]
        log::trace!(
            "PC={:04X} {:?} ({:02X}) AF={:04X} BC={:04X} DE={:04X} HL={:04X} SP={:04X}",
            self.pc,
            op.family,
            op.encoding,
            self.reg16(Reg16::AF),
            self.reg16(Reg16::BC),
            self.reg16(Reg16::DE),
            self.reg16(Reg16::HL),
            self.sp
        );

        let mut next_pc = self.pc.wrapping_add(u16::from(op.total_bytes));
        self.next_non_idle_cycle += u64::from(op.cycles);

        match op.family {
            Family::Nop => {}

            // Loads
            Family::LoadRegFromHl => {
                let v = self.read8_at_hl(bus);
                self.set_operand_reg(op, 3, v);
            }
            Family::LoadAFromHlStep => {
                let v = self.read8_at_hl(bus);
                self.regs.set(Reg::A, v);
                self.step_hl(op);
            }
            Family::LoadAFromHighImm => {
                let addr = HIGH_PAGE + u16::from(self.read8_after_opcode(bus));
                let v = self.read8(bus, addr);
                self.regs.set(Reg::A, v);
            }
            Family::LoadAFromHighC => {
                let v = self.read8(bus, HIGH_PAGE + u16::from(self.regs.get(Reg::C)));
                self.regs.set(Reg::A, v);
            }
            Family::LoadAFromAbs => {
                let addr = self.read16_after_opcode(bus);
                let v = self.read8(bus, addr);
                self.regs.set(Reg::A, v);
            }
            Family::LoadAFromBc => {
                let v = self.read8(bus, self.reg16(Reg16::BC));
                self.regs.set(Reg::A, v);
            }
            Family::LoadAFromDe => {
                let v = self.read8(bus, self.reg16(Reg16::DE));
                self.regs.set(Reg::A, v);
            }
            Family::LoadRegImm => {
                let v = self.read8_after_opcode(bus);
                self.set_operand_reg(op, 3, v);
            }
            Family::LoadPairImm => {
                let v = self.read16_after_opcode(bus);
                self.set_reg16_sp(Self::operand_reg16(op), v);
            }
            Family::Pop => {
                let v = self.pop16(bus);
                self.set_reg16(Self::operand_reg16(op), v);
            }

            // Stores
            Family::StoreRegToHl => {
                let v = self.operand_reg(op, 0);
                self.write8_at_hl(bus, v);
            }
            Family::StoreAToHlStep => {
                self.write8_at_hl(bus, self.regs.get(Reg::A));
                self.step_hl(op);
            }
            Family::StoreAToHighImm => {
                let addr = HIGH_PAGE + u16::from(self.read8_after_opcode(bus));
                self.write8(bus, addr, self.regs.get(Reg::A));
            }
            Family::StoreAToHighC => {
                let addr = HIGH_PAGE + u16::from(self.regs.get(Reg::C));
                self.write8(bus, addr, self.regs.get(Reg::A));
            }
            Family::StoreAToAbs => {
                let addr = self.read16_after_opcode(bus);
                self.write8(bus, addr, self.regs.get(Reg::A));
            }
            Family::StoreAToBc => {
                self.write8(bus, self.reg16(Reg16::BC), self.regs.get(Reg::A));
            }
            Family::StoreAToDe => {
                self.write8(bus, self.reg16(Reg16::DE), self.regs.get(Reg::A));
            }
            Family::StoreImmToHl => {
                let v = self.read8_after_opcode(bus);
                self.write8_at_hl(bus, v);
            }
            Family::StoreSpToAbs => {
                let addr = self.read16_after_opcode(bus);
                self.write16(bus, addr, self.sp);
            }
            Family::Push => {
                let v = self.reg16(Self::operand_reg16(op));
                self.push16(bus, v);
            }

            // Moves
            Family::MoveReg => {
                let v = self.operand_reg(op, 0);
                self.set_operand_reg(op, 3, v);
            }
            Family::MoveHlToSp => self.sp = self.reg16(Reg16::HL),

            // Add
            Family::AddReg => {
                let r = alu::add(self.regs.get(Reg::A), self.operand_reg(op, 0), self.carry_in(op));
                self.set_reg_flags(Reg::A, r);
            }
            Family::AddImm => {
                let v = self.read8_after_opcode(bus);
                let r = alu::add(self.regs.get(Reg::A), v, self.carry_in(op));
                self.set_reg_flags(Reg::A, r);
            }
            Family::AddHl => {
                let v = self.read8_at_hl(bus);
                let r = alu::add(self.regs.get(Reg::A), v, self.carry_in(op));
                self.set_reg_flags(Reg::A, r);
            }
            Family::IncReg => {
                let r = alu::add(self.operand_reg(op, 3), 1, false);
                self.set_operand_reg(op, 3, r.byte());
                self.combine_flags(r, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::IncHl => {
                let r = alu::add(self.read8_at_hl(bus), 1, false);
                self.write8_at_hl(bus, r.byte());
                self.combine_flags(r, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::IncPair => {
                let r = Self::operand_reg16(op);
                self.set_reg16_sp(r, self.reg16_sp(r).wrapping_add(1));
            }
            Family::AddHlPair => {
                let r = alu::add16_high(self.reg16(Reg16::HL), self.reg16_sp(Self::operand_reg16(op)));
                self.set_reg16(Reg16::HL, r.value);
                self.combine_flags(r, FlagSrc::Cpu, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Alu);
            }
            Family::AddSpSigned => {
                let offset = self.read8_after_opcode(bus) as i8;
                let r = alu::add16_low(self.sp, offset as u16);
                // 0xF8 targets HL, 0xE8 targets SP
                if op.encoding & 0x10 != 0 {
                    self.set_reg16(Reg16::HL, r.value);
                } else {
                    self.sp = r.value;
                }
                self.set_flags(r);
            }

            // Subtract
            Family::SubReg => {
                let r = alu::sub(self.regs.get(Reg::A), self.operand_reg(op, 0), self.carry_in(op));
                self.set_reg_flags(Reg::A, r);
            }
            Family::SubImm => {
                let v = self.read8_after_opcode(bus);
                let r = alu::sub(self.regs.get(Reg::A), v, self.carry_in(op));
                self.set_reg_flags(Reg::A, r);
            }
            Family::SubHl => {
                let v = self.read8_at_hl(bus);
                let r = alu::sub(self.regs.get(Reg::A), v, self.carry_in(op));
                self.set_reg_flags(Reg::A, r);
            }
            Family::DecReg => {
                let r = alu::sub(self.operand_reg(op, 3), 1, false);
                self.set_operand_reg(op, 3, r.byte());
                self.combine_flags(r, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::DecHl => {
                let r = alu::sub(self.read8_at_hl(bus), 1, false);
                self.write8_at_hl(bus, r.byte());
                self.combine_flags(r, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::CompareReg => {
                let r = alu::sub(self.regs.get(Reg::A), self.operand_reg(op, 0), false);
                self.set_flags(r);
            }
            Family::CompareImm => {
                let v = self.read8_after_opcode(bus);
                self.set_flags(alu::sub(self.regs.get(Reg::A), v, false));
            }
            Family::CompareHl => {
                let v = self.read8_at_hl(bus);
                self.set_flags(alu::sub(self.regs.get(Reg::A), v, false));
            }
            Family::DecPair => {
                let r = Self::operand_reg16(op);
                self.set_reg16_sp(r, self.reg16_sp(r).wrapping_sub(1));
            }

            // Logic
            Family::AndReg => {
                let r = alu::and(self.regs.get(Reg::A), self.operand_reg(op, 0));
                self.set_reg_flags(Reg::A, r);
            }
            Family::AndImm => {
                let v = self.read8_after_opcode(bus);
                self.set_reg_flags(Reg::A, alu::and(self.regs.get(Reg::A), v));
            }
            Family::AndHl => {
                let v = self.read8_at_hl(bus);
                self.set_reg_flags(Reg::A, alu::and(self.regs.get(Reg::A), v));
            }
            Family::OrReg => {
                let r = alu::or(self.regs.get(Reg::A), self.operand_reg(op, 0));
                self.set_reg_flags(Reg::A, r);
            }
            Family::OrImm => {
                let v = self.read8_after_opcode(bus);
                self.set_reg_flags(Reg::A, alu::or(self.regs.get(Reg::A), v));
            }
            Family::OrHl => {
                let v = self.read8_at_hl(bus);
                self.set_reg_flags(Reg::A, alu::or(self.regs.get(Reg::A), v));
            }
            Family::XorReg => {
                let r = alu::xor(self.regs.get(Reg::A), self.operand_reg(op, 0));
                self.set_reg_flags(Reg::A, r);
            }
            Family::XorImm => {
                let v = self.read8_after_opcode(bus);
                self.set_reg_flags(Reg::A, alu::xor(self.regs.get(Reg::A), v));
            }
            Family::XorHl => {
                let v = self.read8_at_hl(bus);
                self.set_reg_flags(Reg::A, alu::xor(self.regs.get(Reg::A), v));
            }
            Family::Complement => {
                self.regs.set(Reg::A, !self.regs.get(Reg::A));
                self.combine_flags(
                    ValueFlags { value: 0, flags: 0 },
                    FlagSrc::Cpu,
                    FlagSrc::V1,
                    FlagSrc::V1,
                    FlagSrc::Cpu,
                );
            }

            // Rotates and shifts
            Family::RotateA => {
                let r = alu::rotate(Self::rot_dir(op), self.regs.get(Reg::A));
                self.regs.set(Reg::A, r.byte());
                self.combine_flags(r, FlagSrc::V0, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Alu);
            }
            Family::RotateAThroughCarry => {
                let r = alu::rotate_through_carry(Self::rot_dir(op), self.regs.get(Reg::A), self.flag(Flag::C));
                self.regs.set(Reg::A, r.byte());
                self.combine_flags(r, FlagSrc::V0, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Alu);
            }
            Family::RotateReg => {
                let r = alu::rotate(Self::rot_dir(op), self.operand_reg(op, 0));
                self.set_operand_reg_flags(op, r);
            }
            Family::RotateRegThroughCarry => {
                let r = alu::rotate_through_carry(Self::rot_dir(op), self.operand_reg(op, 0), self.flag(Flag::C));
                self.set_operand_reg_flags(op, r);
            }
            Family::RotateHl => {
                let r = alu::rotate(Self::rot_dir(op), self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, r);
            }
            Family::RotateHlThroughCarry => {
                let carry = self.flag(Flag::C);
                let r = alu::rotate_through_carry(Self::rot_dir(op), self.read8_at_hl(bus), carry);
                self.write8_at_hl_and_set_flags(bus, r);
            }
            Family::SwapReg => {
                let r = alu::swap(self.operand_reg(op, 0));
                self.set_operand_reg_flags(op, r);
            }
            Family::SwapHl => {
                let r = alu::swap(self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, r);
            }
            Family::ShiftLeftReg => {
                let r = alu::shift_left(self.operand_reg(op, 0));
                self.set_operand_reg_flags(op, r);
            }
            Family::ShiftLeftHl => {
                let r = alu::shift_left(self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, r);
            }
            Family::ShiftRightArithReg => {
                let r = alu::shift_right_arithmetic(self.operand_reg(op, 0));
                self.set_operand_reg_flags(op, r);
            }
            Family::ShiftRightArithHl => {
                let r = alu::shift_right_arithmetic(self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, r);
            }
            Family::ShiftRightLogicReg => {
                let r = alu::shift_right_logical(self.operand_reg(op, 0));
                self.set_operand_reg_flags(op, r);
            }
            Family::ShiftRightLogicHl => {
                let r = alu::shift_right_logical(self.read8_at_hl(bus));
                self.write8_at_hl_and_set_flags(bus, r);
            }

            // Bits
            Family::TestBitReg => {
                let r = alu::test_bit(self.operand_reg(op, 0), Self::bit_index(op));
                self.combine_flags(r, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::TestBitHl => {
                let r = alu::test_bit(self.read8_at_hl(bus), Self::bit_index(op));
                self.combine_flags(r, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Alu, FlagSrc::Cpu);
            }
            Family::ChangeBitReg => {
                let v = Self::change_bit(op, self.operand_reg(op, 0));
                self.set_operand_reg(op, 0, v);
            }
            Family::ChangeBitHl => {
                let v = Self::change_bit(op, self.read8_at_hl(bus));
                self.write8_at_hl(bus, v);
            }

            Family::DecimalAdjust => {
                let r = alu::bcd_adjust(
                    self.regs.get(Reg::A),
                    self.flag(Flag::N),
                    self.flag(Flag::H),
                    self.flag(Flag::C),
                );
                self.set_reg_flags(Reg::A, r);
            }
            Family::SetComplementCarry => {
                // SCF sets C, CCF flips it
                let c = if self.carry_in(op) { FlagSrc::V0 } else { FlagSrc::V1 };
                self.combine_flags(
                    ValueFlags { value: 0, flags: 0 },
                    FlagSrc::Cpu,
                    FlagSrc::V0,
                    FlagSrc::V0,
                    c,
                );
            }

            // Jumps
            Family::JumpHl => next_pc = self.reg16(Reg16::HL),
            Family::Jump => next_pc = self.read16_after_opcode(bus),
            Family::JumpIf => {
                if self.condition(op) {
                    next_pc = self.read16_after_opcode(bus);
                    self.next_non_idle_cycle += u64::from(op.additional_cycles);
                }
            }
            Family::JumpRelative => {
                let e = self.read8_after_opcode(bus) as i8;
                next_pc = next_pc.wrapping_add_signed(i16::from(e));
            }
            Family::JumpRelativeIf => {
                if self.condition(op) {
                    let e = self.read8_after_opcode(bus) as i8;
                    next_pc = next_pc.wrapping_add_signed(i16::from(e));
                    self.next_non_idle_cycle += u64::from(op.additional_cycles);
                }
            }

            // Calls and returns
            Family::Call => {
                self.push16(bus, next_pc);
                next_pc = self.read16_after_opcode(bus);
            }
            Family::CallIf => {
                if self.condition(op) {
                    self.push16(bus, next_pc);
                    next_pc = self.read16_after_opcode(bus);
                    self.next_non_idle_cycle += u64::from(op.additional_cycles);
                }
            }
            Family::Restart => {
                self.push16(bus, next_pc);
                next_pc = RESETS[usize::from((op.encoding >> 3) & 0x07)];
            }
            Family::Return => next_pc = self.pop16(bus),
            Family::ReturnIf => {
                if self.condition(op) {
                    next_pc = self.pop16(bus);
                    self.next_non_idle_cycle += u64::from(op.additional_cycles);
                }
            }

            // Interrupts
            Family::SetIme => self.ime = op.encoding & 0x08 != 0,
            Family::ReturnFromInterrupt => {
                next_pc = self.pop16(bus);
                self.ime = true;
            }

            Family::Halt => self.next_non_idle_cycle = u64::MAX,
            Family::Stop => panic!("STOP instruction is not supported (PC={:#06X})", self.pc),
            Family::Illegal => {
                log::warn!(
                    "illegal opcode {:#04X} at {:#06X}, CPU locked",
                    op.encoding,
                    self.pc
                );
                self.locked = true;
                self.next_non_idle_cycle = u64::MAX;
                return;
            }
            Family::Prefix => unreachable!(),
        }

        self.pc = next_pc;
    }

    fn read8(&self, bus: &Bus<'_, '_>, address: u16) -> u8 {
        bus.read_as(self, address)
    }

    fn read8_at_hl(&self, bus: &Bus<'_, '_>) -> u8 {
        self.read8(bus, self.reg16(Reg16::HL))
    }

    fn read8_after_opcode(&self, bus: &Bus<'_, '_>) -> u8 {
        self.read8(bus, self.pc.wrapping_add(1))
    }

    fn read16(&self, bus: &Bus<'_, '_>, address: u16) -> u16 {
        let lo = self.read8(bus, address);
        let hi = self.read8(bus, address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn read16_after_opcode(&self, bus: &Bus<'_, '_>) -> u16 {
        self.read16(bus, self.pc.wrapping_add(1))
    }

    fn write8(&mut self, bus: &mut Bus<'_, '_>, address: u16, value: u8) {
        bus.write_as(self, address, value);
    }

    fn write8_at_hl(&mut self, bus: &mut Bus<'_, '_>, value: u8) {
        let hl = self.reg16(Reg16::HL);
        self.write8(bus, hl, value);
    }

    fn write16(&mut self, bus: &mut Bus<'_, '_>, address: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write8(bus, address, lo);
        self.write8(bus, address.wrapping_add(1), hi);
    }

    fn push16(&mut self, bus: &mut Bus<'_, '_>, value: u16) {
        self.sp = self.sp.wrapping_sub(2);
        self.write16(bus, self.sp, value);
    }

    fn pop16(&mut self, bus: &Bus<'_, '_>) -> u16 {
        let v = self.read16(bus, self.sp);
        self.sp = self.sp.wrapping_add(2);
        v
    }

    fn reg16_sp(&self, r: Reg16) -> u16 {
        if r == Reg16::AF { self.sp } else { self.reg16(r) }
    }

    fn set_reg16_sp(&mut self, r: Reg16, value: u16) {
        if r == Reg16::AF {
            self.sp = value;
        } else {
            self.set_reg16(r, value);
        }
    }

    fn step_hl(&mut self, op: &Opcode) {
        let hl = self.reg16(Reg16::HL);
        let hl = if op.encoding & 0x10 != 0 {
            hl.wrapping_sub(1)
        } else {
            hl.wrapping_add(1)
        };
        self.set_reg16(Reg16::HL, hl);
    }

    fn operand_reg(&self, op: &Opcode, shift: u8) -> u8 {
        self.regs.get(Self::encoded_reg(op, shift))
    }

    fn set_operand_reg(&mut self, op: &Opcode, shift: u8, value: u8) {
        self.regs.set(Self::encoded_reg(op, shift), value);
    }

    fn encoded_reg(op: &Opcode, shift: u8) -> Reg {
        match ENCODED_REG[usize::from((op.encoding >> shift) & 0x07)] {
            Some(r) => r,
            None => unreachable!("(HL) operand in register family {:?}", op.family),
        }
    }

    fn operand_reg16(op: &Opcode) -> Reg16 {
        ENCODED_REG16[usize::from((op.encoding >> 4) & 0x03)]
    }

    /// Carry/borrow input of ADC/SBC; also tells SCF from CCF.
    fn carry_in(&self, op: &Opcode) -> bool {
        op.encoding & 0x08 != 0 && self.flag(Flag::C)
    }

    fn rot_dir(op: &Opcode) -> RotDir {
        if op.encoding & 0x08 != 0 {
            RotDir::Right
        } else {
            RotDir::Left
        }
    }

    fn bit_index(op: &Opcode) -> u8 {
        (op.encoding >> 3) & 0x07
    }

    fn change_bit(op: &Opcode, v: u8) -> u8 {
        let mask = 1 << Self::bit_index(op);
        if op.encoding & 0x40 != 0 {
            v | mask
        } else {
            v & !mask
        }
    }

    fn condition(&self, op: &Opcode) -> bool {
        match (op.encoding >> 3) & 0x03 {
            0b00 => !self.flag(Flag::Z),
            0b01 => self.flag(Flag::Z),
            0b10 => !self.flag(Flag::C),
            _ => self.flag(Flag::C),
        }
    }

    fn set_flags(&mut self, r: ValueFlags) {
        self.regs.set(Reg::F, r.flags);
    }

    fn set_reg_flags(&mut self, reg: Reg, r: ValueFlags) {
        self.regs.set(reg, r.byte());
        self.set_flags(r);
    }

    fn set_operand_reg_flags(&mut self, op: &Opcode, r: ValueFlags) {
        self.set_operand_reg(op, 0, r.byte());
        self.set_flags(r);
    }

    fn write8_at_hl_and_set_flags(&mut self, bus: &mut Bus<'_, '_>, r: ValueFlags) {
        self.write8_at_hl(bus, r.byte());
        self.set_flags(r);
    }

    fn combine_flags(&mut self, r: ValueFlags, z: FlagSrc, n: FlagSrc, h: FlagSrc, c: FlagSrc) {
        let mask = |src: FlagSrc| alu::mask_znhc(z == src, n == src, h == src, c == src);
        let f = mask(FlagSrc::V1) | (r.flags & mask(FlagSrc::Alu)) | (self.regs.get(Reg::F) & mask(FlagSrc::Cpu));
        self.regs.set(Reg::F, f);
    }
}

impl Component for Cpu {
    fn read(&self, address: u16) -> Option<u8> {
        if HIGH_RAM.contains(&address) {
            Some(self.high_ram.read(usize::from(address - HIGH_RAM.start)))
        } else if address == REG_IE {
            Some(self.ie)
        } else if address == REG_IF {
            Some(self.if_reg.get())
        } else {
            None
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        if HIGH_RAM.contains(&address) {
            self.high_ram.write(usize::from(address - HIGH_RAM.start), data);
        } else if address == REG_IE {
            self.ie = data;
        } else if address == REG_IF {
            self.if_reg.set(data);
        }
    }
}
