//! Flag-producing arithmetic of the LR35902.
//!
//! Every operation returns the result together with the Z/N/H/C flags laid
//! out as in the F register (Z = bit 7 down to C = bit 4). The CPU decides per
//! instruction which of those flags it actually keeps.

use crate::register_file::Bit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    C = 4,
    H = 5,
    N = 6,
    Z = 7,
}

impl Bit for Flag {
    fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotDir {
    Left,
    Right,
}

/// Result of an ALU operation. `value` holds 8 or 16 significant bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueFlags {
    pub value: u16,
    pub flags: u8,
}

impl ValueFlags {
    fn new(value: u16, z: bool, n: bool, h: bool, c: bool) -> Self {
        Self {
            value,
            flags: mask_znhc(z, n, h, c),
        }
    }

    /// Low byte of the result.
    pub fn byte(self) -> u8 {
        self.value as u8
    }

    pub fn test(self, flag: Flag) -> bool {
        self.flags & flag.mask() != 0
    }
}

pub fn mask_znhc(z: bool, n: bool, h: bool, c: bool) -> u8 {
    let bit = |set: bool, flag: Flag| if set { flag.mask() } else { 0 };
    bit(z, Flag::Z) | bit(n, Flag::N) | bit(h, Flag::H) | bit(c, Flag::C)
}

pub fn add(l: u8, r: u8, carry: bool) -> ValueFlags {
    let c = u16::from(carry);
    let sum = u16::from(l) + u16::from(r) + c;
    let half = u16::from(l & 0xF) + u16::from(r & 0xF) + c;
    let value = sum & 0xFF;
    ValueFlags::new(value, value == 0, false, half > 0xF, sum > 0xFF)
}

/// 16-bit add with H and C taken from the low byte. Z is always clear.
pub fn add16_low(l: u16, r: u16) -> ValueFlags {
    let h = (l & 0xF) + (r & 0xF) > 0xF;
    let c = (l & 0xFF) + (r & 0xFF) > 0xFF;
    ValueFlags::new(l.wrapping_add(r), false, false, h, c)
}

/// 16-bit add with H and C taken from bits 11 and 15. Z is always clear.
pub fn add16_high(l: u16, r: u16) -> ValueFlags {
    let h = (l & 0xFFF) + (r & 0xFFF) > 0xFFF;
    let (value, c) = l.overflowing_add(r);
    ValueFlags::new(value, false, false, h, c)
}

pub fn sub(l: u8, r: u8, borrow: bool) -> ValueFlags {
    let b = i16::from(borrow);
    let diff = i16::from(l) - i16::from(r) - b;
    let half = i16::from(l & 0xF) - i16::from(r & 0xF) - b;
    let value = (diff as u16) & 0xFF;
    ValueFlags::new(value, value == 0, true, half < 0, diff < 0)
}

/// Decimal adjust after an addition (`n` clear) or subtraction (`n` set).
pub fn bcd_adjust(v: u8, n: bool, h: bool, c: bool) -> ValueFlags {
    let fix_low = h || (!n && (v & 0xF) > 9);
    let fix_high = c || (!n && v > 0x99);
    let fix = (if fix_high { 0x60 } else { 0 }) | (if fix_low { 0x06 } else { 0 });
    let res = if n {
        v.wrapping_sub(fix)
    } else {
        v.wrapping_add(fix)
    };
    ValueFlags::new(u16::from(res), res == 0, n, false, fix_high)
}

pub fn and(l: u8, r: u8) -> ValueFlags {
    let res = l & r;
    ValueFlags::new(u16::from(res), res == 0, false, true, false)
}

pub fn or(l: u8, r: u8) -> ValueFlags {
    let res = l | r;
    ValueFlags::new(u16::from(res), res == 0, false, false, false)
}

pub fn xor(l: u8, r: u8) -> ValueFlags {
    let res = l ^ r;
    ValueFlags::new(u16::from(res), res == 0, false, false, false)
}

pub fn shift_left(v: u8) -> ValueFlags {
    let res = v << 1;
    ValueFlags::new(u16::from(res), res == 0, false, false, v & 0x80 != 0)
}

pub fn shift_right_arithmetic(v: u8) -> ValueFlags {
    let res = (v >> 1) | (v & 0x80);
    ValueFlags::new(u16::from(res), res == 0, false, false, v & 1 != 0)
}

pub fn shift_right_logical(v: u8) -> ValueFlags {
    let res = v >> 1;
    ValueFlags::new(u16::from(res), res == 0, false, false, v & 1 != 0)
}

fn carry_out(dir: RotDir, v: u8) -> bool {
    match dir {
        RotDir::Left => v & 0x80 != 0,
        RotDir::Right => v & 1 != 0,
    }
}

/// 8-bit rotation; the bit moved across the edge becomes C.
pub fn rotate(dir: RotDir, v: u8) -> ValueFlags {
    let res = match dir {
        RotDir::Left => v.rotate_left(1),
        RotDir::Right => v.rotate_right(1),
    };
    ValueFlags::new(u16::from(res), res == 0, false, false, carry_out(dir, v))
}

/// 9-bit rotation through the carry flag.
pub fn rotate_through_carry(dir: RotDir, v: u8, carry: bool) -> ValueFlags {
    let res = match dir {
        RotDir::Left => (v << 1) | u8::from(carry),
        RotDir::Right => (v >> 1) | (u8::from(carry) << 7),
    };
    ValueFlags::new(u16::from(res), res == 0, false, false, carry_out(dir, v))
}

pub fn swap(v: u8) -> ValueFlags {
    ValueFlags::new(u16::from(v.rotate_left(4)), v == 0, false, false, false)
}

/// Z reports a clear bit; H is always set. The value is 0.
pub fn test_bit(v: u8, bit: u8) -> ValueFlags {
    assert!(bit < 8, "bit index {bit} out of range");
    ValueFlags::new(0, v & (1 << bit) == 0, false, true, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_sets_borrows() {
        let r = sub(0x10, 0x01, false);
        assert_eq!(r.byte(), 0x0F);
        assert_eq!(r.flags, mask_znhc(false, true, true, false));
        let r = sub(0x00, 0x00, true);
        assert_eq!(r.byte(), 0xFF);
        assert_eq!(r.flags, mask_znhc(false, true, true, true));
    }

    #[test]
    fn add16_flag_sources() {
        let low = add16_low(0x00FF, 0x0001);
        assert_eq!(low.value, 0x0100);
        assert_eq!(low.flags, mask_znhc(false, false, true, true));
        let high = add16_high(0x0FFF, 0x0001);
        assert_eq!(high.flags, mask_znhc(false, false, true, false));
        let wrap = add16_high(0xFFFF, 0x0001);
        assert_eq!(wrap.value, 0);
        assert!(wrap.test(Flag::C));
        assert!(!wrap.test(Flag::Z));
    }

    #[test]
    fn bcd_after_add_and_sub() {
        // 0x15 + 0x27 = 0x3C -> 0x42
        let sum = add(0x15, 0x27, false);
        let adj = bcd_adjust(sum.byte(), false, sum.test(Flag::H), sum.test(Flag::C));
        assert_eq!(adj.byte(), 0x42);
        // 0x42 - 0x15 = 0x2D (H) -> 0x27
        let dif = sub(0x42, 0x15, false);
        let adj = bcd_adjust(dif.byte(), true, dif.test(Flag::H), dif.test(Flag::C));
        assert_eq!(adj.byte(), 0x27);
        assert!(adj.test(Flag::N));
        // 0x99 + 0x01 = 0x9A -> 0x00 with carry
        let adj = bcd_adjust(0x9A, false, false, false);
        assert_eq!(adj.byte(), 0x00);
        assert_eq!(adj.flags, mask_znhc(true, false, false, true));
    }

    #[test]
    fn rotate_through_carry_is_nine_bits() {
        let r = rotate_through_carry(RotDir::Left, 0x80, false);
        assert_eq!(r.byte(), 0x00);
        assert_eq!(r.flags, mask_znhc(true, false, false, true));
        let r = rotate_through_carry(RotDir::Right, 0x01, true);
        assert_eq!(r.byte(), 0x80);
        assert!(r.test(Flag::C));
    }

    #[test]
    fn shifts_and_swap() {
        assert_eq!(shift_right_arithmetic(0x81).byte(), 0xC0);
        assert_eq!(shift_right_logical(0x81).byte(), 0x40);
        assert!(shift_left(0x80).test(Flag::Z));
        assert_eq!(swap(0xA5).byte(), 0x5A);
        assert!(swap(0).test(Flag::Z));
    }

    #[test]
    fn bit_test_flags() {
        assert_eq!(test_bit(0x08, 3).flags, mask_znhc(false, false, true, false));
        assert_eq!(test_bit(0x08, 2).flags, mask_znhc(true, false, true, false));
    }
}
