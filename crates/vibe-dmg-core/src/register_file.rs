use std::marker::PhantomData;

/// A closed set of named byte registers.
pub trait Register: Copy {
    fn index(self) -> usize;
}

/// A named bit inside a byte register.
pub trait Bit: Copy {
    fn index(self) -> u8;

    fn mask(self) -> u8 {
        1 << self.index()
    }
}

/// Fixed bank of one byte per register of `R`.
#[derive(Clone)]
pub struct RegisterFile<R, const N: usize> {
    regs: [u8; N],
    _names: PhantomData<R>,
}

impl<R: Register, const N: usize> RegisterFile<R, N> {
    pub fn new() -> Self {
        Self {
            regs: [0; N],
            _names: PhantomData,
        }
    }

    pub fn get(&self, reg: R) -> u8 {
        self.regs[reg.index()]
    }

    pub fn set(&mut self, reg: R, value: u8) {
        self.regs[reg.index()] = value;
    }

    pub fn test_bit<B: Bit>(&self, reg: R, bit: B) -> bool {
        self.get(reg) & bit.mask() != 0
    }

    pub fn set_bit<B: Bit>(&mut self, reg: R, bit: B, value: bool) {
        let old = self.get(reg);
        let new = if value {
            old | bit.mask()
        } else {
            old & !bit.mask()
        };
        self.set(reg, new);
    }
}

impl<R: Register, const N: usize> Default for RegisterFile<R, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum Pair {
        Lo,
        Hi,
    }

    impl Register for Pair {
        fn index(self) -> usize {
            self as usize
        }
    }

    #[derive(Clone, Copy)]
    struct B(u8);

    impl Bit for B {
        fn index(self) -> u8 {
            self.0
        }
    }

    #[test]
    fn bits_only_touch_their_register() {
        let mut rf: RegisterFile<Pair, 2> = RegisterFile::new();
        rf.set(Pair::Hi, 0xF0);
        rf.set_bit(Pair::Lo, B(3), true);
        rf.set_bit(Pair::Hi, B(7), false);
        assert_eq!(rf.get(Pair::Lo), 0x08);
        assert_eq!(rf.get(Pair::Hi), 0x70);
        assert!(rf.test_bit(Pair::Lo, B(3)));
        assert!(!rf.test_bit(Pair::Lo, B(2)));
    }
}
