use crate::address_map::{REG_DIV, REG_TAC, REG_TIMA, REG_TMA};
use crate::bus::Component;
use crate::cpu::{Interrupt, InterruptLine};

// Internal counter advance per machine cycle (the counter runs at 4 MiHz)
const COUNTER_STEP: u16 = 4;

// Counter bit watched for each TAC clock select value
const COUNTER_BIT: [u8; 4] = [9, 3, 5, 7];

// TAC timer enable
const TAC_ENABLE: u8 = 0x04;

// Unused TAC bits read as 1
const TAC_UNUSED: u8 = 0xF8;

pub struct Timer {
    /// 16-bit internal counter. DIV register is the upper 8 bits.
    pub div: u16,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control, stored as written
    pub tac: u8,
    irq: InterruptLine,
}

impl Timer {
    pub fn new(irq: InterruptLine) -> Self {
        Self {
            div: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            irq,
        }
    }

    /// Advance the internal counter by one machine cycle.
    pub fn cycle(&mut self, _cycle: u64) {
        let prev = self.signal();
        self.div = self.div.wrapping_add(COUNTER_STEP);
        self.increment_if_fell(prev);
    }

    /// Reset the internal counter, applying the TIMA edge logic.
    pub fn reset_div(&mut self) {
        let prev = self.signal();
        self.div = 0;
        self.increment_if_fell(prev);
    }

    fn increment_if_fell(&mut self, prev: bool) {
        if prev && !self.signal() {
            self.increment();
        }
    }

    fn increment(&mut self) {
        if self.tima == 0xFF {
            self.tima = self.tma;
            self.irq.request(Interrupt::Timer);
        } else {
            self.tima += 1;
        }
    }

    fn signal(&self) -> bool {
        Self::signal_with(self.div, self.tac)
    }

    fn signal_with(div: u16, tac: u8) -> bool {
        tac & TAC_ENABLE != 0 && (div >> COUNTER_BIT[usize::from(tac & 0x03)]) & 1 != 0
    }
}

impl Component for Timer {
    fn read(&self, addr: u16) -> Option<u8> {
        match addr {
            REG_DIV => Some((self.div >> 8) as u8),
            REG_TIMA => Some(self.tima),
            REG_TMA => Some(self.tma),
            REG_TAC => Some(self.tac | TAC_UNUSED),
            _ => None,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            REG_DIV => self.reset_div(),
            REG_TIMA => self.tima = val,
            REG_TMA => self.tma = val,
            REG_TAC => {
                let prev = self.signal();
                self.tac = val;
                self.increment_if_fell(prev);
            }
            _ => {}
        }
    }
}
