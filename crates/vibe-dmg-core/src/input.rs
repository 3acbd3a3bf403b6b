use crate::address_map::REG_P1;
use crate::bus::Component;
use crate::cpu::{Interrupt, InterruptLine};

// P1 row select bits (active low on the bus)
const SELECT_MASK: u8 = 0x30;
const SELECT_BITS: [u8; 2] = [0x10, 0x20];

/// Joypad buttons. The first four share row 0 (direction pad), the last
/// four row 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Key {
    pub const ALL: [Key; 8] = [
        Key::Right,
        Key::Left,
        Key::Up,
        Key::Down,
        Key::A,
        Key::B,
        Key::Select,
        Key::Start,
    ];

    fn row(self) -> usize {
        (self as usize >> 2) & 1
    }

    fn column_mask(self) -> u8 {
        1 << (self as u8 & 0x03)
    }
}

/// The P1 register and the matrix behind it.
pub struct Joypad {
    pressed: [u8; 2],
    selected_rows: u8,
    irq: InterruptLine,
}

impl Joypad {
    pub fn new(irq: InterruptLine) -> Self {
        Self {
            pressed: [0; 2],
            selected_rows: 0,
            irq,
        }
    }

    pub fn key_pressed(&mut self, key: Key) {
        let before = self.visible_keys();
        self.pressed[key.row()] |= key.column_mask();
        self.interrupt_if_new(before);
    }

    /// Releasing never raises an interrupt.
    pub fn key_released(&mut self, key: Key) {
        self.pressed[key.row()] &= !key.column_mask();
    }

    fn interrupt_if_new(&self, before: u8) {
        if !before & self.visible_keys() != 0 {
            self.irq.request(Interrupt::Joypad);
        }
    }

    /// Pressed keys of the selected rows, as active-high column bits.
    fn visible_keys(&self) -> u8 {
        SELECT_BITS
            .iter()
            .zip(self.pressed)
            .filter(|&(&bit, _)| self.selected_rows & bit != 0)
            .fold(0, |acc, (_, row)| acc | row)
    }
}

impl Component for Joypad {
    fn read(&self, addr: u16) -> Option<u8> {
        (addr == REG_P1).then(|| !(self.visible_keys() | self.selected_rows))
    }

    fn write(&mut self, addr: u16, val: u8) {
        if addr == REG_P1 {
            let before = self.visible_keys();
            self.selected_rows = !val & SELECT_MASK;
            self.interrupt_if_new(before);
        }
    }
}
