//! Memory-mapped bus shared by every component.
//!
//! The bus does not own anything. It is an ordered view over borrowed
//! components, rebuilt by the machine whenever a component needs to reach the
//! rest of the system. Attachment order is read priority: the first component
//! answering `Some` wins. Writes reach every slot.

/// A unit that can be attached to the bus.
pub trait Component {
    /// Value at `address`, or `None` when the component does not map it.
    fn read(&self, address: u16) -> Option<u8>;

    /// Store `data` at `address`. Unmapped addresses are ignored.
    fn write(&mut self, address: u16, data: u8);
}

/// Value seen on reads nobody answers.
pub const OPEN_BUS: u8 = 0xFF;

/// One position in the bus attachment order.
pub enum Slot<'c> {
    Attached(&'c mut dyn Component),
    /// Placeholder for the component currently being clocked. It takes part
    /// in reads and writes through [`Bus::read_as`] and [`Bus::write_as`].
    Caller,
}

pub struct Bus<'s, 'c> {
    slots: &'s mut [Slot<'c>],
}

impl<'s, 'c> Bus<'s, 'c> {
    pub fn new(slots: &'s mut [Slot<'c>]) -> Self {
        Self { slots }
    }

    /// Read as an outside observer. Caller slots are skipped.
    pub fn read(&self, address: u16) -> u8 {
        self.slots
            .iter()
            .find_map(|slot| match slot {
                Slot::Attached(c) => c.read(address),
                Slot::Caller => None,
            })
            .unwrap_or(OPEN_BUS)
    }

    /// Write as an outside observer. Caller slots are skipped.
    pub fn write(&mut self, address: u16, data: u8) {
        for slot in self.slots.iter_mut() {
            if let Slot::Attached(c) = slot {
                c.write(address, data);
            }
        }
    }

    /// Read on behalf of `caller`, which answers at its own slot.
    pub fn read_as(&self, caller: &dyn Component, address: u16) -> u8 {
        self.slots
            .iter()
            .find_map(|slot| match slot {
                Slot::Attached(c) => c.read(address),
                Slot::Caller => caller.read(address),
            })
            .unwrap_or(OPEN_BUS)
    }

    /// Write on behalf of `caller`, which receives the write at its own slot.
    pub fn write_as(&mut self, caller: &mut dyn Component, address: u16, data: u8) {
        for slot in self.slots.iter_mut() {
            match slot {
                Slot::Attached(c) => c.write(address, data),
                Slot::Caller => caller.write(address, data),
            }
        }
    }
}
