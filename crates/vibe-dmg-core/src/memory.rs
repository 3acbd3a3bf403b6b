//! Plain memories and the controllers that map them onto the bus.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use crate::address_map::{BOOT_ROM, BOOT_ROM_SIZE, REG_BOOT_ROM_DISABLE};
use crate::bus::Component;
use crate::cartridge::Cartridge;

/// Fixed-size read/write memory, addressed from 0.
#[derive(Clone)]
pub struct Ram {
    data: Box<[u8]>,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size].into_boxed_slice(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn read(&self, index: usize) -> u8 {
        self.data[index]
    }

    pub fn write(&mut self, index: usize, value: u8) {
        self.data[index] = value;
    }
}

/// Read-only memory, addressed from 0.
#[derive(Clone)]
pub struct Rom {
    data: Box<[u8]>,
}

impl Rom {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn read(&self, index: usize) -> u8 {
        self.data[index]
    }
}

/// Maps a window of the address space onto a shared [`Ram`].
///
/// Work RAM and its echo are two controllers over the same storage.
pub struct RamController {
    ram: Rc<RefCell<Ram>>,
    window: Range<u16>,
}

impl RamController {
    pub fn new(ram: Rc<RefCell<Ram>>, window: Range<u16>) -> Self {
        let len = usize::from(window.end - window.start);
        assert!(
            len <= ram.borrow().size(),
            "window {:#06X}..{:#06X} larger than RAM",
            window.start,
            window.end
        );
        Self { ram, window }
    }
}

impl Component for RamController {
    fn read(&self, address: u16) -> Option<u8> {
        self.window
            .contains(&address)
            .then(|| self.ram.borrow().read(usize::from(address - self.window.start)))
    }

    fn write(&mut self, address: u16, data: u8) {
        if self.window.contains(&address) {
            self.ram
                .borrow_mut()
                .write(usize::from(address - self.window.start), data);
        }
    }
}

/// Overlays the boot image on the cartridge until 0xFF50 is written.
pub struct BootRomController {
    boot_rom: Option<Rom>,
    cartridge: Cartridge,
}

impl BootRomController {
    /// `boot_rom` must be exactly 0x100 bytes when present.
    pub fn new(cartridge: Cartridge, boot_rom: Option<Rom>) -> Self {
        if let Some(rom) = &boot_rom {
            assert_eq!(rom.size(), BOOT_ROM_SIZE, "boot ROM must be 256 bytes");
        }
        Self {
            boot_rom,
            cartridge,
        }
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }
}

impl Component for BootRomController {
    fn read(&self, address: u16) -> Option<u8> {
        match &self.boot_rom {
            Some(rom) if BOOT_ROM.contains(&address) => Some(rom.read(usize::from(address))),
            _ => self.cartridge.read(address),
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        if address == REG_BOOT_ROM_DISABLE && self.boot_rom.take().is_some() {
            log::debug!("boot ROM unmapped");
        }
        self.cartridge.write(address, data);
    }
}
