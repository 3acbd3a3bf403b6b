use std::{fs, io, path::Path};

use thiserror::Error;

use crate::address_map::{CARTRIDGE_RAM, CARTRIDGE_ROM, CARTRIDGE_ROM_SIZE};
use crate::bus::Component;

// Header offsets (gbdev.io/pandocs/The_Cartridge_Header.html)
const HEADER_TITLE: std::ops::Range<usize> = 0x0134..0x0143;
const HEADER_CART_TYPE: usize = 0x0147;
const HEADER_RAM_SIZE: usize = 0x0149;
const HEADER_END: usize = 0x0150;

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

// External RAM sizes indexed by header byte 0x149
const RAM_SIZES: [usize; 4] = [0, 0x800, 0x2000, 0x8000];

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("failed to read cartridge image: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported cartridge controller type {0:#04X}")]
    UnsupportedController(u8),
    #[error("invalid ROM size: expected {expected:#X} bytes, got {actual:#X}")]
    InvalidRomSize { expected: usize, actual: usize },
    #[error("unsupported RAM size code {0:#04X}")]
    InvalidRamSize(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
}

#[derive(Debug)]
enum MbcState {
    NoMbc,
    Mbc1 {
        rom_bank: u8,
        bank2: u8,
        mode: u8,
        ram_enable: bool,
    },
}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub title: String,
    mbc_state: MbcState,
}

impl Cartridge {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::InvalidRomSize {
                expected: CARTRIDGE_ROM_SIZE,
                actual: data.len(),
            });
        }
        let header = Header::parse(&data);
        let mbc = header.mbc_type()?;
        let title = header.title();

        let (ram_size, mbc_state) = match mbc {
            MbcType::NoMbc => {
                if data.len() != CARTRIDGE_ROM_SIZE {
                    return Err(CartridgeError::InvalidRomSize {
                        expected: CARTRIDGE_ROM_SIZE,
                        actual: data.len(),
                    });
                }
                (0, MbcState::NoMbc)
            }
            MbcType::Mbc1 => {
                if data.len() < CARTRIDGE_ROM_SIZE || data.len() % ROM_BANK_SIZE != 0 {
                    return Err(CartridgeError::InvalidRomSize {
                        expected: data.len().next_multiple_of(ROM_BANK_SIZE).max(CARTRIDGE_ROM_SIZE),
                        actual: data.len(),
                    });
                }
                let state = MbcState::Mbc1 {
                    rom_bank: 1,
                    bank2: 0,
                    mode: 0,
                    ram_enable: false,
                };
                (header.ram_size()?, state)
            }
        };

        log::debug!("cartridge \"{title}\": {mbc:?}, {} KiB ROM, {ram_size:#X} bytes RAM", data.len() / 1024);

        Ok(Self {
            rom: data,
            ram: vec![0; ram_size],
            mbc,
            title,
            mbc_state,
        })
    }

    fn rom_bank_count(&self) -> usize {
        self.rom.len() / ROM_BANK_SIZE
    }

    fn ram_index(&self, addr: u16, bank2: u8, mode: u8) -> Option<usize> {
        if self.ram.is_empty() {
            return None;
        }
        let bank = if mode == 1 { usize::from(bank2) } else { 0 };
        let idx = bank * RAM_BANK_SIZE + usize::from(addr - CARTRIDGE_RAM.start);
        Some(idx % self.ram.len())
    }
}

impl Component for Cartridge {
    fn read(&self, addr: u16) -> Option<u8> {
        match (&self.mbc_state, addr) {
            (MbcState::NoMbc, _) if CARTRIDGE_ROM.contains(&addr) => {
                Some(self.rom[usize::from(addr)])
            }
            (MbcState::NoMbc, _) => None,
            (MbcState::Mbc1 { bank2, mode, .. }, 0x0000..=0x3FFF) => {
                let bank = if *mode == 0 {
                    0
                } else {
                    (usize::from(*bank2) << 5) % self.rom_bank_count()
                };
                Some(self.rom[bank * ROM_BANK_SIZE + usize::from(addr)])
            }
            (MbcState::Mbc1 { rom_bank, bank2, .. }, 0x4000..=0x7FFF) => {
                let bank = ((usize::from(*bank2) << 5) | usize::from(*rom_bank)) % self.rom_bank_count();
                Some(self.rom[bank * ROM_BANK_SIZE + usize::from(addr) - ROM_BANK_SIZE])
            }
            (
                MbcState::Mbc1 {
                    ram_enable,
                    bank2,
                    mode,
                    ..
                },
                0xA000..=0xBFFF,
            ) => {
                if !*ram_enable {
                    return None;
                }
                self.ram_index(addr, *bank2, *mode).map(|i| self.ram[i])
            }
            (MbcState::Mbc1 { .. }, _) => None,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        let ram_target = match (&mut self.mbc_state, addr) {
            (MbcState::NoMbc, _) => None,
            (MbcState::Mbc1 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
                None
            }
            (MbcState::Mbc1 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = (val & 0x1F).max(1);
                None
            }
            (MbcState::Mbc1 { bank2, .. }, 0x4000..=0x5FFF) => {
                *bank2 = val & 0x03;
                None
            }
            (MbcState::Mbc1 { mode, .. }, 0x6000..=0x7FFF) => {
                *mode = val & 0x01;
                None
            }
            (
                MbcState::Mbc1 {
                    ram_enable: true,
                    bank2,
                    mode,
                    ..
                },
                0xA000..=0xBFFF,
            ) => Some((*bank2, *mode)),
            (MbcState::Mbc1 { .. }, _) => None,
        };

        if let Some((bank2, mode)) = ram_target {
            if let Some(idx) = self.ram_index(addr, bank2, mode) {
                self.ram[idx] = val;
            }
        }
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn title(&self) -> String {
        let mut slice = &self.data[HEADER_TITLE];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn mbc_type(&self) -> Result<MbcType, CartridgeError> {
        match self.data[HEADER_CART_TYPE] {
            0x00 => Ok(MbcType::NoMbc),
            0x01..=0x03 => Ok(MbcType::Mbc1),
            other => Err(CartridgeError::UnsupportedController(other)),
        }
    }

    fn ram_size(&self) -> Result<usize, CartridgeError> {
        let code = self.data[HEADER_RAM_SIZE];
        RAM_SIZES
            .get(usize::from(code))
            .copied()
            .ok_or(CartridgeError::InvalidRamSize(code))
    }
}
