//! Fixed DMG address map.
//!
//! Windows are half-open `[START, END)` ranges, matching how the components
//! test membership with `contains`.

use std::ops::Range;

// Memory windows
pub const BOOT_ROM: Range<u16> = 0x0000..0x0100;
pub const CARTRIDGE_ROM: Range<u16> = 0x0000..0x8000;
pub const VIDEO_RAM: Range<u16> = 0x8000..0xA000;
pub const CARTRIDGE_RAM: Range<u16> = 0xA000..0xC000;
pub const WORK_RAM: Range<u16> = 0xC000..0xE000;
pub const ECHO_RAM: Range<u16> = 0xE000..0xFE00;
pub const OAM: Range<u16> = 0xFE00..0xFEA0;
pub const HIGH_RAM: Range<u16> = 0xFF80..0xFFFF;

pub const BOOT_ROM_SIZE: usize = 0x100;
pub const CARTRIDGE_ROM_SIZE: usize = 0x8000;
pub const VIDEO_RAM_SIZE: usize = 0x2000;
pub const WORK_RAM_SIZE: usize = 0x2000;
pub const OAM_SIZE: usize = 0xA0;
pub const HIGH_RAM_SIZE: usize = 0x7F;

// Joypad
pub const REG_P1: u16 = 0xFF00;

// Timer
pub const REG_DIV: u16 = 0xFF04;
pub const REG_TIMA: u16 = 0xFF05;
pub const REG_TMA: u16 = 0xFF06;
pub const REG_TAC: u16 = 0xFF07;

// Interrupts
pub const REG_IF: u16 = 0xFF0F;
pub const REG_IE: u16 = 0xFFFF;

// LCD controller registers, in bank order
pub const REGS_LCDC_START: u16 = 0xFF40;
pub const REGS_LCDC_END: u16 = 0xFF4C;
pub const REG_LCDC: u16 = 0xFF40;
pub const REG_STAT: u16 = 0xFF41;
pub const REG_SCY: u16 = 0xFF42;
pub const REG_SCX: u16 = 0xFF43;
pub const REG_LY: u16 = 0xFF44;
pub const REG_LYC: u16 = 0xFF45;
pub const REG_DMA: u16 = 0xFF46;
pub const REG_BGP: u16 = 0xFF47;
pub const REG_OBP0: u16 = 0xFF48;
pub const REG_OBP1: u16 = 0xFF49;
pub const REG_WY: u16 = 0xFF4A;
pub const REG_WX: u16 = 0xFF4B;

pub const REG_BOOT_ROM_DISABLE: u16 = 0xFF50;

// Tile maps and tile data (LCDC selects between the two entries)
pub const BG_DISPLAY_DATA: [u16; 2] = [0x9800, 0x9C00];
pub const TILE_SOURCE: [u16; 2] = [0x8800, 0x8000];

pub const INTERRUPTS: [u16; 5] = [0x40, 0x48, 0x50, 0x58, 0x60];
pub const RESETS: [u16; 8] = [0x00, 0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38];
