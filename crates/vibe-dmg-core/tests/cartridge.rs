use std::fs;

use tempfile::tempdir;
use vibe_dmg_core::bus::Component;
use vibe_dmg_core::cartridge::{Cartridge, CartridgeError, MbcType};

fn header(size: usize, cart_type: u8, ram_code: u8) -> Vec<u8> {
    let mut rom = vec![0u8; size];
    rom[0x0134..0x0139].copy_from_slice(b"TETRA");
    rom[0x0147] = cart_type;
    rom[0x0149] = ram_code;
    rom
}

/// MBC1 image whose every bank starts with its own number.
fn banked_rom(banks: usize, ram_code: u8) -> Vec<u8> {
    let mut rom = header(banks * 0x4000, 0x03, ram_code);
    for bank in 1..banks {
        rom[bank * 0x4000] = bank as u8;
    }
    rom
}

#[test]
fn loads_rom_only_image_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("game.gb");
    let mut rom = header(0x8000, 0x00, 0x00);
    rom[0x7FFF] = 0x99;
    fs::write(&path, &rom).unwrap();

    let cart = Cartridge::from_file(&path).unwrap();
    assert_eq!(cart.mbc, MbcType::NoMbc);
    assert_eq!(cart.title, "TETRA");
    assert!(cart.ram.is_empty());
    assert_eq!(cart.read(0x7FFF), Some(0x99));
    assert_eq!(cart.read(0x8000), None);
    assert_eq!(cart.read(0xA000), None);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = Cartridge::from_file(dir.path().join("absent.gb")).unwrap_err();
    assert!(matches!(err, CartridgeError::Io(_)));
}

#[test]
fn rom_only_image_must_be_32_kib() {
    let err = Cartridge::from_bytes(header(0x4000, 0x00, 0x00)).unwrap_err();
    assert!(matches!(
        err,
        CartridgeError::InvalidRomSize {
            expected: 0x8000,
            actual: 0x4000
        }
    ));

    let err = Cartridge::from_bytes(vec![0; 0x100]).unwrap_err();
    assert!(matches!(err, CartridgeError::InvalidRomSize { .. }));
}

#[test]
fn unknown_controller_is_rejected() {
    let err = Cartridge::from_bytes(header(0x8000, 0x13, 0x00)).unwrap_err();
    assert!(matches!(err, CartridgeError::UnsupportedController(0x13)));
    assert!(err.to_string().contains("0x13"));
}

#[test]
fn unknown_ram_size_is_rejected() {
    let err = Cartridge::from_bytes(header(0x8000, 0x03, 0x05)).unwrap_err();
    assert!(matches!(err, CartridgeError::InvalidRamSize(0x05)));
}

#[test]
fn mbc1_switches_rom_banks() {
    let mut cart = Cartridge::from_bytes(banked_rom(8, 0x00)).unwrap();
    assert_eq!(cart.mbc, MbcType::Mbc1);
    assert_eq!(cart.read(0x4000), Some(1));

    cart.write(0x2000, 0x05);
    assert_eq!(cart.read(0x4000), Some(5));

    // Bank 0 selects bank 1
    cart.write(0x2000, 0x00);
    assert_eq!(cart.read(0x4000), Some(1));

    // Out-of-range banks wrap around the image
    cart.write(0x2000, 0x0B);
    assert_eq!(cart.read(0x4000), Some(3));
    assert_eq!(cart.read(0x0000), Some(0));
}

#[test]
fn mbc1_upper_bits_extend_the_bank() {
    let mut cart = Cartridge::from_bytes(banked_rom(64, 0x00)).unwrap();
    cart.write(0x2000, 0x02);
    cart.write(0x4000, 0x01);
    assert_eq!(cart.read(0x4000), Some(0x22));

    // Advanced mode also applies the upper bits to 0x0000-0x3FFF
    assert_eq!(cart.read(0x0000), Some(0));
    cart.write(0x6000, 0x01);
    assert_eq!(cart.read(0x0000), Some(0x20));
}

#[test]
fn mbc1_ram_needs_enabling() {
    let mut cart = Cartridge::from_bytes(banked_rom(4, 0x03)).unwrap();
    assert_eq!(cart.ram.len(), 0x8000);

    cart.write(0xA000, 0x11);
    assert_eq!(cart.read(0xA000), None);
    assert_eq!(cart.ram[0], 0);

    cart.write(0x0000, 0x0A);
    cart.write(0xA000, 0x11);
    assert_eq!(cart.read(0xA000), Some(0x11));

    // RAM banking only in advanced mode
    cart.write(0x6000, 0x01);
    cart.write(0x4000, 0x02);
    cart.write(0xA000, 0x22);
    assert_eq!(cart.ram[2 * 0x2000], 0x22);
    cart.write(0x6000, 0x00);
    assert_eq!(cart.read(0xA000), Some(0x11));

    cart.write(0x0000, 0x00);
    assert_eq!(cart.read(0xA000), None);
}
