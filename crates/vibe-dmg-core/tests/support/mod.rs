#![allow(dead_code)]

use vibe_dmg_core::cartridge::Cartridge;
use vibe_dmg_core::gameboy::GameBoy;

/// Post-boot entry point, where test programs are placed.
pub const ENTRY: u16 = 0x0100;

/// A 32 KiB ROM-only image with `program` at the entry point.
pub fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    let start = usize::from(ENTRY);
    rom[start..start + program.len()].copy_from_slice(program);
    rom
}

/// Machine in post-boot state running `program`.
pub fn machine(program: &[u8]) -> GameBoy {
    let cart = Cartridge::from_bytes(rom_with_program(program)).unwrap();
    GameBoy::new(cart)
}

/// Run until the CPU has executed exactly one more instruction (or
/// serviced one interrupt).
pub fn step(gb: &mut GameBoy) {
    let due = gb.cpu().next_non_idle_cycle();
    assert_ne!(due, u64::MAX, "CPU is idle at PC={:#06X}", gb.cpu().pc());
    gb.run_until(due + 1);
}

pub fn steps(gb: &mut GameBoy, n: usize) {
    for _ in 0..n {
        step(gb);
    }
}
