//! Cycle-accurate DMG (original Game Boy) emulation core.
//!
//! This crate contains the platform-agnostic machine: CPU, timer, LCD
//! controller and the bus connecting them. Frontends drive it through the
//! [`gameboy`] facade and read finished frames as 2-bit color indices.

/// Fixed addresses, memory windows and vector tables.
pub mod address_map;

/// Flag-producing arithmetic used by the CPU.
pub mod alu;

/// Fixed-width bit strings backing the scanline planes.
pub mod bit_vector;

/// Component trait and the ordered bus that routes reads and writes.
pub mod bus;

/// Cartridge mappers (no MBC, MBC1) and header parsing.
pub mod cartridge;

/// LR35902 CPU core and interrupt controller.
pub mod cpu;

/// High-level facade that wires every component into a single machine.
pub mod gameboy;

/// Scanlines and frames as bit planes.
pub mod image;

/// Joypad input register and edge-triggered interrupt behavior.
pub mod input;

/// RAM/ROM blocks and the controllers mapping them on the bus.
pub mod memory;

/// Instruction descriptors for both opcode pages.
pub mod opcode;

/// LCD controller: mode sequencing, OAM DMA and line compositing.
pub mod ppu;

/// Named byte registers with bit access.
pub mod register_file;

/// Divider/timer unit.
pub mod timer;
