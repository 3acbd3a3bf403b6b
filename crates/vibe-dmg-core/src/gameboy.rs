use std::cell::RefCell;
use std::rc::Rc;

use crate::address_map::{ECHO_RAM, REG_BGP, REG_IF, REG_LCDC, WORK_RAM, WORK_RAM_SIZE};
use crate::bus::{Bus, Slot};
use crate::cartridge::Cartridge;
use crate::cpu::{Cpu, InterruptLine, Reg16};
use crate::image::Image;
use crate::input::{Joypad, Key};
use crate::memory::{BootRomController, Ram, RamController, Rom};
use crate::ppu::Ppu;
use crate::timer::Timer;

/// Machine cycles per second.
pub const CYCLES_PER_SECOND: u64 = 1 << 20;

// Post-boot register state (gbdev.io/pandocs/Power_Up_State.html)
const BOOT_AF: u16 = 0x01B0;
const BOOT_BC: u16 = 0x0013;
const BOOT_DE: u16 = 0x00D8;
const BOOT_HL: u16 = 0x014D;
const BOOT_SP: u16 = 0xFFFE;
const BOOT_PC: u16 = 0x0100;
const BOOT_LCDC: u8 = 0x91;
const BOOT_BGP: u8 = 0xFC;
const BOOT_IF: u8 = 0xE1;
const BOOT_DIV_COUNTER: u16 = 0xABCC;

/// A DMG wired together on one bus.
///
/// Bus attachment order, which is also read priority: boot ROM controller
/// (wrapping the cartridge), work RAM, echo RAM, CPU, timer, joypad, LCD.
pub struct GameBoy {
    boot_rom: BootRomController,
    work_ram: RamController,
    echo_ram: RamController,
    cpu: Cpu,
    timer: Timer,
    joypad: Joypad,
    ppu: Ppu,
    cycles: u64,
}

impl GameBoy {
    /// Machine in the state the boot ROM leaves behind, starting at 0x0100.
    pub fn new(cartridge: Cartridge) -> Self {
        let mut gb = Self::build(cartridge, None);

        gb.cpu.set_reg16(Reg16::AF, BOOT_AF);
        gb.cpu.set_reg16(Reg16::BC, BOOT_BC);
        gb.cpu.set_reg16(Reg16::DE, BOOT_DE);
        gb.cpu.set_reg16(Reg16::HL, BOOT_HL);
        gb.cpu.set_sp(BOOT_SP);
        gb.cpu.set_pc(BOOT_PC);
        gb.timer.div = BOOT_DIV_COUNTER;
        gb.write(REG_LCDC, BOOT_LCDC);
        gb.write(REG_BGP, BOOT_BGP);
        gb.write(REG_IF, BOOT_IF);
        gb
    }

    /// Machine at power-on with `boot_rom` (256 bytes) mapped at 0x0000.
    pub fn new_power_on(cartridge: Cartridge, boot_rom: Vec<u8>) -> Self {
        Self::build(cartridge, Some(Rom::new(boot_rom)))
    }

    fn build(cartridge: Cartridge, boot_rom: Option<Rom>) -> Self {
        let irq = InterruptLine::new();
        let ram = Rc::new(RefCell::new(Ram::new(WORK_RAM_SIZE)));
        Self {
            boot_rom: BootRomController::new(cartridge, boot_rom),
            work_ram: RamController::new(Rc::clone(&ram), WORK_RAM),
            echo_ram: RamController::new(ram, ECHO_RAM),
            cpu: Cpu::new(irq.clone()),
            timer: Timer::new(irq.clone()),
            joypad: Joypad::new(irq.clone()),
            ppu: Ppu::new(irq),
            cycles: 0,
        }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn joypad(&mut self) -> &mut Joypad {
        &mut self.joypad
    }

    pub fn cartridge(&self) -> &Cartridge {
        self.boot_rom.cartridge()
    }

    /// Number of cycles simulated so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn current_image(&self) -> &Image {
        self.ppu.current_image()
    }

    pub fn key_pressed(&mut self, key: Key) {
        self.joypad.key_pressed(key);
    }

    pub fn key_released(&mut self, key: Key) {
        self.joypad.key_released(key);
    }

    /// Simulate every cycle up to, but not including, `target`.
    ///
    /// Panics if `target` is behind the current cycle.
    pub fn run_until(&mut self, target: u64) {
        assert!(
            target >= self.cycles,
            "cannot run back to cycle {target} from {}",
            self.cycles
        );
        while self.cycles < target {
            self.step();
        }
    }

    /// Simulate a single cycle: timer, then LCD, then CPU.
    fn step(&mut self) {
        let cycle = self.cycles;
        self.timer.cycle(cycle);
        {
            let mut slots = [
                Slot::Attached(&mut self.boot_rom),
                Slot::Attached(&mut self.work_ram),
                Slot::Attached(&mut self.echo_ram),
                Slot::Attached(&mut self.cpu),
                Slot::Attached(&mut self.timer),
                Slot::Attached(&mut self.joypad),
                Slot::Caller,
            ];
            self.ppu.cycle(cycle, &mut Bus::new(&mut slots));
        }
        {
            let mut slots = [
                Slot::Attached(&mut self.boot_rom),
                Slot::Attached(&mut self.work_ram),
                Slot::Attached(&mut self.echo_ram),
                Slot::Caller,
                Slot::Attached(&mut self.timer),
                Slot::Attached(&mut self.joypad),
                Slot::Attached(&mut self.ppu),
            ];
            self.cpu.cycle(cycle, &mut Bus::new(&mut slots));
        }
        self.cycles += 1;
    }

    fn with_bus<R>(&mut self, f: impl FnOnce(&mut Bus<'_, '_>) -> R) -> R {
        let mut slots = [
            Slot::Attached(&mut self.boot_rom),
            Slot::Attached(&mut self.work_ram),
            Slot::Attached(&mut self.echo_ram),
            Slot::Attached(&mut self.cpu),
            Slot::Attached(&mut self.timer),
            Slot::Attached(&mut self.joypad),
            Slot::Attached(&mut self.ppu),
        ];
        f(&mut Bus::new(&mut slots))
    }

    /// Bus read as seen from outside the machine.
    pub fn read(&mut self, address: u16) -> u8 {
        self.with_bus(|bus| bus.read(address))
    }

    /// Bus write from outside the machine; every component sees it.
    pub fn write(&mut self, address: u16, data: u8) {
        self.with_bus(|bus| bus.write(address, data));
    }
}
