mod support;

use support::{ENTRY, machine, step, steps};
use vibe_dmg_core::address_map::{REG_IE, REG_IF};
use vibe_dmg_core::alu::Flag;
use vibe_dmg_core::cpu::{Reg, Reg16};

#[test]
fn increment_wraps_and_keeps_carry() {
    let mut gb = machine(&[0x3C]); // INC A
    gb.cpu_mut().set_reg(Reg::A, 0xFF);
    gb.cpu_mut().set_reg(Reg::F, 0x10);
    step(&mut gb);
    assert_eq!(gb.cpu().reg(Reg::A), 0x00);
    assert_eq!(gb.cpu().reg(Reg::F), 0xB0);
    assert_eq!(gb.cpu().pc(), ENTRY + 1);
}

#[test]
fn add_sets_half_carry() {
    let mut gb = machine(&[0x80]); // ADD A,B
    gb.cpu_mut().set_reg(Reg::A, 0x0F);
    gb.cpu_mut().set_reg(Reg::B, 0x01);
    gb.cpu_mut().set_reg(Reg::F, 0x00);
    step(&mut gb);
    assert_eq!(gb.cpu().reg(Reg::A), 0x10);
    assert_eq!(gb.cpu().reg(Reg::F), 0x20);
}

#[test]
fn decimal_adjust_after_immediate_add() {
    let mut gb = machine(&[0xC6, 0x27, 0x27]); // ADD A,0x27; DAA
    gb.cpu_mut().set_reg(Reg::A, 0x15);
    steps(&mut gb, 2);
    assert_eq!(gb.cpu().reg(Reg::A), 0x42);
    assert!(!gb.cpu().flag(Flag::C));
    assert!(!gb.cpu().flag(Flag::H));
}

#[test]
fn pop_af_drops_low_flag_bits() {
    let mut gb = machine(&[0xC5, 0xF1]); // PUSH BC; POP AF
    gb.cpu_mut().set_reg16(Reg16::BC, 0x12FF);
    steps(&mut gb, 2);
    assert_eq!(gb.cpu().reg16(Reg16::AF), 0x12F0);
    assert_eq!(gb.cpu().sp(), 0xFFFE);
}

#[test]
fn store_with_post_increment() {
    let mut gb = machine(&[0x22, 0x32]); // LD (HL+),A; LD (HL-),A
    gb.cpu_mut().set_reg16(Reg16::HL, 0xC000);
    gb.cpu_mut().set_reg(Reg::A, 0x5A);
    step(&mut gb);
    assert_eq!(gb.read(0xC000), 0x5A);
    assert_eq!(gb.cpu().reg16(Reg16::HL), 0xC001);
    step(&mut gb);
    assert_eq!(gb.read(0xC001), 0x5A);
    assert_eq!(gb.cpu().reg16(Reg16::HL), 0xC000);
}

#[test]
fn high_page_loads() {
    // LDH (0x80),A; LD C,0x81; LD (C),A; LDH A,(0x81)
    let mut gb = machine(&[0xE0, 0x80, 0x0E, 0x81, 0xE2, 0xF0, 0x81]);
    gb.cpu_mut().set_reg(Reg::A, 0x77);
    steps(&mut gb, 3);
    assert_eq!(gb.read(0xFF80), 0x77);
    assert_eq!(gb.read(0xFF81), 0x77);
    gb.cpu_mut().set_reg(Reg::A, 0);
    step(&mut gb);
    assert_eq!(gb.cpu().reg(Reg::A), 0x77);
}

#[test]
fn signed_stack_offsets_use_low_byte_carries() {
    let mut gb = machine(&[0xE8, 0xFF, 0xF8, 0x02]); // ADD SP,-1; LD HL,SP+2
    gb.cpu_mut().set_sp(0xFFFE);
    step(&mut gb);
    assert_eq!(gb.cpu().sp(), 0xFFFD);
    assert_eq!(gb.cpu().reg(Reg::F), 0x30);

    gb.cpu_mut().set_sp(0xFFFE);
    step(&mut gb);
    assert_eq!(gb.cpu().reg16(Reg16::HL), 0x0000);
    assert_eq!(gb.cpu().reg(Reg::F), 0x30);
}

#[test]
fn call_and_return() {
    let mut program = vec![0u8; 0x20];
    program[..3].copy_from_slice(&[0xCD, 0x10, 0x01]); // CALL 0x0110
    program[0x10] = 0xC9; // RET
    let mut gb = machine(&program);

    step(&mut gb);
    assert_eq!(gb.cpu().pc(), 0x0110);
    assert_eq!(gb.cpu().sp(), 0xFFFC);
    assert_eq!(gb.read(0xFFFC), 0x03);
    assert_eq!(gb.read(0xFFFD), 0x01);
    assert_eq!(gb.cpu().next_non_idle_cycle(), 6);

    step(&mut gb);
    assert_eq!(gb.cpu().pc(), 0x0103);
    assert_eq!(gb.cpu().sp(), 0xFFFE);
    assert_eq!(gb.cpu().next_non_idle_cycle(), 10);
}

#[test]
fn conditional_jump_costs_extra_when_taken() {
    // JR NZ,+2 twice: first with Z set (not taken), then with Z clear
    let mut gb = machine(&[0x20, 0x02, 0x20, 0x02]);
    gb.cpu_mut().set_reg(Reg::F, 0x80);
    step(&mut gb);
    assert_eq!(gb.cpu().pc(), ENTRY + 2);
    assert_eq!(gb.cpu().next_non_idle_cycle(), 2);

    gb.cpu_mut().set_reg(Reg::F, 0x00);
    step(&mut gb);
    assert_eq!(gb.cpu().pc(), ENTRY + 6);
    assert_eq!(gb.cpu().next_non_idle_cycle(), 5);
}

#[test]
fn relative_jump_backwards() {
    let mut gb = machine(&[0x00, 0x18, 0xFD]); // NOP; JR -3
    steps(&mut gb, 2);
    assert_eq!(gb.cpu().pc(), ENTRY);
}

#[test]
fn prefixed_bit_operations() {
    // BIT 7,H; SET 0,(HL); SWAP A
    let mut gb = machine(&[0xCB, 0x7C, 0xCB, 0xC6, 0xCB, 0x37]);
    gb.cpu_mut().set_reg16(Reg16::HL, 0xC080);
    gb.cpu_mut().set_reg(Reg::F, 0x10);
    step(&mut gb);
    // H is 0xC0, so bit 7 is set and Z stays clear
    assert_eq!(gb.cpu().reg(Reg::F), 0x30);

    step(&mut gb);
    assert_eq!(gb.read(0xC080), 0x01);

    gb.cpu_mut().set_reg(Reg::A, 0xF1);
    step(&mut gb);
    assert_eq!(gb.cpu().reg(Reg::A), 0x1F);
    assert_eq!(gb.cpu().reg(Reg::F), 0x00);
}

#[test]
fn halt_wakes_on_pending_interrupt_without_ime() {
    let mut gb = machine(&[0x76, 0x3C]); // HALT; INC A
    gb.write(REG_IE, 0x04);
    gb.write(REG_IF, 0x00);
    let a = gb.cpu().reg(Reg::A);

    step(&mut gb);
    assert!(gb.cpu().halted());
    assert_eq!(gb.cpu().next_non_idle_cycle(), u64::MAX);

    let later = gb.cycles() + 100;
    gb.run_until(later);
    assert!(gb.cpu().halted());
    assert_eq!(gb.cpu().reg(Reg::A), a);

    gb.write(REG_IF, 0x04);
    let later = gb.cycles() + 1;
    gb.run_until(later);
    assert!(!gb.cpu().halted());
    assert_eq!(gb.cpu().reg(Reg::A), a.wrapping_add(1));
    assert_eq!(gb.cpu().pc(), ENTRY + 2);
}

#[test]
fn interrupt_is_serviced_after_ei() {
    let mut gb = machine(&[0xFB, 0x00, 0x00]); // EI; NOP; NOP
    gb.write(REG_IE, 0x04);
    step(&mut gb);
    assert!(gb.cpu().ime());

    gb.write(REG_IF, 0xE4);
    step(&mut gb);
    assert_eq!(gb.cpu().pc(), 0x0050);
    assert!(!gb.cpu().ime());
    assert_eq!(gb.cpu().sp(), 0xFFFC);
    assert_eq!(gb.read(0xFFFC), 0x01);
    assert_eq!(gb.read(0xFFFD), 0x01);
    assert_eq!(gb.read(REG_IF), 0xE0);
    assert_eq!(gb.cpu().next_non_idle_cycle(), 6);
}

#[test]
fn lowest_pending_interrupt_wins() {
    let mut gb = machine(&[0x00]);
    gb.cpu_mut().set_ime(true);
    gb.write(REG_IE, 0x1F);
    gb.write(REG_IF, 0x14);
    step(&mut gb);
    assert_eq!(gb.cpu().pc(), 0x0050);
    assert_eq!(gb.read(REG_IF), 0x10);
}

#[test]
fn reti_reenables_interrupts() {
    let mut program = vec![0u8; 8];
    program[..3].copy_from_slice(&[0xCD, 0x04, 0x01]); // CALL 0x0104
    program[4] = 0xD9; // RETI
    let mut gb = machine(&program);
    steps(&mut gb, 2);
    assert!(gb.cpu().ime());
    assert_eq!(gb.cpu().pc(), 0x0103);
}

#[test]
fn illegal_opcode_locks_the_cpu() {
    let mut gb = machine(&[0xD3]);
    step(&mut gb);
    assert!(gb.cpu().locked());
    assert!(!gb.cpu().halted());
    assert_eq!(gb.cpu().pc(), ENTRY);

    gb.cpu_mut().set_ime(true);
    gb.write(REG_IE, 0x1F);
    gb.write(REG_IF, 0x1F);
    let later = gb.cycles() + 1000;
    gb.run_until(later);
    assert!(gb.cpu().locked());
    assert_eq!(gb.cpu().pc(), ENTRY);
}

#[test]
#[should_panic(expected = "STOP")]
fn stop_is_not_supported() {
    let mut gb = machine(&[0x10, 0x00]);
    step(&mut gb);
}
