//! The 256-entry opcode dispatch table and its matching cycle-cost table.
//!
//! Every opcode is implemented — the SPC700 has no illegal/undefined opcodes the way
//! a 6502 does — but `dispatch` still returns a `Result` so a genuinely unreachable
//! match arm (a bug, not a hardware condition) surfaces as `Spc700Error` rather than
//! panicking a host emulator mid-frame.

use crate::instructions::{alu, bits, control, load};
use crate::{Bus, Spc700, Spc700Error};

/// Dispatches one opcode and returns the number of cycles it consumed, including the
/// extra two cycles a taken branch costs over a not-taken one.
pub(crate) fn dispatch<B: Bus>(
    cpu: &mut Spc700,
    bus: &mut B,
    opcode: u8,
) -> Result<u8, Spc700Error> {
    let cycles = match opcode {
        0x00 => {
            control::nop(cpu);
            2
        }
        0x01 => {
            control::tcall::<0, B>(cpu, bus);
            8
        }
        0x02 => {
            bits::set1_dp::<0, B>(cpu, bus);
            4
        }
        0x03 => branch_cycles(control::bbs::<0, B>(cpu, bus), 5),
        0x04 => {
            alu::or_a_dp(cpu, bus);
            3
        }
        0x05 => {
            alu::or_a_abs(cpu, bus);
            4
        }
        0x06 => {
            alu::or_a_x_indirect(cpu, bus);
            3
        }
        0x07 => {
            alu::or_a_dp_x_indirect(cpu, bus);
            6
        }
        0x08 => {
            alu::or_a_imm(cpu, bus);
            2
        }
        0x09 => {
            alu::or_dp_dp(cpu, bus);
            6
        }
        0x0A => {
            bits::or1(cpu, bus);
            5
        }
        0x0B => {
            alu::asl_dp(cpu, bus);
            4
        }
        0x0C => {
            alu::asl_abs(cpu, bus);
            5
        }
        0x0D => {
            load::push_psw(cpu, bus);
            4
        }
        0x0E => {
            bits::tset1(cpu, bus);
            6
        }
        0x0F => {
            control::brk(cpu, bus);
            8
        }
        0x10 => branch_cycles(control::bpl(cpu, bus), 2),
        0x11 => {
            control::tcall::<1, B>(cpu, bus);
            8
        }
        0x12 => {
            bits::clr1_dp::<0, B>(cpu, bus);
            4
        }
        0x13 => branch_cycles(control::bbc::<0, B>(cpu, bus), 5),
        0x14 => {
            alu::or_a_dp_x(cpu, bus);
            4
        }
        0x15 => {
            alu::or_a_abs_x(cpu, bus);
            5
        }
        0x16 => {
            alu::or_a_abs_y(cpu, bus);
            5
        }
        0x17 => {
            alu::or_a_dp_indirect_y(cpu, bus);
            6
        }
        0x18 => {
            alu::or_dp_imm(cpu, bus);
            5
        }
        0x19 => {
            alu::or_x_y(cpu, bus);
            5
        }
        0x1A => {
            alu::decw(cpu, bus);
            6
        }
        0x1B => {
            alu::asl_dp_x(cpu, bus);
            5
        }
        0x1C => {
            alu::asl_a(cpu, bus);
            2
        }
        0x1D => {
            alu::dec_x(cpu);
            2
        }
        0x1E => {
            alu::cmp_x_abs(cpu, bus);
            4
        }
        0x1F => {
            control::jmp_abs_x_indirect(cpu, bus);
            6
        }
        0x20 => {
            bits::clrp(cpu);
            2
        }
        0x21 => {
            control::tcall::<2, B>(cpu, bus);
            8
        }
        0x22 => {
            bits::set1_dp::<1, B>(cpu, bus);
            4
        }
        0x23 => branch_cycles(control::bbs::<1, B>(cpu, bus), 5),
        0x24 => {
            alu::and_a_dp(cpu, bus);
            3
        }
        0x25 => {
            alu::and_a_abs(cpu, bus);
            4
        }
        0x26 => {
            alu::and_a_x_indirect(cpu, bus);
            3
        }
        0x27 => {
            alu::and_a_dp_x_indirect(cpu, bus);
            6
        }
        0x28 => {
            alu::and_a_imm(cpu, bus);
            2
        }
        0x29 => {
            alu::and_dp_dp(cpu, bus);
            6
        }
        0x2A => {
            bits::or1_not(cpu, bus);
            5
        }
        0x2B => {
            alu::rol_dp(cpu, bus);
            4
        }
        0x2C => {
            alu::rol_abs(cpu, bus);
            5
        }
        0x2D => {
            load::push_a(cpu, bus);
            4
        }
        0x2E => branch_cycles(control::cbne_dp(cpu, bus), 5),
        0x2F => {
            control::bra(cpu, bus);
            4
        }
        0x30 => branch_cycles(control::bmi(cpu, bus), 2),
        0x31 => {
            control::tcall::<3, B>(cpu, bus);
            8
        }
        0x32 => {
            bits::clr1_dp::<1, B>(cpu, bus);
            4
        }
        0x33 => branch_cycles(control::bbc::<1, B>(cpu, bus), 5),
        0x34 => {
            alu::and_a_dp_x(cpu, bus);
            4
        }
        0x35 => {
            alu::and_a_abs_x(cpu, bus);
            5
        }
        0x36 => {
            alu::and_a_abs_y(cpu, bus);
            5
        }
        0x37 => {
            alu::and_a_dp_indirect_y(cpu, bus);
            6
        }
        0x38 => {
            alu::and_dp_imm(cpu, bus);
            5
        }
        0x39 => {
            alu::and_x_y(cpu, bus);
            5
        }
        0x3A => {
            alu::incw(cpu, bus);
            6
        }
        0x3B => {
            alu::rol_dp_x(cpu, bus);
            5
        }
        0x3C => {
            alu::rol_a(cpu, bus);
            2
        }
        0x3D => {
            alu::inc_x(cpu);
            2
        }
        0x3E => {
            alu::cmp_x_dp(cpu, bus);
            3
        }
        0x3F => {
            control::call(cpu, bus);
            8
        }
        0x40 => {
            bits::setp(cpu);
            2
        }
        0x41 => {
            control::tcall::<4, B>(cpu, bus);
            8
        }
        0x42 => {
            bits::set1_dp::<2, B>(cpu, bus);
            4
        }
        0x43 => branch_cycles(control::bbs::<2, B>(cpu, bus), 5),
        0x44 => {
            alu::eor_a_dp(cpu, bus);
            3
        }
        0x45 => {
            alu::eor_a_abs(cpu, bus);
            4
        }
        0x46 => {
            alu::eor_a_x_indirect(cpu, bus);
            3
        }
        0x47 => {
            alu::eor_a_dp_x_indirect(cpu, bus);
            6
        }
        0x48 => {
            alu::eor_a_imm(cpu, bus);
            2
        }
        0x49 => {
            alu::eor_dp_dp(cpu, bus);
            6
        }
        0x4A => {
            bits::and1(cpu, bus);
            4
        }
        0x4B => {
            alu::lsr_dp(cpu, bus);
            4
        }
        0x4C => {
            alu::lsr_abs(cpu, bus);
            5
        }
        0x4D => {
            load::push_x(cpu, bus);
            4
        }
        0x4E => {
            bits::tclr1(cpu, bus);
            6
        }
        0x4F => {
            control::pcall(cpu, bus);
            6
        }
        0x50 => branch_cycles(control::bvc(cpu, bus), 2),
        0x51 => {
            control::tcall::<5, B>(cpu, bus);
            8
        }
        0x52 => {
            bits::clr1_dp::<2, B>(cpu, bus);
            4
        }
        0x53 => branch_cycles(control::bbc::<2, B>(cpu, bus), 5),
        0x54 => {
            alu::eor_a_dp_x(cpu, bus);
            4
        }
        0x55 => {
            alu::eor_a_abs_x(cpu, bus);
            5
        }
        0x56 => {
            alu::eor_a_abs_y(cpu, bus);
            5
        }
        0x57 => {
            alu::eor_a_dp_indirect_y(cpu, bus);
            6
        }
        0x58 => {
            alu::eor_dp_imm(cpu, bus);
            5
        }
        0x59 => {
            alu::eor_x_y(cpu, bus);
            5
        }
        0x5A => {
            alu::cmpw(cpu, bus);
            4
        }
        0x5B => {
            alu::lsr_dp_x(cpu, bus);
            5
        }
        0x5C => {
            alu::lsr_a(cpu, bus);
            2
        }
        0x5D => {
            load::mov_x_a(cpu);
            2
        }
        0x5E => {
            alu::cmp_y_abs(cpu, bus);
            4
        }
        0x5F => {
            control::jmp_abs(cpu, bus);
            3
        }
        0x60 => {
            bits::clrc(cpu);
            2
        }
        0x61 => {
            control::tcall::<6, B>(cpu, bus);
            8
        }
        0x62 => {
            bits::set1_dp::<3, B>(cpu, bus);
            4
        }
        0x63 => branch_cycles(control::bbs::<3, B>(cpu, bus), 5),
        0x64 => {
            alu::cmp_a_dp(cpu, bus);
            3
        }
        0x65 => {
            alu::cmp_a_abs(cpu, bus);
            4
        }
        0x66 => {
            alu::cmp_a_x_indirect(cpu, bus);
            3
        }
        0x67 => {
            alu::cmp_a_dp_x_indirect(cpu, bus);
            6
        }
        0x68 => {
            alu::cmp_a_imm(cpu, bus);
            2
        }
        0x69 => {
            alu::cmp_dp_dp(cpu, bus);
            6
        }
        0x6A => {
            bits::and1_not(cpu, bus);
            4
        }
        0x6B => {
            alu::ror_dp(cpu, bus);
            4
        }
        0x6C => {
            alu::ror_abs(cpu, bus);
            5
        }
        0x6D => {
            load::push_y(cpu, bus);
            4
        }
        0x6E => branch_cycles(control::dbnz_dp(cpu, bus), 6),
        0x6F => {
            control::ret(cpu, bus);
            5
        }
        0x70 => branch_cycles(control::bvs(cpu, bus), 2),
        0x71 => {
            control::tcall::<7, B>(cpu, bus);
            8
        }
        0x72 => {
            bits::clr1_dp::<3, B>(cpu, bus);
            4
        }
        0x73 => branch_cycles(control::bbc::<3, B>(cpu, bus), 5),
        0x74 => {
            alu::cmp_a_dp_x(cpu, bus);
            4
        }
        0x75 => {
            alu::cmp_a_abs_x(cpu, bus);
            5
        }
        0x76 => {
            alu::cmp_a_abs_y(cpu, bus);
            5
        }
        0x77 => {
            alu::cmp_a_dp_indirect_y(cpu, bus);
            6
        }
        0x78 => {
            alu::cmp_dp_imm(cpu, bus);
            5
        }
        0x79 => {
            alu::cmp_x_y(cpu, bus);
            5
        }
        0x7A => {
            alu::addw(cpu, bus);
            5
        }
        0x7B => {
            alu::ror_dp_x(cpu, bus);
            5
        }
        0x7C => {
            alu::ror_a(cpu, bus);
            2
        }
        0x7D => {
            load::mov_a_x(cpu);
            2
        }
        0x7E => {
            alu::cmp_y_dp(cpu, bus);
            3
        }
        0x7F => {
            control::reti(cpu, bus);
            6
        }
        0x80 => {
            bits::setc(cpu);
            2
        }
        0x81 => {
            control::tcall::<8, B>(cpu, bus);
            8
        }
        0x82 => {
            bits::set1_dp::<4, B>(cpu, bus);
            4
        }
        0x83 => branch_cycles(control::bbs::<4, B>(cpu, bus), 5),
        0x84 => {
            alu::adc_a_dp(cpu, bus);
            3
        }
        0x85 => {
            alu::adc_a_abs(cpu, bus);
            4
        }
        0x86 => {
            alu::adc_a_x_indirect(cpu, bus);
            3
        }
        0x87 => {
            alu::adc_a_dp_x_indirect(cpu, bus);
            6
        }
        0x88 => {
            alu::adc_a_imm(cpu, bus);
            2
        }
        0x89 => {
            alu::adc_dp_dp(cpu, bus);
            6
        }
        0x8A => {
            bits::eor1(cpu, bus);
            5
        }
        0x8B => {
            alu::dec_dp(cpu, bus);
            4
        }
        0x8C => {
            alu::dec_abs(cpu, bus);
            5
        }
        0x8D => {
            load::mov_y_imm(cpu, bus);
            2
        }
        0x8E => {
            load::pop_psw(cpu, bus);
            4
        }
        0x8F => {
            load::mov_dp_imm(cpu, bus);
            5
        }
        0x90 => branch_cycles(control::bcc(cpu, bus), 2),
        0x91 => {
            control::tcall::<9, B>(cpu, bus);
            8
        }
        0x92 => {
            bits::clr1_dp::<4, B>(cpu, bus);
            4
        }
        0x93 => branch_cycles(control::bbc::<4, B>(cpu, bus), 5),
        0x94 => {
            alu::adc_a_dp_x(cpu, bus);
            4
        }
        0x95 => {
            alu::adc_a_abs_x(cpu, bus);
            5
        }
        0x96 => {
            alu::adc_a_abs_y(cpu, bus);
            5
        }
        0x97 => {
            alu::adc_a_dp_indirect_y(cpu, bus);
            6
        }
        0x98 => {
            alu::adc_dp_imm(cpu, bus);
            5
        }
        0x99 => {
            alu::adc_x_y(cpu, bus);
            5
        }
        0x9A => {
            alu::subw(cpu, bus);
            5
        }
        0x9B => {
            alu::dec_dp_x(cpu, bus);
            5
        }
        0x9C => {
            alu::dec_a(cpu, bus);
            2
        }
        0x9D => {
            load::mov_x_sp(cpu);
            2
        }
        0x9E => {
            alu::div(cpu);
            12
        }
        0x9F => {
            alu::xcn(cpu);
            5
        }
        0xA0 => {
            bits::ei(cpu);
            3
        }
        0xA1 => {
            control::tcall::<10, B>(cpu, bus);
            8
        }
        0xA2 => {
            bits::set1_dp::<5, B>(cpu, bus);
            4
        }
        0xA3 => branch_cycles(control::bbs::<5, B>(cpu, bus), 5),
        0xA4 => {
            alu::sbc_a_dp(cpu, bus);
            3
        }
        0xA5 => {
            alu::sbc_a_abs(cpu, bus);
            4
        }
        0xA6 => {
            alu::sbc_a_x_indirect(cpu, bus);
            3
        }
        0xA7 => {
            alu::sbc_a_dp_x_indirect(cpu, bus);
            6
        }
        0xA8 => {
            alu::sbc_a_imm(cpu, bus);
            2
        }
        0xA9 => {
            alu::sbc_dp_dp(cpu, bus);
            6
        }
        0xAA => {
            bits::mov1_load(cpu, bus);
            4
        }
        0xAB => {
            alu::inc_dp(cpu, bus);
            4
        }
        0xAC => {
            alu::inc_abs(cpu, bus);
            5
        }
        0xAD => {
            alu::cmp_y_imm(cpu, bus);
            2
        }
        0xAE => {
            load::pop_a(cpu, bus);
            4
        }
        0xAF => {
            load::mov_x_indirect_postinc_a(cpu, bus);
            4
        }
        0xB0 => branch_cycles(control::bcs(cpu, bus), 2),
        0xB1 => {
            control::tcall::<11, B>(cpu, bus);
            8
        }
        0xB2 => {
            bits::clr1_dp::<5, B>(cpu, bus);
            4
        }
        0xB3 => branch_cycles(control::bbc::<5, B>(cpu, bus), 5),
        0xB4 => {
            alu::sbc_a_dp_x(cpu, bus);
            4
        }
        0xB5 => {
            alu::sbc_a_abs_x(cpu, bus);
            5
        }
        0xB6 => {
            alu::sbc_a_abs_y(cpu, bus);
            5
        }
        0xB7 => {
            alu::sbc_a_dp_indirect_y(cpu, bus);
            6
        }
        0xB8 => {
            alu::sbc_dp_imm(cpu, bus);
            5
        }
        0xB9 => {
            alu::sbc_x_y(cpu, bus);
            5
        }
        0xBA => {
            load::movw_ya_dp(cpu, bus);
            5
        }
        0xBB => {
            alu::inc_dp_x(cpu, bus);
            5
        }
        0xBC => {
            alu::inc_a(cpu, bus);
            2
        }
        0xBD => {
            load::mov_sp_x(cpu);
            2
        }
        0xBE => {
            alu::das(cpu);
            3
        }
        0xBF => {
            load::mov_a_x_indirect_postinc_read(cpu, bus);
            4
        }
        0xC0 => {
            bits::di(cpu);
            3
        }
        0xC1 => {
            control::tcall::<12, B>(cpu, bus);
            8
        }
        0xC2 => {
            bits::set1_dp::<6, B>(cpu, bus);
            4
        }
        0xC3 => branch_cycles(control::bbs::<6, B>(cpu, bus), 5),
        0xC4 => {
            load::mov_dp_a(cpu, bus);
            4
        }
        0xC5 => {
            load::mov_abs_a(cpu, bus);
            5
        }
        0xC6 => {
            load::mov_x_indirect_a(cpu, bus);
            4
        }
        0xC7 => {
            load::mov_dp_x_indirect_a(cpu, bus);
            7
        }
        0xC8 => {
            alu::cmp_x_imm(cpu, bus);
            2
        }
        0xC9 => {
            load::mov_abs_x(cpu, bus);
            5
        }
        0xCA => {
            bits::mov1_store(cpu, bus);
            6
        }
        0xCB => {
            load::mov_dp_y(cpu, bus);
            4
        }
        0xCC => {
            load::mov_abs_y(cpu, bus);
            5
        }
        0xCD => {
            load::mov_x_imm(cpu, bus);
            2
        }
        0xCE => {
            load::pop_x(cpu, bus);
            4
        }
        0xCF => {
            alu::mul(cpu);
            9
        }
        0xD0 => branch_cycles(control::bne(cpu, bus), 2),
        0xD1 => {
            control::tcall::<13, B>(cpu, bus);
            8
        }
        0xD2 => {
            bits::clr1_dp::<6, B>(cpu, bus);
            4
        }
        0xD3 => branch_cycles(control::bbc::<6, B>(cpu, bus), 5),
        0xD4 => {
            load::mov_dp_x_a(cpu, bus);
            5
        }
        0xD5 => {
            load::mov_abs_x_a(cpu, bus);
            6
        }
        0xD6 => {
            load::mov_abs_y_a(cpu, bus);
            6
        }
        0xD7 => {
            load::mov_dp_indirect_y_a(cpu, bus);
            7
        }
        0xD8 => {
            load::mov_dp_x(cpu, bus);
            4
        }
        0xD9 => {
            load::mov_dp_y_x(cpu, bus);
            5
        }
        0xDA => {
            load::movw_dp_ya(cpu, bus);
            5
        }
        0xDB => {
            load::mov_dp_x_y(cpu, bus);
            5
        }
        0xDC => {
            alu::dec_y(cpu);
            2
        }
        0xDD => {
            load::mov_a_y(cpu);
            2
        }
        0xDE => branch_cycles(control::cbne_dp_x(cpu, bus), 6),
        0xDF => {
            alu::daa(cpu);
            3
        }
        0xE0 => {
            bits::clrv(cpu);
            2
        }
        0xE1 => {
            control::tcall::<14, B>(cpu, bus);
            8
        }
        0xE2 => {
            bits::set1_dp::<7, B>(cpu, bus);
            4
        }
        0xE3 => branch_cycles(control::bbs::<7, B>(cpu, bus), 5),
        0xE4 => {
            load::mov_a_dp(cpu, bus);
            3
        }
        0xE5 => {
            load::mov_a_abs(cpu, bus);
            4
        }
        0xE6 => {
            load::mov_a_x_indirect(cpu, bus);
            3
        }
        0xE7 => {
            load::mov_a_dp_x_indirect(cpu, bus);
            6
        }
        0xE8 => {
            load::mov_a_imm(cpu, bus);
            2
        }
        0xE9 => {
            load::mov_x_abs(cpu, bus);
            4
        }
        0xEA => {
            bits::not1(cpu, bus);
            5
        }
        0xEB => {
            load::mov_y_dp(cpu, bus);
            3
        }
        0xEC => {
            load::mov_y_abs(cpu, bus);
            4
        }
        0xED => {
            bits::notc(cpu);
            3
        }
        0xEE => {
            load::pop_y(cpu, bus);
            4
        }
        0xEF => {
            control::sleep(cpu);
            3
        }
        0xF0 => branch_cycles(control::beq(cpu, bus), 2),
        0xF1 => {
            control::tcall::<15, B>(cpu, bus);
            8
        }
        0xF2 => {
            bits::clr1_dp::<7, B>(cpu, bus);
            4
        }
        0xF3 => branch_cycles(control::bbc::<7, B>(cpu, bus), 5),
        0xF4 => {
            load::mov_a_dp_x(cpu, bus);
            4
        }
        0xF5 => {
            load::mov_a_abs_x(cpu, bus);
            5
        }
        0xF6 => {
            load::mov_a_abs_y(cpu, bus);
            5
        }
        0xF7 => {
            load::mov_a_dp_indirect_y(cpu, bus);
            6
        }
        0xF8 => {
            load::mov_x_dp(cpu, bus);
            3
        }
        0xF9 => {
            load::mov_x_dp_y(cpu, bus);
            4
        }
        0xFA => {
            load::mov_dp_dp(cpu, bus);
            5
        }
        0xFB => {
            load::mov_y_dp_x(cpu, bus);
            4
        }
        0xFC => {
            alu::inc_y(cpu);
            2
        }
        0xFD => {
            load::mov_y_a(cpu);
            2
        }
        0xFE => branch_cycles(control::dbnz_y(cpu, bus), 4),
        0xFF => {
            control::stop(cpu);
            3
        }
    };

    Ok(cycles)
}

fn branch_cycles(taken: bool, not_taken_cost: u8) -> u8 {
    if taken {
        not_taken_cost + 2
    } else {
        not_taken_cost
    }
}
