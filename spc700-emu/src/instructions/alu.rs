//! Arithmetic and logical instruction bodies (ADC/SBC/CMP/AND/OR/EOR, word ops, MUL/DIV,
//! DAA/DAS, XCN). Each function matches the signature expected by the addressing-mode
//! macros in `super` and updates PSW in place.

use super::{impl_memory_to_memory_op, impl_modify_op, impl_read_op, impl_registers_op};
use crate::registers::{Registers, StatusRegister};
use crate::{Bus, Spc700};
use apu_common::num::SignBit;

fn overflow_add(a: u8, b: u8, result: u8) -> bool {
    (a ^ result) & (b ^ result) & 0x80 != 0
}

fn overflow_sub(a: u8, b: u8, result: u8) -> bool {
    (a ^ b) & (a ^ result) & 0x80 != 0
}

pub(crate) fn adc(psw: &mut StatusRegister, a: u8, b: u8) -> u8 {
    let carry_in = u16::from(psw.carry);
    let sum = u16::from(a) + u16::from(b) + carry_in;
    let result = sum as u8;

    psw.half_carry = (a & 0x0F) + (b & 0x0F) + (carry_in as u8) > 0x0F;
    psw.carry = sum > 0xFF;
    psw.overflow = overflow_add(a, b, result);
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

pub(crate) fn sbc(psw: &mut StatusRegister, a: u8, b: u8) -> u8 {
    adc(psw, a, !b)
}

fn cmp(psw: &mut StatusRegister, a: u8, b: u8) -> u8 {
    let (result, borrow) = a.overflowing_sub(b);
    psw.carry = !borrow;
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    a
}

fn and(psw: &mut StatusRegister, a: u8, b: u8) -> u8 {
    let result = a & b;
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

fn or(psw: &mut StatusRegister, a: u8, b: u8) -> u8 {
    let result = a | b;
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

fn eor(psw: &mut StatusRegister, a: u8, b: u8) -> u8 {
    let result = a ^ b;
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

fn inc(psw: &mut StatusRegister, value: u8) -> u8 {
    let result = value.wrapping_add(1);
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

fn dec(psw: &mut StatusRegister, value: u8) -> u8 {
    let result = value.wrapping_sub(1);
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

fn asl(psw: &mut StatusRegister, value: u8) -> u8 {
    psw.carry = value.sign_bit();
    let result = value << 1;
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

fn lsr(psw: &mut StatusRegister, value: u8) -> u8 {
    psw.carry = value & 1 != 0;
    let result = value >> 1;
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

fn rol(psw: &mut StatusRegister, value: u8) -> u8 {
    let carry_in = u8::from(psw.carry);
    psw.carry = value.sign_bit();
    let result = (value << 1) | carry_in;
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

fn ror(psw: &mut StatusRegister, value: u8) -> u8 {
    let carry_in = u8::from(psw.carry);
    psw.carry = value & 1 != 0;
    let result = (value >> 1) | (carry_in << 7);
    psw.negative = result.sign_bit();
    psw.zero = result == 0;
    result
}

impl_read_op!(
    [
        immediate -> adc_a_imm,
        x_indirect -> adc_a_x_indirect,
        direct_page -> adc_a_dp,
        direct_page_x -> adc_a_dp_x,
        absolute -> adc_a_abs,
        absolute_x -> adc_a_abs_x,
        absolute_y -> adc_a_abs_y,
        indirect_x -> adc_a_dp_x_indirect,
        indirect_y -> adc_a_dp_indirect_y,
    ]
    (|regs: &mut Registers, value: u8| {
        regs.a = adc(&mut regs.psw, regs.a, value);
    })
);

impl_read_op!(
    [
        immediate -> sbc_a_imm,
        x_indirect -> sbc_a_x_indirect,
        direct_page -> sbc_a_dp,
        direct_page_x -> sbc_a_dp_x,
        absolute -> sbc_a_abs,
        absolute_x -> sbc_a_abs_x,
        absolute_y -> sbc_a_abs_y,
        indirect_x -> sbc_a_dp_x_indirect,
        indirect_y -> sbc_a_dp_indirect_y,
    ]
    (|regs: &mut Registers, value: u8| {
        regs.a = sbc(&mut regs.psw, regs.a, value);
    })
);

impl_read_op!(
    [
        immediate -> cmp_a_imm,
        x_indirect -> cmp_a_x_indirect,
        direct_page -> cmp_a_dp,
        direct_page_x -> cmp_a_dp_x,
        absolute -> cmp_a_abs,
        absolute_x -> cmp_a_abs_x,
        absolute_y -> cmp_a_abs_y,
        indirect_x -> cmp_a_dp_x_indirect,
        indirect_y -> cmp_a_dp_indirect_y,
    ]
    (|regs: &mut Registers, value: u8| {
        cmp(&mut regs.psw, regs.a, value);
    })
);

impl_read_op!([immediate -> cmp_x_imm, direct_page -> cmp_x_dp, absolute -> cmp_x_abs]
    (|regs: &mut Registers, value: u8| { cmp(&mut regs.psw, regs.x, value); }));

impl_read_op!([immediate -> cmp_y_imm, direct_page -> cmp_y_dp, absolute -> cmp_y_abs]
    (|regs: &mut Registers, value: u8| { cmp(&mut regs.psw, regs.y, value); }));

impl_read_op!(
    [
        immediate -> and_a_imm,
        x_indirect -> and_a_x_indirect,
        direct_page -> and_a_dp,
        direct_page_x -> and_a_dp_x,
        absolute -> and_a_abs,
        absolute_x -> and_a_abs_x,
        absolute_y -> and_a_abs_y,
        indirect_x -> and_a_dp_x_indirect,
        indirect_y -> and_a_dp_indirect_y,
    ]
    (|regs: &mut Registers, value: u8| { regs.a = and(&mut regs.psw, regs.a, value); })
);

impl_read_op!(
    [
        immediate -> or_a_imm,
        x_indirect -> or_a_x_indirect,
        direct_page -> or_a_dp,
        direct_page_x -> or_a_dp_x,
        absolute -> or_a_abs,
        absolute_x -> or_a_abs_x,
        absolute_y -> or_a_abs_y,
        indirect_x -> or_a_dp_x_indirect,
        indirect_y -> or_a_dp_indirect_y,
    ]
    (|regs: &mut Registers, value: u8| { regs.a = or(&mut regs.psw, regs.a, value); })
);

impl_read_op!(
    [
        immediate -> eor_a_imm,
        x_indirect -> eor_a_x_indirect,
        direct_page -> eor_a_dp,
        direct_page_x -> eor_a_dp_x,
        absolute -> eor_a_abs,
        absolute_x -> eor_a_abs_x,
        absolute_y -> eor_a_abs_y,
        indirect_x -> eor_a_dp_x_indirect,
        indirect_y -> eor_a_dp_indirect_y,
    ]
    (|regs: &mut Registers, value: u8| { regs.a = eor(&mut regs.psw, regs.a, value); })
);

impl_modify_op!([accumulator -> inc_a, direct_page -> inc_dp, direct_page_x -> inc_dp_x, absolute -> inc_abs]
    (|regs: &mut Registers, value: u8| inc(&mut regs.psw, value)));

impl_modify_op!([accumulator -> dec_a, direct_page -> dec_dp, direct_page_x -> dec_dp_x, absolute -> dec_abs]
    (|regs: &mut Registers, value: u8| dec(&mut regs.psw, value)));

impl_modify_op!([accumulator -> asl_a, direct_page -> asl_dp, direct_page_x -> asl_dp_x, absolute -> asl_abs]
    (|regs: &mut Registers, value: u8| asl(&mut regs.psw, value)));

impl_modify_op!([accumulator -> lsr_a, direct_page -> lsr_dp, direct_page_x -> lsr_dp_x, absolute -> lsr_abs]
    (|regs: &mut Registers, value: u8| lsr(&mut regs.psw, value)));

impl_modify_op!([accumulator -> rol_a, direct_page -> rol_dp, direct_page_x -> rol_dp_x, absolute -> rol_abs]
    (|regs: &mut Registers, value: u8| rol(&mut regs.psw, value)));

impl_modify_op!([accumulator -> ror_a, direct_page -> ror_dp, direct_page_x -> ror_dp_x, absolute -> ror_abs]
    (|regs: &mut Registers, value: u8| ror(&mut regs.psw, value)));

impl_memory_to_memory_op!(
    [x_y -> adc_x_y, dp_dp -> adc_dp_dp, dp_imm -> adc_dp_imm]
    (|regs: &mut Registers, l: u8, r: u8| adc(&mut regs.psw, l, r))
);
impl_memory_to_memory_op!(
    [x_y -> sbc_x_y, dp_dp -> sbc_dp_dp, dp_imm -> sbc_dp_imm]
    (|regs: &mut Registers, l: u8, r: u8| sbc(&mut regs.psw, l, r))
);
impl_memory_to_memory_op!(
    [x_y_no_write -> cmp_x_y, dp_dp_no_write -> cmp_dp_dp, dp_imm_no_write -> cmp_dp_imm]
    (|regs: &mut Registers, l: u8, r: u8| { cmp(&mut regs.psw, l, r) })
);
impl_memory_to_memory_op!(
    [x_y -> and_x_y, dp_dp -> and_dp_dp, dp_imm -> and_dp_imm]
    (|regs: &mut Registers, l: u8, r: u8| and(&mut regs.psw, l, r))
);
impl_memory_to_memory_op!(
    [x_y -> or_x_y, dp_dp -> or_dp_dp, dp_imm -> or_dp_imm]
    (|regs: &mut Registers, l: u8, r: u8| or(&mut regs.psw, l, r))
);
impl_memory_to_memory_op!(
    [x_y -> eor_x_y, dp_dp -> eor_dp_dp, dp_imm -> eor_dp_imm]
    (|regs: &mut Registers, l: u8, r: u8| eor(&mut regs.psw, l, r))
);

impl_registers_op!(inc_x, |regs: &mut Registers| {
    regs.x = regs.x.wrapping_add(1);
    regs.update_nz(regs.x);
});
impl_registers_op!(dec_x, |regs: &mut Registers| {
    regs.x = regs.x.wrapping_sub(1);
    regs.update_nz(regs.x);
});
impl_registers_op!(inc_y, |regs: &mut Registers| {
    regs.y = regs.y.wrapping_add(1);
    regs.update_nz(regs.y);
});
impl_registers_op!(dec_y, |regs: &mut Registers| {
    regs.y = regs.y.wrapping_sub(1);
    regs.update_nz(regs.y);
});

/// `XCN A`: rotate the accumulator's nibbles.
impl_registers_op!(xcn, |regs: &mut Registers| {
    regs.a = regs.a.rotate_left(4);
    regs.update_nz(regs.a);
});

pub(crate) fn addw<B: Bus>(cpu: &mut Spc700, bus: &mut B) {
    let dp = super::fetch_operand(cpu, bus);
    let address = super::dp_address(cpu, dp);
    let lo = bus.read(address);
    let hi = bus.read(address.wrapping_add(1) & 0x00FF | (address & 0xFF00));
    let operand = u16::from_le_bytes([lo, hi]);

    let ya = cpu.registers.ya();
    let sum = u32::from(ya) + u32::from(operand);
    let result = sum as u16;

    let psw = &mut cpu.registers.psw;
    psw.half_carry = (ya & 0x0FFF) + (operand & 0x0FFF) > 0x0FFF;
    psw.carry = sum > 0xFFFF;
    psw.overflow = (ya ^ result) & (operand ^ result) & 0x8000 != 0;
    cpu.registers.set_ya(result);
    cpu.registers.psw.negative = result & 0x8000 != 0;
    cpu.registers.psw.zero = result == 0;
}

pub(crate) fn subw<B: Bus>(cpu: &mut Spc700, bus: &mut B) {
    let dp = super::fetch_operand(cpu, bus);
    let address = super::dp_address(cpu, dp);
    let lo = bus.read(address);
    let hi = bus.read(address.wrapping_add(1) & 0x00FF | (address & 0xFF00));
    let operand = u16::from_le_bytes([lo, hi]);

    let ya = cpu.registers.ya();
    let (result, borrow) = ya.overflowing_sub(operand);

    let psw = &mut cpu.registers.psw;
    psw.half_carry = (ya & 0x0FFF) >= (operand & 0x0FFF);
    psw.carry = !borrow;
    psw.overflow = (ya ^ operand) & (ya ^ result) & 0x8000 != 0;
    cpu.registers.set_ya(result);
    cpu.registers.psw.negative = result & 0x8000 != 0;
    cpu.registers.psw.zero = result == 0;
}

pub(crate) fn cmpw<B: Bus>(cpu: &mut Spc700, bus: &mut B) {
    let dp = super::fetch_operand(cpu, bus);
    let address = super::dp_address(cpu, dp);
    let lo = bus.read(address);
    let hi = bus.read(address.wrapping_add(1) & 0x00FF | (address & 0xFF00));
    let operand = u16::from_le_bytes([lo, hi]);

    let ya = cpu.registers.ya();
    let (result, borrow) = ya.overflowing_sub(operand);
    cpu.registers.psw.carry = !borrow;
    cpu.registers.psw.negative = result & 0x8000 != 0;
    cpu.registers.psw.zero = result == 0;
}

fn word_dp_address<B: Bus>(cpu: &mut Spc700, bus: &mut B) -> u16 {
    let dp = super::fetch_operand(cpu, bus);
    super::dp_address(cpu, dp)
}

pub(crate) fn incw<B: Bus>(cpu: &mut Spc700, bus: &mut B) {
    let address = word_dp_address(cpu, bus);
    let lo = bus.read(address);
    let hi = bus.read(address.wrapping_add(1) & 0x00FF | (address & 0xFF00));
    let value = u16::from_le_bytes([lo, hi]).wrapping_add(1);
    bus.write(address, value.lsb_byte());
    bus.write(address.wrapping_add(1) & 0x00FF | (address & 0xFF00), value.msb_byte());
    cpu.registers.psw.negative = value & 0x8000 != 0;
    cpu.registers.psw.zero = value == 0;
}

pub(crate) fn decw<B: Bus>(cpu: &mut Spc700, bus: &mut B) {
    let address = word_dp_address(cpu, bus);
    let lo = bus.read(address);
    let hi = bus.read(address.wrapping_add(1) & 0x00FF | (address & 0xFF00));
    let value = u16::from_le_bytes([lo, hi]).wrapping_sub(1);
    bus.write(address, value.lsb_byte());
    bus.write(address.wrapping_add(1) & 0x00FF | (address & 0xFF00), value.msb_byte());
    cpu.registers.psw.negative = value & 0x8000 != 0;
    cpu.registers.psw.zero = value == 0;
}

trait WordBytes {
    fn lsb_byte(self) -> u8;
    fn msb_byte(self) -> u8;
}

impl WordBytes for u16 {
    fn lsb_byte(self) -> u8 {
        self as u8
    }
    fn msb_byte(self) -> u8 {
        (self >> 8) as u8
    }
}

/// `MUL YA`: Y*A -> YA, unsigned 8x8->16. Flags reflect Y only.
impl_registers_op!(mul, |regs: &mut Registers| {
    let product = u16::from(regs.y) * u16::from(regs.a);
    regs.set_ya(product);
    regs.psw.negative = regs.y.sign_bit();
    regs.psw.zero = regs.y == 0;
});

/// `DIV YA,X`: hardware-exact algorithm. Division by zero is special-cased per the
/// documented real-hardware result (A <- !Y, Y unchanged); the X != 0 path reproduces
/// the 9-bit aliased quotient/remainder hardware produces once Y >= 2*X.
impl_registers_op!(div, |regs: &mut Registers| {
    let ya = regs.ya();
    let y = regs.y;
    let x = regs.x;

    regs.psw.half_carry = regs.a >= x;

    if x == 0 {
        regs.a = !y;
        regs.psw.overflow = true;
    } else {
        // The true quotient YA/X exceeds 8 bits exactly when Y >= X; the hardware
        // still produces a (possibly aliased) 8-bit result in that case rather than
        // failing, so V is independent of which formula below computes it.
        regs.psw.overflow = u16::from(y) >= u16::from(x);

        if u16::from(y) < u16::from(x) * 2 {
            regs.a = (ya / u16::from(x)) as u8;
            regs.y = (ya % u16::from(x)) as u8;
        } else {
            let x16 = u16::from(x);
            let adjusted = ya.wrapping_sub(x16 << 9);
            let divisor = 256 - x16;
            regs.a = (255u16.wrapping_sub(adjusted / divisor)) as u8;
            regs.y = (x16 + adjusted % divisor) as u8;
        }
    }

    regs.psw.negative = regs.a.sign_bit();
    regs.psw.zero = regs.a == 0;
});

/// `DAA`: BCD-correct the accumulator after an addition.
impl_registers_op!(daa, |regs: &mut Registers| {
    let mut a = regs.a;
    if regs.psw.carry || a > 0x99 {
        a = a.wrapping_add(0x60);
        regs.psw.carry = true;
    }
    if regs.psw.half_carry || (a & 0x0F) > 0x09 {
        a = a.wrapping_add(0x06);
    }
    regs.a = a;
    regs.psw.negative = a.sign_bit();
    regs.psw.zero = a == 0;
});

/// `DAS`: BCD-correct the accumulator after a subtraction.
impl_registers_op!(das, |regs: &mut Registers| {
    let mut a = regs.a;
    if !regs.psw.carry || a > 0x99 {
        a = a.wrapping_sub(0x60);
        regs.psw.carry = false;
    }
    if !regs.psw.half_carry || (a & 0x0F) > 0x09 {
        a = a.wrapping_sub(0x06);
    }
    regs.a = a;
    regs.psw.negative = a.sign_bit();
    regs.psw.zero = a == 0;
});
