//! Flag-update helpers shared by the ALU and bit-test instruction bodies.

use crate::registers::Registers;
use apu_common::num::SignBit;

pub(crate) fn set_nz(psw: &mut crate::registers::StatusRegister, value: u8) {
    psw.negative = value.sign_bit();
    psw.zero = value == 0;
}

pub(crate) fn set_nz16(psw: &mut crate::registers::StatusRegister, value: u16) {
    psw.negative = value & 0x8000 != 0;
    psw.zero = value == 0;
}

impl Registers {
    pub(crate) fn update_nz(&mut self, value: u8) -> u8 {
        set_nz(&mut self.psw, value);
        value
    }

    pub(crate) fn update_nz16(&mut self, value: u16) -> u16 {
        set_nz16(&mut self.psw, value);
        value
    }
}
