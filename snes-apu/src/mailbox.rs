//! The four-byte bidirectional mailbox at ARAM addresses $00F4-$00F7.
//!
//! The two directions use separate storage so that a host-side write and an
//! APU-side write to the same slot never tear into each other.

use bincode::{Decode, Encode};

const SLOT_COUNT: usize = 4;

#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct Mailbox {
    /// Host -> APU. Written by `cpu_write_port`, read by the SPC700 via the $F4-$F7
    /// I/O window.
    host_to_apu: [u8; SLOT_COUNT],
    /// APU -> host. Written by the SPC700 via the $F4-$F7 I/O window, read by
    /// `cpu_read_port`.
    apu_to_host: [u8; SLOT_COUNT],
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.host_to_apu = [0; SLOT_COUNT];
        self.apu_to_host = [0; SLOT_COUNT];
    }

    /// Host writes slot `i`. Visible to the APU side immediately.
    pub fn cpu_write_port(&mut self, slot: usize, value: u8) {
        self.host_to_apu[slot] = value;
    }

    /// Host reads slot `i`. Sees the APU's most recent write.
    pub fn cpu_read_port(&self, slot: usize) -> u8 {
        self.apu_to_host[slot]
    }

    /// APU-side read of slot `i`, through the $F4-$F7 I/O window.
    pub fn apu_read(&self, slot: usize) -> u8 {
        self.host_to_apu[slot]
    }

    /// APU-side write of slot `i`, through the $F4-$F7 I/O window.
    pub fn apu_write(&mut self, slot: usize, value: u8) {
        self.apu_to_host[slot] = value;
    }
}
