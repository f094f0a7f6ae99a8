//! The three hardware timers. Each is a two-stage divider: an instruction-cycle
//! prescaler feeds an internal phase counter, which wraps every `target` phase
//! ticks and bumps a visible, host-readable counter.
//!
//! `MCLK_DIVIDER` is the number of `tick` cycles per phase tick; `COUNTER_MASK`
//! bounds the visible counter's width (`0x0F` for the two 4-bit timers, `0xFF`
//! for the 8-bit one).

use bincode::{Decode, Encode};

#[derive(Debug, Clone, Encode, Decode)]
pub struct Timer<const MCLK_DIVIDER: u16, const COUNTER_MASK: u8> {
    enabled: bool,
    /// 0 is the hardware sentinel for 256.
    target: u8,
    prescaler: u32,
    phase: u16,
    counter: u8,
}

impl<const MCLK_DIVIDER: u16, const COUNTER_MASK: u8> Timer<MCLK_DIVIDER, COUNTER_MASK> {
    pub fn new() -> Self {
        Self { enabled: false, target: 0, prescaler: 0, phase: 0, counter: 0 }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_target(&mut self, target: u8) {
        self.target = target;
    }

    pub fn target(&self) -> u8 {
        self.target
    }

    fn target_period(&self) -> u16 {
        if self.target == 0 { 256 } else { u16::from(self.target) }
    }

    /// The visible counter value. Reading never clears it; only `clear_counter`
    /// (driven by a host write to the counter register) does.
    pub fn read_counter(&self) -> u8 {
        self.counter
    }

    pub fn clear_counter(&mut self) {
        self.counter = 0;
    }

    /// Advances the timer by `cycles` instruction cycles, returning the number of
    /// times the visible counter incremented (and wrapped) during this call. `cycles`
    /// may span many instructions at once (the sleeping/stopped fast-forward path in
    /// [`crate::Apu::step`] ticks a whole remaining budget in one call).
    pub fn tick(&mut self, cycles: u32) -> u32 {
        if !self.enabled {
            return 0;
        }

        let mut increments = 0;
        self.prescaler += cycles;
        while self.prescaler >= u32::from(MCLK_DIVIDER) {
            self.prescaler -= u32::from(MCLK_DIVIDER);
            self.phase += 1;
            if self.phase >= self.target_period() {
                self.phase = 0;
                self.counter = self.counter.wrapping_add(1) & COUNTER_MASK;
                increments += 1;
            }
        }
        increments
    }
}

impl<const MCLK_DIVIDER: u16, const COUNTER_MASK: u8> Default for Timer<MCLK_DIVIDER, COUNTER_MASK> {
    fn default() -> Self {
        Self::new()
    }
}

/// Timers 0 and 1: 4-bit visible counters, divide-by-128 prescaler.
pub type SlowTimer = Timer<128, 0x0F>;

/// Timer 2: 8-bit visible counter, divide-by-32 prescaler.
pub type FastTimer = Timer<32, 0xFF>;
