//! The SNES audio processing unit: an SPC700 core, an S-DSP mixing engine, three
//! timers, a four-byte mailbox, and 64 KiB of shared audio RAM, bound together behind
//! a `step`/`mix_sample` interface.
//!
//! A host drives two independent loops against [`Apu`]: [`Apu::step`] advances the
//! SPC700 and timers by a cycle budget, and [`Apu::mix_sample`] pulls one stereo frame
//! out of the DSP. The two are typically interleaved at roughly 32 cycles per sample
//! (`OUTPUT_FREQUENCY` below), but nothing requires that ratio to be exact.

pub mod aram;
pub mod bootrom;
pub mod dsp;
pub mod mailbox;
pub mod timer;

use crate::aram::Aram;
use crate::dsp::{DebugControls, Dsp, InterpolationMode};
use crate::mailbox::Mailbox;
use crate::timer::{FastTimer, SlowTimer};
use apu_common::num::{GetBit, U16Ext};
use bincode::{Decode, Encode};
use spc700_emu::{Bus, Spc700};

/// Nominal output sample rate of the real chip; hosts are free to resample.
pub const OUTPUT_FREQUENCY: u32 = 32_000;

const IRQ_VECTOR: u16 = 0xFFDE;

/// Host-facing configuration toggles (spec section 6).
#[derive(Debug, Clone, Encode, Decode)]
pub struct ApuConfig {
    pub ipl_rom_overlay_enabled: bool,
    pub boot_ipl_hle_enabled: bool,
    pub null_vector_irq_hle_enabled: bool,
    pub timer_irq_injection_enabled: bool,
    pub low_power_disabled: bool,
    pub mix_gain: f32,
    pub interpolation: InterpolationMode,
    pub debug: DebugControls,
}

impl Default for ApuConfig {
    fn default() -> Self {
        Self {
            ipl_rom_overlay_enabled: true,
            boot_ipl_hle_enabled: false,
            null_vector_irq_hle_enabled: false,
            timer_irq_injection_enabled: true,
            low_power_disabled: false,
            mix_gain: 1.0,
            interpolation: InterpolationMode::default(),
            debug: DebugControls::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
enum BootHlePhase {
    #[default]
    Idle,
    AwaitAddrLo,
    AwaitAddrHi,
    Streaming,
}

/// Host-side IPL upload shortcut (spec 4.5). Entirely independent of whatever the
/// SPC700 is actually executing; a host that enables this can push a program straight
/// into ARAM through the mailbox without waiting on the real IPL ROM handshake.
#[derive(Debug, Clone, Default, Encode, Decode)]
struct BootHleState {
    phase: BootHlePhase,
    dest_addr: u16,
    busy_read_toggle: bool,
}

#[derive(Debug, Clone, Default, Encode, Decode)]
struct IoRegisters {
    test: u8,
}

struct ApuBus<'a> {
    aram: &'a mut Aram,
    dsp: &'a mut Dsp,
    mailbox: &'a mut Mailbox,
    timer0: &'a mut SlowTimer,
    timer1: &'a mut SlowTimer,
    timer2: &'a mut FastTimer,
    io: &'a mut IoRegisters,
}

impl ApuBus<'_> {
    fn read_io(&mut self, register: u16) -> u8 {
        match register {
            0x0 => self.io.test,
            0x1 => {
                u8::from(self.timer0.enabled())
                    | (u8::from(self.timer1.enabled()) << 1)
                    | (u8::from(self.timer2.enabled()) << 2)
            }
            0x2 => self.dsp.read_addr(),
            0x3 => self.dsp.read_register_with_side_effects(),
            0x4 => self.mailbox.apu_read(0),
            0x5 => self.mailbox.apu_read(1),
            0x6 => self.mailbox.apu_read(2),
            0x7 => self.mailbox.apu_read(3),
            0x8 | 0x9 => 0,
            0xA => self.timer0.target(),
            0xB => self.timer1.target(),
            0xC => self.timer2.target(),
            0xD => self.timer0.read_counter(),
            0xE => self.timer1.read_counter(),
            0xF => self.timer2.read_counter(),
            _ => unreachable!("register masked to 4 bits"),
        }
    }

    fn write_io(&mut self, register: u16, value: u8) {
        match register {
            0x0 => self.io.test = value,
            0x1 => {
                self.timer0.set_enabled(value.bit(0));
                self.timer1.set_enabled(value.bit(1));
                self.timer2.set_enabled(value.bit(2));
                if value.bit(4) {
                    self.timer0.clear_counter();
                }
                if value.bit(5) {
                    self.timer1.clear_counter();
                }
                if value.bit(6) {
                    self.timer2.clear_counter();
                }
            }
            0x2 => self.dsp.write_addr(value),
            0x3 => self.dsp.write_data(value),
            0x4 => self.mailbox.apu_write(0, value),
            0x5 => self.mailbox.apu_write(1, value),
            0x6 => self.mailbox.apu_write(2, value),
            0x7 => self.mailbox.apu_write(3, value),
            0x8 | 0x9 => {}
            0xA => self.timer0.set_target(value),
            0xB => self.timer1.set_target(value),
            0xC => self.timer2.set_target(value),
            0xD => self.timer0.clear_counter(),
            0xE => self.timer1.clear_counter(),
            0xF => self.timer2.clear_counter(),
            _ => unreachable!("register masked to 4 bits"),
        }
    }
}

impl Bus for ApuBus<'_> {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            0x00F0..=0x00FF => self.read_io(address & 0xF),
            _ => self.aram.read(address),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            // Per spec, I/O register writes never reach the backing ARAM byte.
            0x00F0..=0x00FF => self.write_io(address & 0xF, value),
            _ => self.aram.write(address, value),
        }
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Apu {
    spc700: Spc700,
    dsp: Dsp,
    aram: Aram,
    mailbox: Mailbox,
    timer0: SlowTimer,
    timer1: SlowTimer,
    timer2: FastTimer,
    io: IoRegisters,
    config: ApuConfig,
    boot_hle: BootHleState,
}

macro_rules! new_bus {
    ($self:expr) => {
        ApuBus {
            aram: &mut $self.aram,
            dsp: &mut $self.dsp,
            mailbox: &mut $self.mailbox,
            timer0: &mut $self.timer0,
            timer1: &mut $self.timer1,
            timer2: &mut $self.timer2,
            io: &mut $self.io,
        }
    };
}

impl Apu {
    #[must_use]
    pub fn new(config: ApuConfig) -> Self {
        let mut apu = Self {
            spc700: Spc700::new(),
            dsp: Dsp::new(),
            aram: Aram::new(),
            mailbox: Mailbox::new(),
            timer0: SlowTimer::new(),
            timer1: SlowTimer::new(),
            timer2: FastTimer::new(),
            io: IoRegisters::default(),
            config,
            boot_hle: BootHleState::default(),
        };
        apu.apply_config();
        apu.spc700.reset(&mut new_bus!(apu));
        apu
    }

    fn apply_config(&mut self) {
        self.aram.set_boot_rom_mapped(self.config.ipl_rom_overlay_enabled);
        self.spc700.null_vector_hle = self.config.null_vector_irq_hle_enabled;
        self.spc700.low_power_disabled = self.config.low_power_disabled;
        self.dsp.set_interpolation(self.config.interpolation);
        self.dsp.set_debug_controls(self.config.debug);
        self.dsp.set_mix_gain(self.config.mix_gain);
    }

    pub fn set_config(&mut self, config: ApuConfig) {
        self.config = config;
        self.apply_config();
    }

    pub fn config(&self) -> &ApuConfig {
        &self.config
    }

    pub fn enable_instruction_ring(&mut self, enabled: bool) {
        self.spc700.enable_instruction_ring(enabled);
    }

    pub fn take_instruction_ring(&mut self) -> Vec<(u16, u8)> {
        self.spc700.take_instruction_ring()
    }

    /// Advances the APU by `cycles` synthetic CPU cycles. Honors the ordering in spec
    /// section 5: per instruction, CPU effects land first, then the timers tick by
    /// that instruction's cost, then wake/IRQ are resolved.
    pub fn step(&mut self, mut cycles: u32) {
        while cycles > 0 {
            if self.spc700.is_stopped() || self.spc700.is_sleeping() {
                self.tick_timers(cycles);
                cycles = 0;
                continue;
            }

            let consumed = self
                .spc700
                .step_instruction(&mut new_bus!(self))
                .unwrap_or_else(|err| {
                    log::error!("SPC700 core error: {err}");
                    2
                });
            let consumed = consumed.max(2);
            let consumed = u32::from(consumed).min(cycles);
            cycles -= consumed;

            self.tick_timers(consumed);
        }
    }

    fn tick_timers(&mut self, cycles: u32) {
        let t0 = self.timer0.tick(cycles);
        let t1 = self.timer1.tick(cycles);
        let t2 = self.timer2.tick(cycles);

        if t0 > 0 || t1 > 0 || t2 > 0 {
            self.spc700.wake_from_mailbox_write();
            if self.config.timer_irq_injection_enabled {
                self.spc700.request_irq(IRQ_VECTOR);
            }
        }
    }

    /// Pulls one stereo PCM frame from the DSP. Independent of `step`; a typical host
    /// calls this once per output sample at roughly `OUTPUT_FREQUENCY` Hz.
    #[must_use]
    pub fn mix_sample(&mut self) -> (i16, i16) {
        self.dsp.clock(&mut self.aram)
    }

    /// Zeroes ARAM and register state, restores the IPL overlay, and loads PC from
    /// the reset vector (through the mapped bus, so the overlay is honored).
    pub fn reset(&mut self) {
        self.aram.reset();
        self.mailbox.reset();
        self.timer0 = SlowTimer::new();
        self.timer1 = SlowTimer::new();
        self.timer2 = FastTimer::new();
        self.io = IoRegisters::default();
        self.dsp.reset();
        self.boot_hle = BootHleState::default();

        self.apply_config();
        self.spc700.reset(&mut new_bus!(self));
    }

    /// Host write to mailbox slot `port` ($F4+port on the APU side). Wakes the SPC700
    /// from SLEEP; when boot IPL HLE is active it is intercepted instead of reaching
    /// the ordinary mailbox storage.
    pub fn cpu_write_port(&mut self, port: usize, value: u8) {
        if self.config.boot_ipl_hle_enabled && self.handle_boot_hle_write(port, value) {
            return;
        }

        self.mailbox.cpu_write_port(port, value);
        self.spc700.wake_from_mailbox_write();
    }

    /// Host read of mailbox slot `port`. Slot 0 toggles bit 7 on every read while a
    /// boot IPL HLE upload is in progress, mimicking the real chip's busy signal.
    #[must_use]
    pub fn cpu_read_port(&mut self, port: usize) -> u8 {
        if port == 0 && self.boot_hle.phase != BootHlePhase::Idle {
            self.boot_hle.busy_read_toggle = !self.boot_hle.busy_read_toggle;
            return u8::from(self.boot_hle.busy_read_toggle) << 7;
        }
        self.mailbox.cpu_read_port(port)
    }

    fn handle_boot_hle_write(&mut self, port: usize, value: u8) -> bool {
        match (port, self.boot_hle.phase) {
            (0, BootHlePhase::Idle) if value == 0xCC => {
                self.boot_hle.phase = BootHlePhase::AwaitAddrLo;
                true
            }
            (0, _) if value == 0x00 => {
                self.boot_hle.phase = BootHlePhase::Idle;
                true
            }
            (1, BootHlePhase::AwaitAddrLo) => {
                self.boot_hle.dest_addr.set_lsb(value);
                self.boot_hle.phase = BootHlePhase::AwaitAddrHi;
                true
            }
            (1, BootHlePhase::AwaitAddrHi) => {
                self.boot_hle.dest_addr.set_msb(value);
                self.boot_hle.phase = BootHlePhase::Streaming;
                true
            }
            (1, BootHlePhase::Streaming) => {
                self.aram.poke(self.boot_hle.dest_addr, value);
                self.boot_hle.dest_addr = self.boot_hle.dest_addr.wrapping_add(1);
                true
            }
            _ => false,
        }
    }

    pub fn aram(&self) -> &Aram {
        &self.aram
    }

    pub fn aram_mut(&mut self) -> &mut Aram {
        &mut self.aram
    }

    pub fn dsp_mut(&mut self) -> &mut Dsp {
        &mut self.dsp
    }

    pub fn spc700_registers(&self) -> spc700_emu::registers::Registers {
        self.spc700.registers
    }

    pub fn spc700_mut(&mut self) -> &mut Spc700 {
        &mut self.spc700
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apu_step_reads_and_writes_through_aram_bus() {
        let mut config = ApuConfig::default();
        config.ipl_rom_overlay_enabled = false;
        let mut apu = Apu::new(config);

        // MOV A,#$42 ; MOV $10,A
        apu.aram_mut().poke(0x0200, 0xE8);
        apu.aram_mut().poke(0x0201, 0x42);
        apu.aram_mut().poke(0x0202, 0xC4);
        apu.aram_mut().poke(0x0203, 0x10);
        apu.spc700_mut().registers.pc = 0x0200;

        apu.step(2);
        apu.step(4);

        assert_eq!(apu.spc700_registers().a, 0x42);
        assert_eq!(apu.aram().read(0x0010), 0x42);
    }

    #[test]
    fn control_register_enable_and_clear_pulse_route_to_timers() {
        let mut aram = Aram::new();
        let mut dsp = Dsp::new();
        let mut mailbox = Mailbox::new();
        let mut timer0 = SlowTimer::new();
        let mut timer1 = SlowTimer::new();
        let mut timer2 = FastTimer::new();
        let mut io = IoRegisters::default();

        {
            let mut bus = ApuBus {
                aram: &mut aram,
                dsp: &mut dsp,
                mailbox: &mut mailbox,
                timer0: &mut timer0,
                timer1: &mut timer1,
                timer2: &mut timer2,
                io: &mut io,
            };
            bus.write(0x00F1, 0x01);
            bus.write(0x00FA, 0x02);
        }
        assert!(timer0.enabled());
        assert_eq!(timer0.target(), 2);

        let increments = timer0.tick(1000);
        assert!(increments >= 1);
        assert!(timer0.read_counter() >= 1);

        {
            let mut bus = ApuBus {
                aram: &mut aram,
                dsp: &mut dsp,
                mailbox: &mut mailbox,
                timer0: &mut timer0,
                timer1: &mut timer1,
                timer2: &mut timer2,
                io: &mut io,
            };
            bus.write(0x00F1, 0x10);
        }
        assert_eq!(timer0.read_counter(), 0);
    }

    #[test]
    fn ipl_rom_writes_handshake_bytes_into_mailbox() {
        let apu_config = ApuConfig::default();
        assert!(apu_config.ipl_rom_overlay_enabled);
        let mut apu = Apu::new(apu_config);

        // The real IPL ROM zeroes its stack page before the handshake writes, so give
        // it a generous cycle budget; the bytes it's after land in mailbox slots 0/1
        // (MOV $F4,#$AA / MOV $F5,#$BB) near the very start of the routine.
        apu.step(4000);

        assert_eq!(apu.cpu_read_port(0), 0xAA);
        assert_eq!(apu.cpu_read_port(1), 0xBB);
    }

    #[test]
    fn brr_one_shot_voice_produces_nonzero_output() {
        let mut apu = Apu::new(ApuConfig::default());

        apu.dsp_mut().write_addr(0x5D);
        apu.dsp_mut().write_data(0x01); // DIR base = $0100

        {
            let aram = apu.aram_mut();
            // Directory entry 0: start = $0200, loop = $0200.
            aram.poke(0x0100, 0x00);
            aram.poke(0x0101, 0x02);
            aram.poke(0x0102, 0x00);
            aram.poke(0x0103, 0x02);

            // One BRR block: range 8, filter 0, END set, LOOP clear.
            aram.poke(0x0200, 0x81);
            aram.poke(0x0201, 0x12);
            aram.poke(0x0202, 0x34);
            aram.poke(0x0203, 0x56);
            aram.poke(0x0204, 0x78);
            aram.poke(0x0205, 0x9A);
            aram.poke(0x0206, 0xBC);
            aram.poke(0x0207, 0xDE);
            aram.poke(0x0208, 0xF0);
        }

        // Clear mute/soft-reset and re-enable echo writes.
        apu.dsp_mut().write_addr(0x6C);
        apu.dsp_mut().write_data(0x00);

        apu.dsp_mut().write_addr(0x0C);
        apu.dsp_mut().write_data(0x7F);
        apu.dsp_mut().write_addr(0x1C);
        apu.dsp_mut().write_data(0x7F);

        // Voice 0: volume, pitch, source 0, full direct gain.
        apu.dsp_mut().write_addr(0x00);
        apu.dsp_mut().write_data(0x64);
        apu.dsp_mut().write_addr(0x01);
        apu.dsp_mut().write_data(0x64);
        apu.dsp_mut().write_addr(0x02);
        apu.dsp_mut().write_data(0x00);
        apu.dsp_mut().write_addr(0x03);
        apu.dsp_mut().write_data(0x10);
        apu.dsp_mut().write_addr(0x04);
        apu.dsp_mut().write_data(0x00);
        apu.dsp_mut().write_addr(0x07);
        apu.dsp_mut().write_data(0x7F);

        apu.dsp_mut().write_addr(0x4C);
        apu.dsp_mut().write_data(0x01); // KON voice 0

        let mut heard_sound = false;
        for _ in 0..100 {
            let (l, r) = apu.mix_sample();
            if l != 0 || r != 0 {
                heard_sound = true;
                break;
            }
        }
        assert!(heard_sound);
    }
}
