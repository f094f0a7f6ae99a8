//! The S-DSP: eight BRR-sample voices, a noise generator, and an 8-tap echo filter,
//! all driven from the same 32 kHz sample clock.
//!
//! Register access goes through a 7-bit address latch (`write_addr`/`read_addr`) and a
//! data port (`write_data`/`read_data`), matching the real chip's $F2/$F3 interface;
//! [`crate::Apu`] forwards its $00F2/$00F3 I/O window straight through to these.

pub mod interpolate;
mod tables;

use crate::aram::Aram;
use apu_common::num::{GetBit, U16Ext};
use bincode::{Decode, Encode};
use interpolate::InterpolateArgs;
use std::array;

const BRR_BLOCK_LEN: u16 = 9;
const BRR_BUFFER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum InterpolationMode {
    #[default]
    Gaussian,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
enum EnvelopeMode {
    Adsr,
    #[default]
    Gain,
}

impl EnvelopeMode {
    fn from_bit(bit: bool) -> Self {
        if bit { Self::Adsr } else { Self::Gain }
    }

    fn to_bit(self) -> bool {
        self == Self::Adsr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
enum GainMode {
    #[default]
    Direct,
    Custom,
}

impl GainMode {
    fn from_bit(bit: bool) -> Self {
        if bit { Self::Custom } else { Self::Direct }
    }

    fn to_bit(self) -> bool {
        self == Self::Custom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
enum EnvelopePhase {
    Attack,
    Decay,
    Sustain,
    #[default]
    Release,
}

/// Holds the most recently decoded BRR samples for a voice. A fixed ring with a
/// separately advancing read cursor so the four-tap interpolator can index
/// `buffer[sample_idx..sample_idx+4]` without ever copying.
#[derive(Debug, Clone, Default, Encode, Decode)]
struct BrrRingBuffer {
    buffer: [i16; BRR_BUFFER_LEN],
    fill_idx: usize,
    sample_idx: usize,
}

impl BrrRingBuffer {
    fn reset(&mut self) {
        self.fill_idx = 0;
        self.sample_idx = 0;
    }

    fn write(&mut self, sample: i16) {
        self.buffer[self.fill_idx] = sample;
        self.fill_idx = (self.fill_idx + 1) % BRR_BUFFER_LEN;
    }

    fn shift_sample_idx(&mut self) {
        self.sample_idx = (self.sample_idx + 4) % BRR_BUFFER_LEN;
    }

    fn last_two_written_samples(&self) -> (i16, i16) {
        match self.fill_idx {
            0 => (self.buffer[BRR_BUFFER_LEN - 2], self.buffer[BRR_BUFFER_LEN - 1]),
            1 => (self.buffer[BRR_BUFFER_LEN - 1], self.buffer[0]),
            n => (self.buffer[n - 2], self.buffer[n - 1]),
        }
    }

    fn tap(&self, offset: u16) -> i16 {
        self.buffer[(self.sample_idx + offset as usize) % BRR_BUFFER_LEN]
    }
}

fn apply_brr_shift(nibble: i8, range: u8) -> i16 {
    match range {
        0 => (nibble >> 1).into(),
        1..=12 => i16::from(nibble) << (range - 1),
        // Out-of-range headers saturate to +/-2048 on real hardware rather than
        // shifting further.
        13..=15 => {
            if nibble < 0 {
                -2048
            } else {
                0
            }
        }
        _ => unreachable!("range is masked to 4 bits"),
    }
}

fn apply_brr_filter(sample: i16, filter: u8, old: i16, older: i16) -> i16 {
    let sample: i32 = sample.into();
    let old: i32 = old.into();
    let older: i32 = older.into();

    let filtered = match filter {
        0 => sample,
        1 => sample + old + (-old >> 4),
        2 => sample + (old << 1) + (-(3 * old) >> 5) - older + (older >> 4),
        3 => sample + (old << 1) + (-(13 * old) >> 6) - older + ((3 * older) >> 4),
        _ => unreachable!("filter is masked to 2 bits"),
    };

    let clamped = filtered.clamp(i16::MIN.into(), i16::MAX.into()) as i16;
    // Clip to 15 bits: the DSP's internal sample path is one bit narrower than i16.
    (clamped << 1) >> 1
}

fn compute_exp_decay(current_value: i32) -> i32 {
    -(((current_value - 1) >> 8) + 1)
}

#[derive(Debug, Clone, Encode, Decode)]
struct Voice {
    interpolation: InterpolationMode,

    // Registers
    srcn: u8,
    pitch: u16,
    pitch_modulation_enabled: bool,
    envelope_mode: EnvelopeMode,
    attack_rate: u8,
    decay_rate: u8,
    sustain_rate: u8,
    sustain_level: u8,
    gain_mode: GainMode,
    gain_value: u8,
    vol_l: i8,
    vol_r: i8,
    keyed_on: bool,
    keyed_off: bool,
    output_noise: bool,
    last_pitch_h_write: u8,

    // Runtime state
    active: bool,
    brr_block_address: u16,
    brr_buffer: BrrRingBuffer,
    brr_decoder_idx: u16,
    pitch_counter: u16,
    envelope_level: u16,
    clipped_envelope_value: u16,
    envelope_phase: EnvelopePhase,
    current_sample: i16,
    restart_pending: bool,
    restart_delay_remaining: u8,
    endx: bool,
}

impl Voice {
    fn new() -> Self {
        Self {
            interpolation: InterpolationMode::default(),
            srcn: 0,
            pitch: 0,
            pitch_modulation_enabled: false,
            envelope_mode: EnvelopeMode::default(),
            attack_rate: 0,
            decay_rate: 0,
            sustain_rate: 0,
            sustain_level: 0,
            gain_mode: GainMode::default(),
            gain_value: 0,
            vol_l: 0,
            vol_r: 0,
            keyed_on: false,
            keyed_off: false,
            output_noise: false,
            last_pitch_h_write: 0,
            active: false,
            brr_block_address: 0,
            brr_buffer: BrrRingBuffer::default(),
            brr_decoder_idx: 0,
            pitch_counter: 0,
            envelope_level: 0,
            clipped_envelope_value: 0,
            envelope_phase: EnvelopePhase::default(),
            current_sample: 0,
            restart_pending: false,
            restart_delay_remaining: 0,
            endx: false,
        }
    }

    fn write_pitch_low(&mut self, value: u8) {
        self.pitch.set_lsb(value);
    }

    fn write_pitch_high(&mut self, value: u8) {
        // 14-bit pitch; the top two written bits are kept only for register read-back.
        self.pitch.set_msb(value & 0x3F);
        self.last_pitch_h_write = value;
    }

    fn write_adsr1(&mut self, value: u8) {
        self.attack_rate = value & 0x0F;
        self.decay_rate = (value >> 4) & 0x07;
        self.envelope_mode = EnvelopeMode::from_bit(value.bit(7));
    }

    fn read_adsr1(&self) -> u8 {
        self.attack_rate | (self.decay_rate << 4) | (u8::from(self.envelope_mode.to_bit()) << 7)
    }

    fn write_adsr2(&mut self, value: u8) {
        self.sustain_rate = value & 0x1F;
        self.sustain_level = value >> 5;
    }

    fn read_adsr2(&self) -> u8 {
        self.sustain_rate | (self.sustain_level << 5)
    }

    fn write_gain(&mut self, value: u8) {
        self.gain_mode = GainMode::from_bit(value.bit(7));
        self.gain_value = value & 0x7F;
    }

    fn read_gain(&self) -> u8 {
        self.gain_value | (u8::from(self.gain_mode.to_bit()) << 7)
    }

    /// ENVX: the top 7 bits of the 11-bit envelope value, i.e. `round(env * 127)`.
    fn read_envx(&self) -> u8 {
        (self.envelope_level >> 4) as u8
    }

    /// OUTX: the high byte of the last envelope-weighted (pre-volume) sample.
    fn read_outx(&self) -> u8 {
        (self.current_sample >> 7) as u8
    }

    fn write_kon(&mut self, key_on: bool) {
        self.keyed_on = key_on;
        if key_on {
            self.envelope_phase = EnvelopePhase::Attack;
            self.envelope_level = 0;
            self.restart_pending = true;
        }
    }

    fn write_kof(&mut self, key_off: bool) {
        self.keyed_off = key_off;
        if key_off {
            self.envelope_phase = EnvelopePhase::Release;
        }
    }

    fn soft_reset(&mut self) {
        self.write_kof(true);
        self.envelope_level = 0;
        self.active = false;
    }

    fn restart(&mut self, dir_base: u16, aram: &Aram) {
        let table_addr = dir_base.wrapping_add(u16::from(self.srcn) << 2);
        let start_addr =
            u16::from_le_bytes([aram.peek(table_addr), aram.peek(table_addr.wrapping_add(1))]);
        self.brr_block_address = start_addr;
        self.pitch_counter = 0;
        self.active = true;

        // Hardware mutes the voice for 5 output samples after a key-on while the BRR
        // decoder primes its history.
        self.restart_delay_remaining = 5;
    }

    /// Decodes the next group of 4 BRR samples, advancing to the next block (or
    /// looping, or going inactive) as needed.
    fn decode_brr_group(&mut self, dir_base: u16, aram: &Aram) {
        if self.brr_decoder_idx == 16 {
            let header = aram.peek(self.brr_block_address);
            let end_flag = header.bit(0);
            let loop_flag = header.bit(1);

            if end_flag {
                self.endx = true;

                let table_addr = dir_base.wrapping_add(u16::from(self.srcn) << 2);
                if loop_flag {
                    let loop_addr = u16::from_le_bytes([
                        aram.peek(table_addr.wrapping_add(2)),
                        aram.peek(table_addr.wrapping_add(3)),
                    ]);
                    self.brr_block_address = loop_addr;
                } else {
                    self.active = false;
                    self.envelope_phase = EnvelopePhase::Release;
                    self.envelope_level = 0;
                }
            } else {
                self.brr_block_address = self.brr_block_address.wrapping_add(BRR_BLOCK_LEN);
            }

            self.brr_decoder_idx = 0;
        }

        let header = aram.peek(self.brr_block_address);
        let range = header >> 4;
        let filter = (header >> 2) & 0x03;

        let mut nibbles = [0_i8; 4];
        let idx = self.brr_decoder_idx;
        for i in 0..2 {
            let byte_addr = self.brr_block_address.wrapping_add(1 + (idx >> 1) + i);
            let byte = aram.peek(byte_addr);
            nibbles[(2 * i) as usize] = (byte as i8) >> 4;
            nibbles[(2 * i + 1) as usize] = ((byte as i8) << 4) >> 4;
        }
        self.brr_decoder_idx += 4;

        let (mut older, mut old) = self.brr_buffer.last_two_written_samples();
        for nibble in nibbles {
            let shifted = apply_brr_shift(nibble, range.min(12));
            let decoded = apply_brr_filter(shifted, filter, old, older);
            self.brr_buffer.write(decoded);
            older = old;
            old = decoded;
        }
    }

    fn clock(
        &mut self,
        registers: &DspRegisters,
        aram: &Aram,
        prev_voice_sample: i16,
        noise_output: i16,
    ) {
        if self.restart_pending {
            self.restart_pending = false;
            self.restart(registers.dir_base, aram);
            self.brr_buffer.reset();
            self.brr_decoder_idx = 0;
        }

        if self.restart_delay_remaining != 0 {
            self.current_sample = 0;

            if self.restart_delay_remaining <= 3 && (self.keyed_off || registers.soft_reset) {
                self.envelope_phase = EnvelopePhase::Release;
            }

            self.restart_delay_remaining -= 1;
            if self.restart_delay_remaining == 0 {
                for _ in 0..2 {
                    self.decode_brr_group(registers.dir_base, aram);
                }
            }
            return;
        }

        let sample = if self.output_noise {
            noise_output
        } else {
            let sample_idx = self.pitch_counter >> 12;
            let args = InterpolateArgs {
                phase_index: self.pitch_counter,
                oldest: self.brr_buffer.tap(sample_idx),
                older: self.brr_buffer.tap(sample_idx + 1),
                old: self.brr_buffer.tap(sample_idx + 2),
                sample: self.brr_buffer.tap(sample_idx + 3),
            };
            match self.interpolation {
                InterpolationMode::Gaussian => interpolate::gaussian(args),
                InterpolationMode::Linear => interpolate::linear(args),
            }
        };

        self.clock_envelope(registers.global_counter);

        // 15-bit sample scaled by the 11-bit envelope.
        self.current_sample = ((i32::from(sample) * i32::from(self.envelope_level)) >> 11) as i16;

        self.pitch_counter += self.pitch;
        if self.pitch_modulation_enabled && !self.output_noise {
            let modulation =
                ((i32::from(prev_voice_sample) >> 5) * i32::from(self.pitch)) >> 10;
            self.pitch_counter =
                self.pitch_counter.wrapping_add_signed(modulation as i16).clamp(0, 0x7FFF);
        }

        if self.pitch_counter >= 0x4000 {
            self.pitch_counter -= 0x4000;
            self.decode_brr_group(registers.dir_base, aram);
            self.brr_buffer.shift_sample_idx();
        }
    }

    fn clock_envelope(&mut self, global_counter: u16) {
        if self.envelope_phase == EnvelopePhase::Release {
            self.clipped_envelope_value = self.envelope_level.wrapping_sub(8) & 0x7FF;
            self.envelope_level = self.envelope_level.saturating_sub(8);
            return;
        }

        if self.envelope_phase == EnvelopePhase::Attack && self.envelope_level >= 0x7E0 {
            self.envelope_phase = EnvelopePhase::Decay;
        }

        if self.envelope_phase == EnvelopePhase::Decay {
            let sustain_level = u16::from(self.sustain_level + 1) << 8;
            if self.envelope_level <= sustain_level {
                self.envelope_phase = EnvelopePhase::Sustain;
            }
        }

        let current_value: i32 = self.envelope_level.into();
        let (rate, step) = match (self.envelope_mode, self.gain_mode) {
            (EnvelopeMode::Gain, GainMode::Direct) => {
                let target = i32::from(self.gain_value) << 4;
                if current_value == target { (0, 0) } else { (31, target - current_value) }
            }
            (EnvelopeMode::Gain, GainMode::Custom) => {
                let rate = self.gain_value & 0x1F;
                let step = match self.gain_value & 0x60 {
                    0x00 => -32,
                    0x20 => compute_exp_decay(current_value),
                    0x40 => 32,
                    0x60 => {
                        if self.clipped_envelope_value < 0x600 {
                            32
                        } else {
                            8
                        }
                    }
                    _ => unreachable!("masked to 2 bits"),
                };
                (rate, step)
            }
            (EnvelopeMode::Adsr, _) => match self.envelope_phase {
                EnvelopePhase::Attack => {
                    let rate = (self.attack_rate << 1) | 0x01;
                    let step = if rate == 31 { 1024 } else { 32 };
                    (rate, step)
                }
                EnvelopePhase::Decay => {
                    (0x10 | (self.decay_rate << 1), compute_exp_decay(current_value))
                }
                EnvelopePhase::Sustain => (self.sustain_rate, compute_exp_decay(current_value)),
                EnvelopePhase::Release => (31, -8),
            },
        };

        if rate != 0
            && (global_counter + tables::ENVELOPE_OFFSET[rate as usize])
                % tables::ENVELOPE_RATE[rate as usize]
                == 0
        {
            let new_value = current_value + step;
            self.envelope_level = new_value.clamp(0, 0x7FF) as u16;
            self.clipped_envelope_value = (new_value as u16) & 0x7FF;
        }
    }
}

#[derive(Debug, Clone, Encode, Decode)]
struct NoiseGenerator {
    output: i16,
}

impl NoiseGenerator {
    fn new() -> Self {
        Self { output: i16::MIN >> 1 }
    }

    fn clock(&mut self, rate: u8, global_counter: u16) {
        let rate = rate as usize;
        if rate != 0
            && (global_counter + tables::ENVELOPE_OFFSET[rate]) % tables::ENVELOPE_RATE[rate] == 0
        {
            let new_bit = self.output.bit(0) ^ self.output.bit(1);
            self.output = ((self.output >> 1) & 0x3FFF) | (i16::from(new_bit) << 14);
            self.output = (self.output << 1) >> 1;
        }
    }
}

fn read_echo_sample(aram: &Aram, address: u16) -> i16 {
    i16::from_le_bytes([aram.peek(address), aram.peek(address.wrapping_add(1))])
}

fn write_echo_sample(aram: &mut Aram, address: u16, value: i16) {
    let [lo, hi] = value.to_le_bytes();
    aram.poke(address, lo);
    aram.poke(address.wrapping_add(1), hi);
}

#[derive(Debug, Clone, Encode, Decode)]
struct EchoFilter {
    enabled: [bool; 8],
    buffer_start_address: u16,
    buffer_offset: u16,
    frames_remaining: u16,
    buffer_size_frames: u16,
    vol_l: i8,
    vol_r: i8,
    feedback: i8,
    fir_coefficients: [i8; 8],
    sample_buffer_l: [i16; 8],
    sample_buffer_r: [i16; 8],
    sample_buffer_idx: usize,
    last_edl_write: u8,
}

impl EchoFilter {
    fn new() -> Self {
        Self {
            enabled: [false; 8],
            buffer_start_address: 0,
            buffer_offset: 0,
            frames_remaining: 1,
            buffer_size_frames: 1,
            vol_l: 0,
            vol_r: 0,
            feedback: 0,
            fir_coefficients: [0; 8],
            sample_buffer_l: [0; 8],
            sample_buffer_r: [0; 8],
            sample_buffer_idx: 0,
            last_edl_write: 0,
        }
    }

    fn write_eon(&mut self, value: u8) {
        for i in 0..8 {
            self.enabled[i] = value.bit(i as u8);
        }
    }

    fn read_eon(&self) -> u8 {
        (0..8).fold(0, |acc, i| acc | (u8::from(self.enabled[i]) << i))
    }

    fn write_edl(&mut self, edl: u8) {
        // Zero is treated as one 512-frame unit per hardware.
        self.buffer_size_frames = match edl & 0x0F {
            0 => 1,
            n => u16::from(n) << 9,
        };
        self.last_edl_write = edl;
    }

    /// Resets the echo write cursor back to the start of the buffer, as happens on
    /// FLG soft reset.
    fn reset_cursor(&mut self) {
        self.buffer_offset = 0;
        self.frames_remaining = self.buffer_size_frames;
    }

    fn process(
        &mut self,
        writes_enabled: bool,
        aram: &mut Aram,
        voice_l: &[i32; 8],
        voice_r: &[i32; 8],
    ) -> (i32, i32) {
        let addr = self.buffer_start_address.wrapping_add(self.buffer_offset);
        self.sample_buffer_l[self.sample_buffer_idx] = read_echo_sample(aram, addr);
        self.sample_buffer_r[self.sample_buffer_idx] = read_echo_sample(aram, addr.wrapping_add(2));

        let mut fir_l: i32 = 0;
        let mut fir_r: i32 = 0;
        for i in 0..7 {
            let coeff: i32 = self.fir_coefficients[i].into();
            let idx = self.sample_buffer_idx.wrapping_add(i + 1) & 0x07;
            fir_l += (coeff * i32::from(self.sample_buffer_l[idx])) >> 6;
            fir_r += (coeff * i32::from(self.sample_buffer_r[idx])) >> 6;
        }

        // Clip the running sum to 16 bits before folding in the newest tap, matching
        // the two-stage accumulation the real FIR hardware performs.
        fir_l = i32::from(fir_l as i16);
        fir_r = i32::from(fir_r as i16);

        fir_l += (i32::from(self.fir_coefficients[7]) * i32::from(self.sample_buffer_l[self.sample_buffer_idx])) >> 6;
        fir_r += (i32::from(self.fir_coefficients[7]) * i32::from(self.sample_buffer_r[self.sample_buffer_idx])) >> 6;

        let mut fir_l = fir_l.clamp(i16::MIN.into(), i16::MAX.into());
        let mut fir_r = fir_r.clamp(i16::MIN.into(), i16::MAX.into());
        fir_l &= !1;
        fir_r &= !1;

        if writes_enabled {
            self.write_back(aram, voice_l, voice_r, fir_l, fir_r);
        }

        self.sample_buffer_idx = (self.sample_buffer_idx + 1) & 0x07;

        self.frames_remaining -= 1;
        if self.frames_remaining == 0 {
            self.buffer_offset = 0;
            self.frames_remaining = self.buffer_size_frames;
        } else {
            self.buffer_offset = self.buffer_offset.wrapping_add(4);
        }

        ((fir_l * i32::from(self.vol_l)) >> 7, (fir_r * i32::from(self.vol_r)) >> 7)
    }

    fn write_back(
        &self,
        aram: &mut Aram,
        voice_l: &[i32; 8],
        voice_r: &[i32; 8],
        fir_l: i32,
        fir_r: i32,
    ) {
        let mut sum_l = 0_i32;
        let mut sum_r = 0_i32;
        for i in (0..8).filter(|&i| self.enabled[i]) {
            sum_l = (sum_l + voice_l[i]).clamp(i16::MIN.into(), i16::MAX.into());
            sum_r = (sum_r + voice_r[i]).clamp(i16::MIN.into(), i16::MAX.into());
        }

        let feedback_l = (fir_l * i32::from(self.feedback)) >> 7;
        let feedback_r = (fir_r * i32::from(self.feedback)) >> 7;

        let out_l = (sum_l + feedback_l).clamp(i16::MIN.into(), i16::MAX.into()) & !1;
        let out_r = (sum_r + feedback_r).clamp(i16::MIN.into(), i16::MAX.into()) & !1;

        let addr = self.buffer_start_address.wrapping_add(self.buffer_offset);
        write_echo_sample(aram, addr, out_l as i16);
        write_echo_sample(aram, addr.wrapping_add(2), out_r as i16);
    }
}

#[derive(Debug, Clone, Encode, Decode)]
struct DspRegisters {
    dir_base: u16,
    master_volume_l: i8,
    master_volume_r: i8,
    noise_frequency: u8,
    echo_buffer_writes_enabled: bool,
    mute_amplifier: bool,
    soft_reset: bool,
    global_counter: u16,
}

impl DspRegisters {
    fn new() -> Self {
        Self {
            dir_base: 0,
            master_volume_l: 0,
            master_volume_r: 0,
            noise_frequency: 0,
            echo_buffer_writes_enabled: false,
            mute_amplifier: true,
            soft_reset: true,
            global_counter: 0,
        }
    }

    fn write_flg(&mut self, value: u8) {
        self.noise_frequency = value & 0x1F;
        self.echo_buffer_writes_enabled = !value.bit(5);
        self.mute_amplifier = value.bit(6);
        self.soft_reset = value.bit(7);
    }

    fn read_flg(&self) -> u8 {
        self.noise_frequency
            | (u8::from(!self.echo_buffer_writes_enabled) << 5)
            | (u8::from(self.mute_amplifier) << 6)
            | (u8::from(self.soft_reset) << 7)
    }
}

/// Per-voice mute mask and a debug "force pan" override, both host-facing test/debug
/// affordances rather than anything the real chip exposes.
#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct DebugControls {
    pub mute_mask: u8,
    pub force_pan: Option<(i8, i8)>,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Dsp {
    voices: [Voice; 8],
    registers: DspRegisters,
    noise: NoiseGenerator,
    echo: EchoFilter,
    address_latch: u8,
    debug: DebugControls,
    mix_gain: f32,
}

impl Dsp {
    pub fn new() -> Self {
        Self {
            voices: array::from_fn(|_| Voice::new()),
            registers: DspRegisters::new(),
            noise: NoiseGenerator::new(),
            echo: EchoFilter::new(),
            address_latch: 0,
            debug: DebugControls::default(),
            mix_gain: 1.0,
        }
    }

    pub fn set_interpolation(&mut self, mode: InterpolationMode) {
        for voice in &mut self.voices {
            voice.interpolation = mode;
        }
    }

    pub fn set_debug_controls(&mut self, debug: DebugControls) {
        self.debug = debug;
    }

    /// Host-configurable output scale applied after the dry/echo sum, before the
    /// final 16-bit clamp. 1.0 reproduces the unscaled hardware level.
    pub fn set_mix_gain(&mut self, gain: f32) {
        self.mix_gain = gain;
    }

    pub fn write_addr(&mut self, address: u8) {
        self.address_latch = address;
    }

    pub fn read_addr(&self) -> u8 {
        self.address_latch
    }

    pub fn read_data(&self) -> u8 {
        // $80-$FF mirror $00-$7F for reads.
        let address = self.address_latch & 0x7F;
        let voice = (address >> 4) as usize;

        match address & 0x0F {
            0x00 => self.voices[voice].vol_l as u8,
            0x01 => self.voices[voice].vol_r as u8,
            0x02 => self.voices[voice].pitch.lsb(),
            0x03 => self.voices[voice].last_pitch_h_write,
            0x04 => self.voices[voice].srcn,
            0x05 => self.voices[voice].read_adsr1(),
            0x06 => self.voices[voice].read_adsr2(),
            0x07 => self.voices[voice].read_gain(),
            0x08 => self.voices[voice].read_envx(),
            0x09 => self.voices[voice].read_outx(),
            0x0F => self.echo.fir_coefficients[voice] as u8,
            0x0A | 0x0B | 0x0E => 0,
            0x0C | 0x0D => self.read_global_register(address),
            _ => unreachable!("address masked to 4 bits"),
        }
    }

    fn read_global_register(&self, address: u8) -> u8 {
        match address {
            0x0C => self.registers.master_volume_l as u8,
            0x1C => self.registers.master_volume_r as u8,
            0x2C => self.echo.vol_l as u8,
            0x3C => self.echo.vol_r as u8,
            0x4C => (0..8).fold(0, |acc, v| acc | (u8::from(self.voices[v].keyed_on) << v)),
            0x5C => (0..8).fold(0, |acc, v| acc | (u8::from(self.voices[v].keyed_off) << v)),
            0x6C => self.registers.read_flg(),
            0x7C => (0..8).fold(0, |acc, v| acc | (u8::from(self.voices[v].endx) << v)),
            0x0D => self.echo.feedback as u8,
            0x1D => 0,
            0x2D => {
                (1..8).fold(0, |acc, v| acc | (u8::from(self.voices[v].pitch_modulation_enabled) << v))
            }
            0x3D => (0..8).fold(0, |acc, v| acc | (u8::from(self.voices[v].output_noise) << v)),
            0x4D => self.echo.read_eon(),
            0x5D => (self.registers.dir_base >> 8) as u8,
            0x6D => (self.echo.buffer_start_address >> 8) as u8,
            0x7D => self.echo.last_edl_write,
            _ => unreachable!("all $xC/$xD addresses covered"),
        }
    }

    /// Reading $7F returns the full ENDX latch and clears it; every other address is
    /// a plain register read.
    pub fn read_register_with_side_effects(&mut self) -> u8 {
        let value = self.read_data();
        if self.address_latch & 0x7F == 0x7C {
            for voice in &mut self.voices {
                voice.endx = false;
            }
        }
        value
    }

    pub fn write_data(&mut self, value: u8) {
        // $80-$FF are not writable.
        if self.address_latch >= 0x80 {
            return;
        }

        let address = self.address_latch;
        let voice = (address >> 4) as usize;

        match address & 0x0F {
            0x00 => self.voices[voice].vol_l = value as i8,
            0x01 => self.voices[voice].vol_r = value as i8,
            0x02 => self.voices[voice].write_pitch_low(value),
            0x03 => self.voices[voice].write_pitch_high(value),
            0x04 => self.voices[voice].srcn = value,
            0x05 => self.voices[voice].write_adsr1(value),
            0x06 => self.voices[voice].write_adsr2(value),
            0x07 => self.voices[voice].write_gain(value),
            // ENVX/OUTX are nominally writable on real hardware but overwritten at
            // 32 kHz regardless; treat as read-only.
            0x08 | 0x09 => {}
            0x0F => self.echo.fir_coefficients[voice] = value as i8,
            0x0A | 0x0B | 0x0E => {}
            0x0C | 0x0D => self.write_global_register(address, value),
            _ => unreachable!("address masked to 4 bits"),
        }
    }

    fn write_global_register(&mut self, address: u8, value: u8) {
        match address {
            0x0C => self.registers.master_volume_l = value as i8,
            0x1C => self.registers.master_volume_r = value as i8,
            0x2C => self.echo.vol_l = value as i8,
            0x3C => self.echo.vol_r = value as i8,
            0x4C => {
                for v in 0..8 {
                    self.voices[v].write_kon(value.bit(v as u8));
                }
            }
            0x5C => {
                for v in 0..8 {
                    self.voices[v].write_kof(value.bit(v as u8));
                }
            }
            0x6C => {
                self.registers.write_flg(value);
                if self.registers.soft_reset {
                    for voice in &mut self.voices {
                        voice.soft_reset();
                    }
                    self.echo.reset_cursor();
                }
            }
            0x7C => {
                for voice in &mut self.voices {
                    voice.endx = false;
                }
            }
            0x0D => self.echo.feedback = value as i8,
            0x1D => {}
            0x2D => {
                for v in 1..8 {
                    self.voices[v].pitch_modulation_enabled = value.bit(v as u8);
                }
            }
            0x3D => {
                for v in 0..8 {
                    self.voices[v].output_noise = value.bit(v as u8);
                }
            }
            0x4D => self.echo.write_eon(value),
            0x5D => self.registers.dir_base = u16::from(value) << 8,
            0x6D => self.echo.buffer_start_address = u16::from(value) << 8,
            0x7D => self.echo.write_edl(value),
            _ => unreachable!("all $xC/$xD addresses covered"),
        }
    }

    /// Advances the DSP by one output sample, reading and writing BRR/echo data
    /// directly in `aram`. Returns the stereo output for this frame.
    #[must_use]
    pub fn clock(&mut self, aram: &mut Aram) -> (i16, i16) {
        self.registers.global_counter =
            if self.registers.global_counter == 0 { 0x77FF } else { self.registers.global_counter - 1 };

        self.noise.clock(self.registers.noise_frequency, self.registers.global_counter);

        for i in 0..8 {
            let prev = if i != 0 { self.voices[i - 1].current_sample } else { 0 };
            // Borrow-split: clock() only needs an immutable ARAM view.
            let aram_ro: &Aram = &*aram;
            self.voices[i].clock(&self.registers, aram_ro, prev, self.noise.output);
        }

        self.mix(aram)
    }

    fn mix(&mut self, aram: &mut Aram) -> (i16, i16) {
        let mut voice_l = [0_i32; 8];
        let mut voice_r = [0_i32; 8];
        let mut sum_l = 0_i32;
        let mut sum_r = 0_i32;

        for (i, voice) in self.voices.iter().enumerate() {
            let muted = self.debug.mute_mask.bit(i as u8);
            let (vol_l, vol_r) = match self.debug.force_pan {
                Some((l, r)) => (l, r),
                None => (voice.vol_l, voice.vol_r),
            };

            let sample = if muted { 0 } else { i32::from(voice.current_sample) };
            let l = (sample * i32::from(vol_l)) >> 6;
            let r = (sample * i32::from(vol_r)) >> 6;

            voice_l[i] = l;
            voice_r[i] = r;
            sum_l = (sum_l + l).clamp(i16::MIN.into(), i16::MAX.into());
            sum_r = (sum_r + r).clamp(i16::MIN.into(), i16::MAX.into());
        }

        sum_l = ((sum_l * i32::from(self.registers.master_volume_l)) >> 7)
            .clamp(i16::MIN.into(), i16::MAX.into());
        sum_r = ((sum_r * i32::from(self.registers.master_volume_r)) >> 7)
            .clamp(i16::MIN.into(), i16::MAX.into());

        let (echo_l, echo_r) = self.echo.process(
            self.registers.echo_buffer_writes_enabled,
            aram,
            &voice_l,
            &voice_r,
        );

        if self.registers.mute_amplifier {
            (0, 0)
        } else {
            let out_l = (sum_l + echo_l) as f32 * self.mix_gain;
            let out_r = (sum_r + echo_r) as f32 * self.mix_gain;
            let out_l = out_l.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
            let out_r = out_r.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
            (out_l, out_r)
        }
    }

    pub fn reset(&mut self) {
        // Soft reset + mute + block echo writes, the documented post-/RESET state.
        self.registers.write_flg(0xE0);
        for voice in &mut self.voices {
            voice.soft_reset();
        }
        self.echo.reset_cursor();
    }
}

impl Default for Dsp {
    fn default() -> Self {
        Self::new()
    }
}
