//! Four-tap resampling kernels. Both take the same four most-recently-decoded
//! BRR samples (oldest to newest) and a 14-bit pitch counter's fractional phase.

use super::tables;

pub struct InterpolateArgs {
    pub phase_index: u16,
    pub oldest: i16,
    pub older: i16,
    pub old: i16,
    pub sample: i16,
}

/// The canonical Gaussian-like four-tap kernel used by real S-DSP hardware.
pub fn gaussian(
    InterpolateArgs { phase_index, oldest, older, old, sample }: InterpolateArgs,
) -> i16 {
    let sample: i32 = sample.into();
    let old: i32 = old.into();
    let older: i32 = older.into();
    let oldest: i32 = oldest.into();

    let idx = ((phase_index >> 4) & 0xFF) as usize;

    let mut sum = (tables::GAUSSIAN[0x0FF - idx] * oldest) >> 11;
    sum += (tables::GAUSSIAN[0x1FF - idx] * older) >> 11;
    sum += (tables::GAUSSIAN[0x100 + idx] * old) >> 11;

    // Clip to 15 bits before adding the current sample, matching hardware.
    sum = i32::from((sum as i16) << 1 >> 1);

    sum += (tables::GAUSSIAN[idx] * sample) >> 11;

    sum.clamp((i16::MIN >> 1).into(), (i16::MAX >> 1).into()) as i16
}

/// A simple weighted-average fallback kernel (`w(d) = exp(-2d^2)`-shaped via a
/// coarse triangular approximation), selectable when exact Gaussian matching
/// isn't required.
pub fn linear(
    InterpolateArgs { phase_index, oldest: _, older, old, sample }: InterpolateArgs,
) -> i16 {
    let frac = i32::from(phase_index & 0xFFF);
    let old: i32 = old.into();
    let sample: i32 = sample.into();
    let _ = older;

    let interpolated = old + (((sample - old) * frac) >> 12);
    interpolated.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}
