use super::attrs::{ChannelAttributes, ChannelFormat};
use crate::domain::{HerculesError, HerculesResult};
use num_complex::Complex64;

/// Full-scale digitizer code for a supported bit depth.
pub fn max_code(bit_depth: u32) -> HerculesResult<f64> {
    match bit_depth {
        8 => Ok(255.0),
        16 => Ok(65535.0),
        other => Err(HerculesError::calibration(
            "TELEMETRY.BIT_DEPTH",
            format!("unsupported bit depth {other}; expected 8 or 16"),
        )),
    }
}

/// Linear code-to-voltage map of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    full_scale: f64,
    range: f64,
    offset: f64,
}

impl Calibration {
    pub fn for_channel(channel: &ChannelAttributes) -> HerculesResult<Self> {
        Ok(Self {
            full_scale: max_code(channel.bit_depth)?,
            range: channel.voltage_range,
            offset: channel.voltage_offset,
        })
    }

    pub fn apply(&self, raw_code: f64) -> f64 {
        raw_code / self.full_scale * self.range + self.offset
    }

    /// Calibrates an interleaved (re, im) code run into complex voltages.
    pub fn apply_complex(&self, raw: &[i32]) -> HerculesResult<Vec<Complex64>> {
        let codes: Vec<f64> = raw.iter().map(|code| self.apply(f64::from(*code))).collect();
        reconstruct_complex(&codes)
    }
}

/// `raw_code / max_code(bit_depth) * voltage_range + voltage_offset`.
pub fn calibrate(raw_code: f64, channel: &ChannelAttributes) -> HerculesResult<f64> {
    Ok(Calibration::for_channel(channel)?.apply(raw_code))
}

/// Pairs even-indexed (real) and odd-indexed (imaginary) values.
pub fn reconstruct_complex<T: Copy + Into<f64>>(raw: &[T]) -> HerculesResult<Vec<Complex64>> {
    if raw.len() % 2 != 0 {
        return Err(HerculesError::format(
            "TELEMETRY.ODD_BLOCK",
            format!(
                "raw sample run has odd length {}; real and imaginary codes must pair up",
                raw.len()
            ),
        ));
    }
    Ok(raw
        .chunks_exact(2)
        .map(|pair| Complex64::new(pair[0].into(), pair[1].into()))
        .collect())
}

/// Splits one raw block into the interleaved (re, im) code runs of each
/// channel, in the stream's channel order.
pub fn decode_channel_format(
    raw_block: &[i32],
    format: ChannelFormat,
    n_channels: usize,
) -> HerculesResult<Vec<Vec<i32>>> {
    if n_channels == 0 {
        return Err(HerculesError::format(
            "TELEMETRY.NO_CHANNELS",
            "a stream without channels cannot be decoded",
        ));
    }
    if raw_block.len() % 2 != 0 {
        return Err(HerculesError::format(
            "TELEMETRY.ODD_BLOCK",
            format!("raw block has odd length {}", raw_block.len()),
        ));
    }
    let pairs = raw_block.len() / 2;
    if pairs % n_channels != 0 {
        return Err(HerculesError::format(
            "TELEMETRY.BLOCK_SPLIT",
            format!(
                "{} complex samples do not split evenly over {} channels",
                pairs, n_channels
            ),
        ));
    }

    let per_channel = 2 * (pairs / n_channels);
    let channels = match format {
        ChannelFormat::Packed => (0..n_channels)
            .map(|channel| {
                raw_block
                    .chunks_exact(2)
                    .skip(channel)
                    .step_by(n_channels)
                    .flatten()
                    .copied()
                    .collect()
            })
            .collect(),
        ChannelFormat::Sequential => (0..n_channels)
            .map(|channel| raw_block[channel * per_channel..(channel + 1) * per_channel].to_vec())
            .collect(),
    };
    Ok(channels)
}
