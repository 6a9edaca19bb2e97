use super::container::{AttributeSet, AttributeValue};
use super::decode::max_code;
use crate::domain::{HerculesError, HerculesResult};
use std::fmt::{Display, Formatter};

/// Native acquisition-rate unit (MHz) to Hz.
pub const ACQUISITION_RATE_TO_HZ: f64 = 1.0e6;

/// How the channels of one stream share a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelFormat {
    /// Complex samples of all channels interleaved sample by sample.
    Packed,
    /// Each channel's record stored contiguously, one after another.
    Sequential,
}

impl ChannelFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Packed => "packed",
            Self::Sequential => "sequential",
        }
    }

    /// Accepts the textual tags and the digitizer's numeric codes
    /// (`0` packed, `1` sequential).
    pub fn from_attribute(value: &AttributeValue) -> HerculesResult<Self> {
        match value {
            AttributeValue::Integer(0) => Ok(Self::Packed),
            AttributeValue::Integer(1) => Ok(Self::Sequential),
            AttributeValue::Text(tag) if tag.eq_ignore_ascii_case("packed") => Ok(Self::Packed),
            AttributeValue::Text(tag) if tag.eq_ignore_ascii_case("sequential") => {
                Ok(Self::Sequential)
            }
            other => Err(HerculesError::format(
                "TELEMETRY.CHANNEL_FORMAT",
                format!("unsupported channel format {other:?}"),
            )),
        }
    }
}

impl Display for ChannelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileAttributes {
    pub n_channels: usize,
    pub n_streams: usize,
    /// Stream of each channel, indexed by channel.
    pub channel_streams: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamAttributes {
    /// In MHz, as stored.
    pub acquisition_rate: f64,
    pub channels: Vec<usize>,
    pub channel_format: ChannelFormat,
    pub n_acquisitions: usize,
    pub n_records: usize,
}

impl StreamAttributes {
    pub fn sample_rate_hz(&self) -> f64 {
        self.acquisition_rate * ACQUISITION_RATE_TO_HZ
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAttributes {
    pub bit_depth: u32,
    pub voltage_range: f64,
    pub voltage_offset: f64,
}

impl FileAttributes {
    pub(super) fn from_set(set: &AttributeSet) -> HerculesResult<Self> {
        let group = "file";
        let attributes = Self {
            n_channels: usize_attribute(set, group, "n_channels")?,
            n_streams: usize_attribute(set, group, "n_streams")?,
            channel_streams: usize_list_attribute(set, group, "channel_streams")?,
        };

        if attributes.channel_streams.len() != attributes.n_channels {
            return Err(HerculesError::format(
                "TELEMETRY.CHANNEL_MAP",
                format!(
                    "channel_streams maps {} channels but the file declares {}",
                    attributes.channel_streams.len(),
                    attributes.n_channels
                ),
            ));
        }
        if let Some(stream) = attributes
            .channel_streams
            .iter()
            .find(|stream| **stream >= attributes.n_streams)
        {
            return Err(HerculesError::format(
                "TELEMETRY.CHANNEL_MAP",
                format!(
                    "channel_streams refers to stream {} but the file declares {} streams",
                    stream, attributes.n_streams
                ),
            ));
        }
        Ok(attributes)
    }
}

impl StreamAttributes {
    pub(super) fn from_set(set: &AttributeSet, stream: usize) -> HerculesResult<Self> {
        let group = format!("stream{stream}");
        let format = required(set, &group, "channel_format")?;
        Ok(Self {
            acquisition_rate: f64_attribute(set, &group, "acquisition_rate")?,
            channels: usize_list_attribute(set, &group, "channels")?,
            channel_format: ChannelFormat::from_attribute(format)?,
            n_acquisitions: usize_attribute(set, &group, "n_acquisitions")?,
            n_records: usize_attribute(set, &group, "n_records")?,
        })
    }
}

impl ChannelAttributes {
    /// Fails with a calibration error for bit depths other than 8 and 16.
    pub(super) fn from_set(set: &AttributeSet, channel: usize) -> HerculesResult<Self> {
        let group = format!("channel{channel}");
        let bit_depth = usize_attribute(set, &group, "bit_depth")?;
        let bit_depth = u32::try_from(bit_depth).map_err(|_| {
            HerculesError::calibration(
                "TELEMETRY.BIT_DEPTH",
                format!("channel {channel} has unsupported bit depth {bit_depth}"),
            )
        })?;
        max_code(bit_depth)?;

        let voltage_offset = match set.get("voltage_offset") {
            Some(_) => f64_attribute(set, &group, "voltage_offset")?,
            None => 0.0,
        };
        Ok(Self {
            bit_depth,
            voltage_range: f64_attribute(set, &group, "voltage_range")?,
            voltage_offset,
        })
    }
}

fn required<'a>(set: &'a AttributeSet, group: &str, key: &str) -> HerculesResult<&'a AttributeValue> {
    set.get(key).ok_or_else(|| {
        HerculesError::format(
            "TELEMETRY.MISSING_ATTRIBUTE",
            format!("attribute '{key}' is missing from group '{group}'"),
        )
    })
}

fn type_error(group: &str, key: &str, expected: &str, found: &AttributeValue) -> HerculesError {
    HerculesError::format(
        "TELEMETRY.ATTRIBUTE_TYPE",
        format!("attribute '{key}' of group '{group}' should be {expected}, found {found:?}"),
    )
}

fn usize_attribute(set: &AttributeSet, group: &str, key: &str) -> HerculesResult<usize> {
    let value = required(set, group, key)?;
    match value {
        AttributeValue::Integer(number) => {
            usize::try_from(*number).map_err(|_| type_error(group, key, "a count", value))
        }
        _ => Err(type_error(group, key, "an integer", value)),
    }
}

fn f64_attribute(set: &AttributeSet, group: &str, key: &str) -> HerculesResult<f64> {
    let value = required(set, group, key)?;
    match value {
        AttributeValue::Float(number) => Ok(*number),
        AttributeValue::Integer(number) => Ok(*number as f64),
        _ => Err(type_error(group, key, "a number", value)),
    }
}

fn usize_list_attribute(set: &AttributeSet, group: &str, key: &str) -> HerculesResult<Vec<usize>> {
    let value = required(set, group, key)?;
    match value {
        AttributeValue::IntegerList(numbers) => numbers
            .iter()
            .map(|number| {
                usize::try_from(*number).map_err(|_| type_error(group, key, "a list of indices", value))
            })
            .collect(),
        AttributeValue::Integer(number) => usize::try_from(*number)
            .map(|index| vec![index])
            .map_err(|_| type_error(group, key, "a list of indices", value)),
        _ => Err(type_error(group, key, "a list of indices", value)),
    }
}
