//! Decoding of digitizer telemetry into calibrated complex voltages.
//!
//! A [`TelemetryFile`] wraps any [`TelemetryContainer`]. Opening it reads and
//! checks every attribute group up front. The loaders then walk the raw
//! sample blocks of one stream:
//!
//! 1. split each block into per-channel runs ([`decode_channel_format`]),
//! 2. calibrate codes to volts and pair them into complex samples,
//! 3. assemble `ndarray` arrays, optionally followed by a windowed DFT.

mod attrs;
mod container;
mod decode;
mod spectrum;

pub use attrs::{
    ACQUISITION_RATE_TO_HZ, ChannelAttributes, ChannelFormat, FileAttributes, StreamAttributes,
};
pub use container::{
    AttributeSet, AttributeValue, FILE_GROUP, MemoryContainer, TelemetryContainer, channel_group,
    stream_group,
};
pub use decode::{Calibration, calibrate, decode_channel_format, max_code, reconstruct_complex};
pub use spectrum::{WindowedDft, frequency_axis};

use crate::domain::{HerculesError, HerculesResult};
use ndarray::{Array1, Array3, Array4, ArrayView2, s};
use num_complex::Complex64;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Per-channel calibrated time series, shaped (acquisitions, records, samples).
pub type ChannelSeries = BTreeMap<usize, Array3<Complex64>>;

/// Per-channel spectra, shaped (acquisitions, records, slices, window).
pub type ChannelSpectra = BTreeMap<usize, Array4<Complex64>>;

#[derive(Debug, Clone)]
pub struct TelemetryFile<C = MemoryContainer> {
    container: C,
    file: FileAttributes,
    streams: BTreeMap<usize, StreamAttributes>,
    channels: BTreeMap<usize, ChannelAttributes>,
}

/// Decoded samples of one stream before they are shaped into arrays.
struct DecodedStream {
    n_acquisitions: usize,
    n_records: usize,
    samples_per_record: usize,
    /// Channel id and its samples in (acquisition, record, sample) order.
    channels: Vec<(usize, Vec<Complex64>)>,
}

impl TelemetryFile<MemoryContainer> {
    /// Opens a JSON telemetry file written by [`MemoryContainer::to_json_file`].
    pub fn open_path(path: impl AsRef<Path>) -> HerculesResult<Self> {
        let path = path.as_ref();
        let container = MemoryContainer::from_json_file(path)?;
        debug!(path = %path.display(), "telemetry container read");
        Self::open(container)
    }
}

impl<C: TelemetryContainer> TelemetryFile<C> {
    pub fn open(container: C) -> HerculesResult<Self> {
        let file = FileAttributes::from_set(&required_group(&container, FILE_GROUP, "file")?)?;

        let mut streams = BTreeMap::new();
        for stream in 0..file.n_streams {
            let set = required_group(&container, &stream_group(stream), "stream")?;
            streams.insert(stream, StreamAttributes::from_set(&set, stream)?);
        }
        let mut channels = BTreeMap::new();
        for channel in 0..file.n_channels {
            let set = required_group(&container, &channel_group(channel), "channel")?;
            channels.insert(channel, ChannelAttributes::from_set(&set, channel)?);
        }
        check_channel_map(&file, &streams)?;

        debug!(
            streams = file.n_streams,
            channels = file.n_channels,
            "telemetry file opened"
        );
        Ok(Self {
            container,
            file,
            streams,
            channels,
        })
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn file_attributes(&self) -> &FileAttributes {
        &self.file
    }

    pub fn stream_attributes(&self, stream: usize) -> HerculesResult<&StreamAttributes> {
        self.streams.get(&stream).ok_or_else(|| {
            HerculesError::index(
                "TELEMETRY.STREAM",
                format!(
                    "stream {} does not exist; the file has {} streams",
                    stream, self.file.n_streams
                ),
            )
        })
    }

    pub fn channel_attributes(&self, channel: usize) -> HerculesResult<&ChannelAttributes> {
        self.channels.get(&channel).ok_or_else(|| {
            HerculesError::index(
                "TELEMETRY.CHANNEL",
                format!(
                    "channel {} does not exist; the file has {} channels",
                    channel, self.file.n_channels
                ),
            )
        })
    }

    pub fn n_streams(&self) -> usize {
        self.file.n_streams
    }

    pub fn n_channels(&self) -> usize {
        self.file.n_channels
    }

    pub fn sample_rate_hz(&self, stream: usize) -> HerculesResult<f64> {
        Ok(self.stream_attributes(stream)?.sample_rate_hz())
    }

    /// Calibrated series of every channel in `stream`.
    pub fn load_ts_stream(&self, stream: usize) -> HerculesResult<ChannelSeries> {
        let decoded = self.decode_stream(stream)?;
        let shape = (
            decoded.n_acquisitions,
            decoded.n_records,
            decoded.samples_per_record,
        );
        let mut series = ChannelSeries::new();
        for (channel, samples) in decoded.channels {
            let array = Array3::from_shape_vec(shape, samples).map_err(|source| {
                HerculesError::format(
                    "TELEMETRY.SHAPE",
                    format!("channel {channel} does not fill shape {shape:?}: {source}"),
                )
            })?;
            series.insert(channel, array);
        }
        info!(stream, channels = series.len(), shape = ?shape, "time series loaded");
        Ok(series)
    }

    /// Calibrated series shaped (acquisitions, channels, records·samples);
    /// channels follow the stream's channel list.
    pub fn quick_load_ts_stream(&self, stream: usize) -> HerculesResult<Array3<Complex64>> {
        let decoded = self.decode_stream(stream)?;
        let span = decoded.n_records * decoded.samples_per_record;
        let mut output = Array3::zeros((decoded.n_acquisitions, decoded.channels.len(), span));

        for (position, (channel, samples)) in decoded.channels.iter().enumerate() {
            let view = ArrayView2::from_shape((decoded.n_acquisitions, span), samples).map_err(
                |source| {
                    HerculesError::format(
                        "TELEMETRY.SHAPE",
                        format!("channel {channel} does not fill {span} samples per acquisition: {source}"),
                    )
                },
            )?;
            output.slice_mut(s![.., position, ..]).assign(&view);
        }
        info!(stream, shape = ?output.dim(), "time series quick-loaded");
        Ok(output)
    }

    /// Frequency axis and per-record spectra of every channel in `stream`.
    pub fn load_fft_stream(
        &self,
        window: usize,
        stream: usize,
    ) -> HerculesResult<(Array1<f64>, ChannelSpectra)> {
        let dft = WindowedDft::new(window)?;
        let frequencies = frequency_axis(window, self.sample_rate_hz(stream)?);
        let series = self.load_ts_stream(stream)?;

        let mut spectra = ChannelSpectra::new();
        for (channel, samples) in series {
            let (n_acquisitions, n_records, n_samples) = samples.dim();
            let slices = dft.slice_count(n_samples);
            let mut output = Array4::zeros((n_acquisitions, n_records, slices, window));
            for acquisition in 0..n_acquisitions {
                for record in 0..n_records {
                    let spectrum = dft.spectra(samples.slice(s![acquisition, record, ..]));
                    output
                        .slice_mut(s![acquisition, record, .., ..])
                        .assign(&spectrum);
                }
            }
            spectra.insert(channel, output);
        }
        info!(stream, window, channels = spectra.len(), "spectra loaded");
        Ok((frequencies, spectra))
    }

    /// Frequency axis and spectra of the concatenated series, shaped
    /// (acquisitions, channels, slices, window).
    pub fn quick_load_fft_stream(
        &self,
        window: usize,
        stream: usize,
    ) -> HerculesResult<(Array1<f64>, Array4<Complex64>)> {
        let dft = WindowedDft::new(window)?;
        let frequencies = frequency_axis(window, self.sample_rate_hz(stream)?);
        let series = self.quick_load_ts_stream(stream)?;

        let (n_acquisitions, n_channels, span) = series.dim();
        let slices = dft.slice_count(span);
        let mut output = Array4::zeros((n_acquisitions, n_channels, slices, window));
        for acquisition in 0..n_acquisitions {
            for channel in 0..n_channels {
                let spectrum = dft.spectra(series.slice(s![acquisition, channel, ..]));
                output
                    .slice_mut(s![acquisition, channel, .., ..])
                    .assign(&spectrum);
            }
        }
        info!(stream, window, shape = ?output.dim(), "spectra quick-loaded");
        Ok((frequencies, output))
    }

    fn decode_stream(&self, stream: usize) -> HerculesResult<DecodedStream> {
        let attributes = self.stream_attributes(stream)?;
        let calibrations = attributes
            .channels
            .iter()
            .map(|channel| Calibration::for_channel(self.channel_attributes(*channel)?))
            .collect::<HerculesResult<Vec<_>>>()?;

        let mut channels: Vec<(usize, Vec<Complex64>)> = attributes
            .channels
            .iter()
            .map(|channel| (*channel, Vec::new()))
            .collect();
        let mut samples_per_record = None;

        for acquisition in 0..attributes.n_acquisitions {
            for record in 0..attributes.n_records {
                let block = self.container.sample_block(stream, acquisition, record)?;
                let runs = decode_channel_format(
                    &block,
                    attributes.channel_format,
                    attributes.channels.len(),
                )?;
                for ((channel, samples), (run, calibration)) in
                    channels.iter_mut().zip(runs.iter().zip(&calibrations))
                {
                    let calibrated = calibration.apply_complex(run)?;
                    let expected = *samples_per_record.get_or_insert(calibrated.len());
                    if calibrated.len() != expected {
                        return Err(HerculesError::format(
                            "TELEMETRY.RECORD_LENGTH",
                            format!(
                                "record {} of acquisition {} holds {} samples on channel {}; earlier records hold {}",
                                record,
                                acquisition,
                                calibrated.len(),
                                channel,
                                expected
                            ),
                        ));
                    }
                    samples.extend(calibrated);
                }
            }
        }

        Ok(DecodedStream {
            n_acquisitions: attributes.n_acquisitions,
            n_records: attributes.n_records,
            samples_per_record: samples_per_record.unwrap_or(0),
            channels,
        })
    }
}

fn required_group<C: TelemetryContainer>(
    container: &C,
    group: &str,
    label: &str,
) -> HerculesResult<AttributeSet> {
    container.attributes(group).ok_or_else(|| {
        HerculesError::format(
            "TELEMETRY.MISSING_GROUP",
            format!("{label} attribute group '{group}' is missing"),
        )
    })
}

fn check_channel_map(
    file: &FileAttributes,
    streams: &BTreeMap<usize, StreamAttributes>,
) -> HerculesResult<()> {
    let mismatch = |channel: usize, stream: usize| {
        HerculesError::format(
            "TELEMETRY.CHANNEL_MAP",
            format!("channel {channel} and stream {stream} disagree on the channel to stream map"),
        )
    };

    for (stream, attributes) in streams {
        for channel in &attributes.channels {
            if file.channel_streams.get(*channel) != Some(stream) {
                return Err(mismatch(*channel, *stream));
            }
        }
    }
    for (channel, stream) in file.channel_streams.iter().enumerate() {
        let listed = streams
            .get(stream)
            .is_some_and(|attributes| attributes.channels.contains(&channel));
        if !listed {
            return Err(mismatch(channel, *stream));
        }
    }
    Ok(())
}
