use hercules_core::domain::HerculesErrorKind;
use hercules_core::telemetry::{
    ChannelFormat, FILE_GROUP, MemoryContainer, TelemetryFile, channel_group, stream_group,
};
use num_complex::Complex64;
use tempfile::TempDir;

const SAMPLES: usize = 101;

/// Channel 0 holds the ramp `n + 0j`, channel 1 holds `0 + n j`, both as
/// 16-bit codes over a 65535 V range so codes read back as volts.
fn container(format: ChannelFormat) -> MemoryContainer {
    let mut container = MemoryContainer::new();
    container
        .set_attribute(FILE_GROUP, "n_channels", 2_i64)
        .set_attribute(FILE_GROUP, "n_streams", 1_i64)
        .set_attribute(FILE_GROUP, "channel_streams", vec![0_i64, 0]);
    let stream = stream_group(0);
    container
        .set_attribute(&stream, "acquisition_rate", 250.0)
        .set_attribute(&stream, "channels", vec![0_i64, 1])
        .set_attribute(&stream, "channel_format", format.as_str())
        .set_attribute(&stream, "n_acquisitions", 1_i64)
        .set_attribute(&stream, "n_records", 1_i64);
    for channel in 0..2 {
        container
            .set_attribute(&channel_group(channel), "bit_depth", 16_i64)
            .set_attribute(&channel_group(channel), "voltage_range", 65535.0);
    }

    let ramp = 0..SAMPLES as i32;
    let block: Vec<i32> = match format {
        ChannelFormat::Packed => ramp.flat_map(|n| [n, 0, 0, n]).collect(),
        ChannelFormat::Sequential => ramp
            .clone()
            .flat_map(|n| [n, 0])
            .chain(ramp.flat_map(|n| [0, n]))
            .collect(),
    };
    container.insert_block(0, 0, 0, block);
    container
}

#[test]
fn json_telemetry_file_decodes_to_calibrated_series() {
    let temp = TempDir::new().expect("tempdir should be created");
    let path = temp.path().join("run0.json");
    container(ChannelFormat::Packed)
        .to_json_file(&path)
        .expect("telemetry should be written");

    let file = TelemetryFile::open_path(&path).expect("telemetry should open");
    assert_eq!(file.sample_rate_hz(0).unwrap(), 250.0e6);
    assert_eq!(file.stream_attributes(0).unwrap().channel_format, ChannelFormat::Packed);

    let series = file.load_ts_stream(0).expect("stream should decode");
    assert_eq!(series[&0].dim(), (1, 1, SAMPLES));
    assert!((series[&0][[0, 0, 7]] - Complex64::new(7.0, 0.0)).norm() < 1e-9);
    assert!((series[&1][[0, 0, 100]] - Complex64::new(0.0, 100.0)).norm() < 1e-9);
}

#[test]
fn packed_and_sequential_files_decode_identically() {
    let packed = TelemetryFile::open(container(ChannelFormat::Packed)).unwrap();
    let sequential = TelemetryFile::open(container(ChannelFormat::Sequential)).unwrap();
    assert_eq!(packed.load_ts_stream(0).unwrap(), sequential.load_ts_stream(0).unwrap());
    assert_eq!(
        packed.quick_load_ts_stream(0).unwrap(),
        sequential.quick_load_ts_stream(0).unwrap()
    );
}

#[test]
fn spectra_drop_the_trailing_partial_window() {
    let file = TelemetryFile::open(container(ChannelFormat::Sequential)).unwrap();

    let (frequencies, spectra) = file.load_fft_stream(50, 0).unwrap();
    assert_eq!(frequencies.len(), 50);
    assert_eq!(frequencies[25], 0.0);
    assert_eq!(spectra[&0].dim(), (1, 1, 2, 50));

    let (_, quick) = file.quick_load_fft_stream(50, 0).unwrap();
    assert_eq!(quick.dim(), (1, 2, 2, 50));
    // Mean removal leaves nothing in the zero-frequency bin.
    assert!(quick[[0, 0, 0, 25]].norm() < 1e-9);
    assert!(quick[[0, 1, 1, 25]].norm() < 1e-9);
}

#[test]
fn malformed_attributes_fail_at_open() {
    let mut unknown_format = container(ChannelFormat::Packed);
    unknown_format.set_attribute(&stream_group(0), "channel_format", "interleaved-4");
    let error = TelemetryFile::open(unknown_format).expect_err("unknown format");
    assert_eq!(error.kind(), HerculesErrorKind::Format);
    assert!(error.message().contains("unsupported channel format"));

    let mut twelve_bit = container(ChannelFormat::Packed);
    twelve_bit.set_attribute(&channel_group(1), "bit_depth", 12_i64);
    let error = TelemetryFile::open(twelve_bit).expect_err("12-bit channel");
    assert_eq!(error.kind(), HerculesErrorKind::Calibration);

    let mut missing_channel = container(ChannelFormat::Packed);
    missing_channel.remove_group(&channel_group(0));
    let error = TelemetryFile::open(missing_channel).expect_err("missing channel group");
    assert_eq!(error.placeholder(), "TELEMETRY.MISSING_GROUP");
}

#[test]
fn stream_errors_are_reported_per_call() {
    let mut container = container(ChannelFormat::Packed);
    container.insert_block(0, 0, 0, vec![1, 2, 3]);
    let file = TelemetryFile::open(container).unwrap();

    let error = file.load_ts_stream(0).expect_err("odd block");
    assert_eq!(error.kind(), HerculesErrorKind::Format);

    let error = file.quick_load_ts_stream(4).expect_err("unknown stream");
    assert_eq!(error.kind(), HerculesErrorKind::Index);

    let error = file.quick_load_fft_stream(0, 0).expect_err("empty window");
    assert_eq!(error.kind(), HerculesErrorKind::InvalidArgument);
}
