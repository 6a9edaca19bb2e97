use super::CliError;
use super::helpers::{parse_all, parse_exact_values, parse_metadata, render_hit};
use anyhow::Context;
use hercules_core::campaign::{DEFAULT_SCAN_PATTERN, scan_campaign};
use hercules_core::grid::{Dataset, DatasetContext, Lookup, LookupMode};
use hercules_core::telemetry::TelemetryFile;
use ndarray::s;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct BuildArgs {
    /// Campaign root holding one directory per run
    #[arg(long)]
    root: PathBuf,

    /// Glob (relative to the root) selecting run config records
    #[arg(long, default_value = DEFAULT_SCAN_PATTERN)]
    pattern: String,

    /// Store the index without nearest-neighbour resolvers
    #[arg(long)]
    no_snapping: bool,

    /// Extra campaign metadata; values are parsed as JSON when possible
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    meta: Vec<String>,
}

#[derive(clap::Args)]
pub(super) struct RootArgs {
    /// Campaign root holding the dataset index
    #[arg(long)]
    root: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct LookupArgs {
    /// Campaign root holding the dataset index
    #[arg(long)]
    root: PathBuf,

    /// Lookup mode: exact, index or snapped
    #[arg(long, default_value = "exact")]
    mode: String,

    /// One value per field, in field order
    #[arg(required = true, allow_hyphen_values = true)]
    values: Vec<String>,
}

#[derive(clap::Args)]
pub(super) struct TelemetryArgs {
    /// Telemetry file in the JSON container layout
    file: PathBuf,

    /// Stream to decode
    #[arg(long, default_value_t = 0)]
    stream: usize,

    /// Spectrum window length; prints the peak bin of every channel
    #[arg(long)]
    window: Option<usize>,
}

pub(super) fn run_build_command(args: BuildArgs) -> Result<i32, CliError> {
    let extra_metadata = parse_metadata(&args.meta)?;
    let campaign = scan_campaign(&args.root, &args.pattern)?;

    let mut metadata = campaign.meta_data().clone();
    metadata.extend(extra_metadata);
    let mut context = DatasetContext::new(&args.root).with_metadata(metadata);
    if args.no_snapping {
        context = context.without_snapping();
    }

    let dataset = Dataset::build(context, campaign.runs())?;
    dataset.dump()?;
    info!(root = %args.root.display(), "campaign indexed");

    println!(
        "Indexed {} runs over [{}] with shape {:?}",
        dataset.len(),
        dataset.field_names().join(", "),
        dataset.shape()
    );
    println!("Index: {}", dataset.index_path().display());
    Ok(0)
}

pub(super) fn run_info_command(args: RootArgs) -> Result<i32, CliError> {
    let dataset = Dataset::load(&args.root)?;
    print!("{}", dataset.info_text());
    println!();
    println!("Indexed runs: {}", dataset.len());
    println!("Shape: {:?}", dataset.shape());
    println!("Dense: {}", dataset.is_dense());
    println!("Snapping: {}", dataset.is_snappable());
    Ok(0)
}

pub(super) fn run_lookup_command(args: LookupArgs) -> Result<i32, CliError> {
    let mode: LookupMode = args.mode.parse()?;
    let dataset = Dataset::load(&args.root)?;

    let hit = match mode {
        LookupMode::Exact => {
            let values = parse_exact_values(&args.values);
            dataset.lookup(Lookup::Exact(&values))?
        }
        LookupMode::Index => {
            let positions = parse_all::<usize>(&args.values, "axis position")?;
            dataset.lookup(Lookup::Index(&positions))?
        }
        LookupMode::Snapped => {
            let values = parse_all::<f64>(&args.values, "number")?;
            dataset.lookup(Lookup::Snapped(&values))?
        }
    };
    println!("{}", render_hit(&hit));
    Ok(0)
}

pub(super) fn run_list_command(args: RootArgs) -> Result<i32, CliError> {
    let dataset = Dataset::load(&args.root)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "# {}", dataset.field_names().join("\t"))
        .context("failed to write run listing")?;
    for hit in &dataset {
        writeln!(stdout, "{}", render_hit(&hit)).context("failed to write run listing")?;
    }
    Ok(0)
}

pub(super) fn run_telemetry_command(args: TelemetryArgs) -> Result<i32, CliError> {
    let file = TelemetryFile::open_path(&args.file)?;
    let stream = file.stream_attributes(args.stream)?;
    println!(
        "Stream {}: {} channels ({}), {} acquisitions x {} records at {} Hz",
        args.stream,
        stream.n_channels(),
        stream.channel_format,
        stream.n_acquisitions,
        stream.n_records,
        stream.sample_rate_hz()
    );

    let series = file.quick_load_ts_stream(args.stream)?;
    for (position, channel) in stream.channels.iter().enumerate() {
        let samples = series.slice(s![.., position, ..]);
        let power = samples.iter().map(|sample| sample.norm_sqr()).sum::<f64>();
        let rms = (power / samples.len().max(1) as f64).sqrt();
        println!("Channel {channel}: rms {rms:.6} V");
    }

    if let Some(window) = args.window {
        let (frequencies, spectra) = file.quick_load_fft_stream(window, args.stream)?;
        for (position, channel) in stream.channels.iter().enumerate() {
            let mut bin_power = vec![0.0_f64; window];
            for (bin, power) in bin_power.iter_mut().enumerate() {
                *power = spectra
                    .slice(s![.., position, .., bin])
                    .iter()
                    .map(|value| value.norm_sqr())
                    .sum();
            }
            let peak = bin_power
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(bin, _)| bin);
            match peak {
                Some(bin) => println!(
                    "Channel {channel}: peak bin {bin} at {} Hz",
                    frequencies[bin]
                ),
                None => println!("Channel {channel}: no spectrum"),
            }
        }
    }
    Ok(0)
}
