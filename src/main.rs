use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use raw2fits_rs::image_pipeline::{
    BayerArrangement, ConversionError, EXIT_FATAL, ExtractionConfig, ImageSink,
    MissingFieldPolicy, OutputFormat, RawImageReader, RawToPlanesPipeline, TiffCompression,
};
use raw2fits_rs::logger;
use tracing::{error, info, warn};

const DEFAULT_ARRANGEMENT: BayerArrangement = BayerArrangement::Rggb;

#[derive(Parser)]
#[command(name = "raw2fits_rs")]
#[command(version, about = "Split Bayer RAW captures into one monochrome image per filter", long_about = None)]
struct Cli {
    /// RAW capture(s) to split
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Increase diagnostic output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output directory, created if absent
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    destination: PathBuf,

    /// Bayer arrangement (RGGB, BGGR, GRBG or GBRG); taken from the capture when omitted
    #[arg(short, long, value_name = "PATTERN")]
    bayer: Option<String>,

    /// Binning factor
    #[arg(short = 'n', long, value_name = "N", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    binning: u32,

    /// Output format (fits or tiff)
    #[arg(short, long, value_name = "FORMAT", default_value = "fits")]
    format: String,

    /// TIFF compression (none, lzw, deflate-fast, deflate, deflate-best)
    #[arg(long, value_name = "METHOD", default_value = "none")]
    compression: String,

    /// TIFF predictor (2 = horizontal differencing)
    #[arg(long, value_name = "PREDICTOR")]
    predictor: Option<u16>,

    /// Missing provenance fields: "omit" them or write "default" values
    #[arg(long, value_name = "POLICY", default_value = "omit")]
    missing: String,
}

/// Low byte of a status, so -1 is reported as 255. A failure whose low
/// byte is 0 is reported as 1.
fn exit_byte(code: i32) -> u8 {
    match (code & 0xff) as u8 {
        0 if code != 0 => 1,
        byte => byte,
    }
}

fn status(code: i32) -> ExitCode {
    ExitCode::from(exit_byte(code))
}

fn arrangement(requested: Option<&str>) -> BayerArrangement {
    match requested {
        None => BayerArrangement::FromDescriptor,
        Some(name) => BayerArrangement::from_name(name).unwrap_or_else(|e| {
            warn!("{}, using {}", e, DEFAULT_ARRANGEMENT);
            DEFAULT_ARRANGEMENT
        }),
    }
}

fn build_config(cli: &Cli) -> Result<ExtractionConfig, ConversionError> {
    let missing = match cli.missing.to_ascii_lowercase().as_str() {
        "omit" => MissingFieldPolicy::Omit,
        "default" => MissingFieldPolicy::WriteDefault,
        other => {
            return Err(ConversionError::Configuration(format!(
                "unknown missing-field policy {:?}",
                other
            )));
        }
    };

    let config = ExtractionConfig::builder()
        .arrangement(arrangement(cli.bayer.as_deref()))
        .binning(cli.binning as usize)
        .output_format(cli.format.parse::<OutputFormat>()?)
        .compression(cli.compression.parse::<TiffCompression>()?)
        .predictor(cli.predictor)
        .missing_fields(missing)
        .verbosity(cli.verbose)
        .build();
    config.validate()?;
    Ok(config)
}

fn run_batch<R: RawImageReader, S: ImageSink>(
    pipeline: RawToPlanesPipeline<R, S>,
    inputs: &[PathBuf],
    destination: &Path,
) -> i32 {
    let config = pipeline.config();
    info!(
        arrangement = %config.arrangement,
        binning = config.binning,
        format = %config.output_format,
        "Splitting {} capture(s)",
        inputs.len()
    );

    let report = pipeline.convert_files(inputs, destination);
    info!(
        "{} of {} capture(s) converted",
        report.succeeded(),
        report.outcomes.len()
    );
    report.exit_code()
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = match build_config(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(e.exit_code());
        }
    };

    std::fs::create_dir_all(&cli.destination).with_context(|| {
        format!("Failed to create destination {}", cli.destination.display())
    })?;

    let code = match config.output_format {
        OutputFormat::Fits => run_batch(
            RawToPlanesPipeline::new(config),
            &cli.inputs,
            &cli.destination,
        ),
        OutputFormat::Tiff => run_batch(
            RawToPlanesPipeline::tiff(config),
            &cli.inputs,
            &cli.destination,
        ),
    };
    Ok(code)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => status(EXIT_FATAL),
            };
        }
    };

    logger::init(cli.verbose);

    match run(&cli) {
        Ok(code) => status(code),
        Err(e) => {
            error!("{:#}", e);
            status(EXIT_FATAL)
        }
    }
}
