//! `imgdiff` CLI - compare two images and report an RMS difference.
//!
//! Exit codes: 0 identical, 1 different, 2 error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgdiff::{compare_images, load_rgba, Comparison, ComparisonOptions, Error, Outcome};

/// Compare two images pixel-by-pixel and write a visual diff.
#[derive(Parser, Debug)]
#[command(name = "imgdiff")]
#[command(version, about, long_about = None)]
struct Args {
    /// Baseline image path.
    #[arg(value_name = "BASELINE")]
    baseline: PathBuf,

    /// Current image path.
    #[arg(value_name = "CURRENT")]
    current: PathBuf,

    /// Where to write the diff image when any pixel differs.
    #[arg(long, default_value = "diff.png", value_name = "PATH")]
    out: PathBuf,

    /// Largest RMS still treated as identical.
    #[arg(long, default_value = "0.0", value_name = "FLOAT", allow_negative_numbers = true)]
    max_rms: f64,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("imgdiff={log_level}")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let outcome = match run(&args) {
        Ok(outcome) => outcome,
        Err(err @ Error::ImageLoad { .. }) => {
            eprintln!("Failed to read images: {err}");
            Outcome::Error
        }
        Err(err @ Error::ImageSave { .. }) => {
            eprintln!("Failed to write diff image: {err}");
            Outcome::Error
        }
    };

    tracing::debug!(?outcome, "done");
    ExitCode::from(outcome.exit_code())
}

fn run(args: &Args) -> imgdiff::Result<Outcome> {
    let baseline = load_rgba(&args.baseline)?;
    let current = load_rgba(&args.current)?;

    let diff = match compare_images(&baseline, &current) {
        Comparison::Compared(diff) => diff,
        Comparison::DifferentSizes { baseline, current } => {
            eprintln!("Different sizes: {baseline:?} vs {current:?}");
            return Ok(Outcome::Different);
        }
    };

    if diff.has_difference() {
        diff.save(&args.out)?;
    }

    let opts = ComparisonOptions::new().max_rms(args.max_rms);
    let outcome = diff.outcome(&opts);

    if outcome == Outcome::Different {
        println!(
            "Images differ (RMS={}, threshold={}). Wrote {}",
            format_score(diff.rms),
            format_score(opts.threshold()),
            args.out.display()
        );
    }

    Ok(outcome)
}

/// Four decimals; NaN is spelled `nan` like the infinities (`inf`).
fn format_score(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.4}")
    }
}
