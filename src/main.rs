// USAGE cargo run --release -- path/to/ozone_box.csv [-o out.nc] [-s 5] [--ignore-header]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use chrono::Local;
use ozone_to_netcdf::{convert, default_output_path, ConvertOptions, DEFAULT_SKIPROWS};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Convert an ozone box CSV file to a NetCDF file.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV file to convert
    input_file: PathBuf,

    /// NetCDF file to create; defaults to the input name with a .nc extension
    #[arg(short, long)]
    outfile: Option<PathBuf>,

    /// Lines to skip before the column headers
    #[arg(short, long, default_value_t = DEFAULT_SKIPROWS)]
    skiprows: usize,

    /// Header lines are not instrument/contact/description/creator
    #[arg(long)]
    ignore_header: bool,

    /// Title attribute to use instead of the derived one
    #[arg(long)]
    title: Option<String>,

    /// trace, debug, info, warn or error (RUST_LOG wins when set)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = args.outfile.clone().unwrap_or_else(|| default_output_path(&args.input_file));
    let opts = ConvertOptions {
        skiprows:        args.skiprows,
        expected_format: !args.ignore_header,
        title:           args.title.clone(),
        created:         Local::now().naive_local(),
    };

    let summary = convert(&args.input_file, &output, &opts).with_context(|| {
        format!("converting {} → {}", args.input_file.display(), output.display())
    })?;

    info!(
        rows = summary.rows,
        qc_codes = summary.qc_codes,
        start = %summary.start.format("%Y-%m-%d %H:%M:%SZ"),
        end = %summary.end.format("%Y-%m-%d %H:%M:%SZ"),
        "finished OK, wrote {}",
        summary.output.display()
    );
    Ok(())
}
