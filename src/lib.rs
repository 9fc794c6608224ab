//! Convert ozone box CSV logs (free-text header block + tabular samples with
//! a QC flag) into a NetCDF file with a single unlimited `time` dimension.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info};

pub mod dataset;
pub mod error;
pub mod header;
pub mod qc;
pub mod table;
pub mod writer;

pub use dataset::OzoneDataset;
pub use error::{ConvertError, Result};
pub use header::read_header;
pub use qc::QcCodebook;
pub use table::{parse_timestamp, read_measurements, MeasurementRow};
pub use writer::write_netcdf;

// ─────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────
pub const DEFAULT_SKIPROWS: usize = 5;
pub const DEFAULT_TITLE:    &str  = "Ozone Box Unit 1 Data";

// Input column names. "Falg" is how the instrument software spells it.
pub const COL_TIME:       &str = "Time (UTC)";
pub const COL_OZONE:      &str = "Ozone Concentration (ppb)";
pub const COL_QC_VALUE:   &str = "Quality Control Falg Value";
pub const COL_QC_MEANING: &str = "Quality Control Flag Meaning";

pub const VAR_TIME:  &str = "time";
pub const VAR_OZONE: &str = "ozone_concentration";
pub const VAR_QC:    &str = "qc_flag";

/// Knobs for one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Lines before the column header row.
    pub skiprows: usize,
    /// Header lines 0..4 are instrument, contact, description, creator.
    pub expected_format: bool,
    /// Replaces the derived or default title.
    pub title: Option<String>,
    /// Stamped into the `history` attribute.
    pub created: NaiveDateTime,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            skiprows:        DEFAULT_SKIPROWS,
            expected_format: true,
            title:           None,
            created:         NaiveDateTime::default(),
        }
    }
}

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub output:   PathBuf,
    pub rows:     usize,
    pub qc_codes: usize,
    pub start:    DateTime<Utc>,
    pub end:      DateTime<Utc>,
}

pub(crate) fn timeit<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let t0 = Instant::now();
    let out = f();
    debug!(stage = label, elapsed = ?t0.elapsed());
    out
}

/// Input path with its extension swapped for `.nc`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("nc")
}

/// Read `input`, derive the container contents and write them to `output`.
///
/// All parsing finishes before `output` is touched, so a bad input never
/// leaves a file behind.
pub fn convert(input: &Path, output: &Path, opts: &ConvertOptions) -> Result<ConversionSummary> {
    let (header, rows) = timeit("read_input", || -> Result<_> {
        let mut rdr = BufReader::new(File::open(input).map_err(|e| ConvertError::io(input, e))?);
        let header = header::read_header_from(&mut rdr, opts.skiprows, input)?;
        let rows = table::read_measurements_from(rdr, input)?;
        Ok((header, rows))
    })?;
    info!(input = %input.display(), rows = rows.len(), "parsed input");

    let ds = timeit("derive", || OzoneDataset::build(&header, &rows, opts, input))?;
    debug!(
        flag_values = ?ds.codebook.flag_values(),
        flag_meanings = %ds.codebook.flag_meanings(),
        "qc codebook"
    );

    timeit("write_netcdf", || write_netcdf(&ds, output))?;
    info!(output = %output.display(), rows = ds.len(), "wrote netcdf");

    Ok(ConversionSummary {
        output:   output.to_path_buf(),
        rows:     ds.len(),
        qc_codes: ds.codebook.len(),
        start:    ds.start,
        end:      ds.end,
    })
}
