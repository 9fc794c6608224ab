use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    error::{ConvertError, Result},
    qc::QcCodebook,
    table::MeasurementRow,
    ConvertOptions, DEFAULT_TITLE,
};

const DATE_FMT:  &str = "%Y-%m-%d";
const STAMP_FMT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Lines of the header block that carry metadata when the file is in the
/// expected format: instrument, contact, description, creator.
pub const HEADER_FIELDS: [&str; 4] = ["instrument_name", "contact", "description", "creator"];

/// Everything that goes into the output file, fully derived and ready to write.
#[derive(Debug, Clone, PartialEq)]
pub struct OzoneDataset {
    /// Global attributes in the order they are written.
    pub global_attributes: Vec<(&'static str, String)>,
    pub time_units:        String,
    pub time:              Vec<f64>,
    pub ozone:             Vec<f32>,
    pub qc_flag:           Vec<i32>,
    pub codebook:          QcCodebook,
    pub start:             DateTime<Utc>,
    pub end:               DateTime<Utc>,
}

impl OzoneDataset {
    /// Derive the container contents from the parsed input.
    ///
    /// `source` is the input path, used for error messages only.
    pub fn build(
        header:  &[String],
        rows:    &[MeasurementRow],
        opts:    &ConvertOptions,
        source:  &Path,
    ) -> Result<Self> {
        let (first, last) = match (rows.first(), rows.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(ConvertError::EmptyData { path: source.to_path_buf() }),
        };
        if opts.expected_format && header.len() < HEADER_FIELDS.len() {
            return Err(ConvertError::MalformedHeader {
                path:   source.to_path_buf(),
                reason: format!(
                    "expected format needs {} header lines, got {}",
                    HEADER_FIELDS.len(),
                    header.len()
                ),
            });
        }

        let (start, end) = (first.time, last.time);
        check_time_axis(rows);

        let title = match (&opts.title, opts.expected_format) {
            (Some(t), _)  => t.clone(),
            (None, true)  => format!("{} Data", header[0]),
            (None, false) => DEFAULT_TITLE.to_string(),
        };

        let mut global_attributes = vec![("title", title)];
        if opts.expected_format {
            global_attributes.extend(HEADER_FIELDS.iter().copied().zip(header.iter().cloned()));
        }
        global_attributes.push(("history", format!("Created at {}", opts.created.format("%Y-%m-%d %H:%M:%S"))));
        global_attributes.push(("start_time", start.format(STAMP_FMT).to_string()));
        global_attributes.push(("end_time", end.format(STAMP_FMT).to_string()));

        let time_units = format!("seconds since {} 00:00:00 +00:00", start.format(DATE_FMT));
        debug!(%time_units, n_global = global_attributes.len(), "derived container metadata");

        Ok(OzoneDataset {
            global_attributes,
            time_units,
            time:     rows.iter().map(|r| f64::from(r.seconds_past_midnight())).collect(),
            ozone:    rows.iter().map(|r| r.ozone_ppb).collect(),
            qc_flag:  rows.iter().map(|r| r.qc_value).collect(),
            codebook: QcCodebook::from_rows(rows),
            start,
            end,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn global_attribute(&self, name: &str) -> Option<&str> {
        self.global_attributes
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

// The time axis only records seconds past midnight of each row against the
// first row's date, so anything spanning days or running backwards is
// written as is but flagged.
fn check_time_axis(rows: &[MeasurementRow]) {
    let first_day = rows[0].time.date_naive();
    if let Some(r) = rows.iter().find(|r| r.time.date_naive() != first_day) {
        warn!(
            first = %first_day,
            other = %r.time.date_naive(),
            "input spans more than one day, time values restart at 0 each midnight"
        );
    }
    if let Some(i) = rows.windows(2).position(|w| w[1].time < w[0].time) {
        warn!(row = i + 2, "timestamps are not in ascending order");
    }
}
