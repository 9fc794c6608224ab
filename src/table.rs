use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use csv::StringRecord;
use tracing::debug;

use crate::{
    error::{ConvertError, Result},
    header::read_header_from,
    COL_OZONE, COL_QC_MEANING, COL_QC_VALUE, COL_TIME,
};

/// One sample from the data block.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub time:       DateTime<Utc>,
    pub ozone_ppb:  f32,
    pub qc_value:   i32,
    pub qc_meaning: String,
}

impl MeasurementRow {
    /// `hour*3600 + minute*60 + second`, sub-second part dropped.
    pub fn seconds_past_midnight(&self) -> u32 {
        self.time.num_seconds_from_midnight()
    }
}

// Day-first layouts. Two-digit years go first: `%Y` would happily take "23"
// as the year 0023.
const NAIVE_LAYOUTS: &[&str] = &[
    "%d/%m/%y %H:%M:%S%.f",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_LAYOUTS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S%.f%:z",
    "%d/%m/%Y %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Parse a `Time (UTC)` cell. Naive values are taken as UTC, values carrying
/// an offset are shifted to UTC.
pub fn parse_timestamp(cell: &str) -> Option<DateTime<Utc>> {
    let s = cell.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(s, layout) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse every data row of `path` after skipping `skiprows` header lines.
pub fn read_measurements(path: &Path, skiprows: usize) -> Result<Vec<MeasurementRow>> {
    let mut rdr = BufReader::new(File::open(path).map_err(|e| ConvertError::io(path, e))?);
    read_header_from(&mut rdr, skiprows, path)?;
    read_measurements_from(rdr, path)
}

/// Parse the tabular block (column header line first) from `rdr`.
///
/// `path` is only used for error messages.
pub fn read_measurements_from<R: Read>(rdr: R, path: &Path) -> Result<Vec<MeasurementRow>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(rdr);

    let headers = rdr
        .headers()
        .map_err(|source| ConvertError::Csv { path: path.to_path_buf(), row: 0, source })?
        .clone();
    let cols = Columns::locate(&headers, path)?;
    debug!(?headers, "located data columns");

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let rec = result.map_err(|source| ConvertError::Csv { path: path.to_path_buf(), row, source })?;
        rows.push(cols.parse_record(&rec, row)?);
    }
    Ok(rows)
}

// Field positions of the four required columns.
struct Columns {
    time:       usize,
    ozone:      usize,
    qc_value:   usize,
    qc_meaning: usize,
}

impl Columns {
    fn locate(headers: &StringRecord, path: &Path) -> Result<Self> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| ConvertError::MissingColumn { path: path.to_path_buf(), column })
        };
        Ok(Columns {
            time:       find(COL_TIME)?,
            ozone:      find(COL_OZONE)?,
            qc_value:   find(COL_QC_VALUE)?,
            qc_meaning: find(COL_QC_MEANING)?,
        })
    }

    fn parse_record(&self, rec: &StringRecord, row: usize) -> Result<MeasurementRow> {
        let cell = |idx: usize| rec.get(idx).unwrap_or("");

        let raw_time = cell(self.time);
        let time = parse_timestamp(raw_time)
            .ok_or_else(|| ConvertError::BadTimestamp { row, value: raw_time.to_string() })?;

        let raw_ozone = cell(self.ozone);
        let ozone_ppb = raw_ozone.trim().parse::<f32>().map_err(|_| ConvertError::BadNumber {
            row,
            column: COL_OZONE,
            value:  raw_ozone.to_string(),
        })?;

        let raw_qc = cell(self.qc_value);
        let qc_value = raw_qc.trim().parse::<i32>().map_err(|_| ConvertError::BadNumber {
            row,
            column: COL_QC_VALUE,
            value:  raw_qc.to_string(),
        })?;

        Ok(MeasurementRow {
            time,
            ozone_ppb,
            qc_value,
            qc_meaning: cell(self.qc_meaning).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER_LINE: &str =
        "Time (UTC),Ozone Concentration (ppb),Quality Control Falg Value,Quality Control Flag Meaning\n";

    fn parse(body: &str) -> Result<Vec<MeasurementRow>> {
        let text = format!("{HEADER_LINE}{body}");
        read_measurements_from(text.as_bytes(), Path::new("mem"))
    }

    #[test]
    fn timestamps_are_day_first() {
        let t = parse_timestamp("02/01/2023 13:45:07").unwrap();
        assert_eq!(t.to_rfc3339(), "2023-01-02T13:45:07+00:00");

        let t = parse_timestamp("13/01/2023 00:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2023-01-13T00:00:00+00:00");

        let t = parse_timestamp("05.03.2021 01:02:03").unwrap();
        assert_eq!(t.to_rfc3339(), "2021-03-05T01:02:03+00:00");
    }

    #[test]
    fn two_digit_year_is_not_year_23() {
        let t = parse_timestamp("01/02/23 10:00:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2023-02-01T10:00:00+00:00");
    }

    #[test]
    fn iso_and_offset_timestamps() {
        let t = parse_timestamp("2023-06-30 23:59:59").unwrap();
        assert_eq!(t.to_rfc3339(), "2023-06-30T23:59:59+00:00");

        let t = parse_timestamp("2023-06-30T01:00:00+02:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2023-06-29T23:00:00+00:00");

        let t = parse_timestamp("2023-06-30 01:00:00+00:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2023-06-30T01:00:00+00:00");
    }

    #[test]
    fn day_first_with_offset() {
        let t = parse_timestamp("01/01/2023 00:00:05+00:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2023-01-01T00:00:05+00:00");

        let t = parse_timestamp("02/01/2023 00:30:00+0100").unwrap();
        assert_eq!(t.to_rfc3339(), "2023-01-01T23:30:00+00:00");
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("32/01/2023 00:00:00").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn seconds_past_midnight_drops_fraction() {
        let row = MeasurementRow {
            time:       parse_timestamp("01/01/2023 23:59:59.750").unwrap(),
            ozone_ppb:  0.0,
            qc_value:   0,
            qc_meaning: String::new(),
        };
        assert_eq!(row.seconds_past_midnight(), 86_399);
    }

    #[test]
    fn parses_rows_in_order() {
        let rows = parse(
            "01/01/2023 00:00:05,31.5,0,Good\n\
             01/01/2023 01:00:10,32.25,2,Below detection limit\n",
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].seconds_past_midnight(), 5);
        assert_eq!(rows[1].seconds_past_midnight(), 3_610);
        assert_eq!(rows[1].ozone_ppb, 32.25);
        assert_eq!(rows[1].qc_value, 2);
        assert_eq!(rows[1].qc_meaning, "Below detection limit");
    }

    #[test]
    fn columns_are_found_by_name() {
        let text = "Quality Control Flag Meaning,Quality Control Falg Value,Extra,Ozone Concentration (ppb),Time (UTC)\n\
                    Good,0,x,40.0,01/01/2023 00:00:01\n";
        let rows = read_measurements_from(text.as_bytes(), Path::new("mem")).unwrap();
        assert_eq!(rows[0].qc_meaning, "Good");
        assert_eq!(rows[0].ozone_ppb, 40.0);
        assert_eq!(rows[0].seconds_past_midnight(), 1);
    }

    #[test]
    fn corrected_spelling_is_a_missing_column() {
        let text = "Time (UTC),Ozone Concentration (ppb),Quality Control Flag Value,Quality Control Flag Meaning\n\
                    01/01/2023 00:00:01,40.0,0,Good\n";
        let err = read_measurements_from(text.as_bytes(), Path::new("mem")).unwrap_err();
        match err {
            ConvertError::MissingColumn { column, .. } => assert_eq!(column, COL_QC_VALUE),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_cells_report_their_row() {
        let err = parse("01/01/2023 00:00:05,31.5,0,Good\nnot a date,1.0,0,Good\n").unwrap_err();
        assert!(matches!(err, ConvertError::BadTimestamp { row: 2, .. }), "{err}");

        let err = parse("01/01/2023 00:00:05,,0,Good\n").unwrap_err();
        assert!(matches!(err, ConvertError::BadNumber { row: 1, column: COL_OZONE, .. }), "{err}");

        let err = parse("01/01/2023 00:00:05,1.0,zero,Good\n").unwrap_err();
        assert!(matches!(err, ConvertError::BadNumber { row: 1, column: COL_QC_VALUE, .. }), "{err}");
    }

    #[test]
    fn ragged_row_is_a_csv_error() {
        let err = parse("01/01/2023 00:00:05,31.5,0\n").unwrap_err();
        assert!(matches!(err, ConvertError::Csv { row: 1, .. }), "{err}");
    }

    #[test]
    fn reads_file_after_skipping_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.csv");
        let text = format!(
            "Sensor X\nAlice\nTest run\nBob\n\n{HEADER_LINE}\
             01/01/2023 00:00:05,30.5,0,Good\n\
             01/01/2023 00:00:10,31.5,1,Suspect\n"
        );
        std::fs::write(&path, text).unwrap();

        let rows = read_measurements(&path, 5).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].seconds_past_midnight(), 10);
        assert_eq!(rows[1].qc_meaning, "Suspect");

        let err = read_measurements(&path, 20).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedHeader { .. }), "{err}");
    }

    #[test]
    fn header_only_yields_no_rows() {
        assert!(parse("").unwrap().is_empty());
    }
}
