use std::collections::BTreeMap;

use crate::table::MeasurementRow;

/// Distinct QC flag values (ascending) paired with the meaning of the first
/// row that carried each value. Meanings have spaces replaced by `_` so they
/// can be packed into one space separated `flag_meanings` attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QcCodebook {
    values:   Vec<i32>,
    meanings: Vec<String>,
}

impl QcCodebook {
    pub fn from_rows(rows: &[MeasurementRow]) -> Self {
        let mut first_seen = BTreeMap::<i32, &str>::new();
        for row in rows {
            first_seen.entry(row.qc_value).or_insert(&row.qc_meaning);
        }

        let (values, meanings) = first_seen
            .into_iter()
            .map(|(value, meaning)| (value, sanitize_meaning(meaning)))
            .unzip();
        QcCodebook { values, meanings }
    }

    /// Sorted distinct codes, for the `flag_values` attribute.
    pub fn flag_values(&self) -> &[i32] {
        &self.values
    }

    /// Space-joined meanings, for the `flag_meanings` attribute.
    pub fn flag_meanings(&self) -> String {
        self.meanings.join(" ")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn sanitize_meaning(meaning: &str) -> String {
    meaning.replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(qc_value: i32, qc_meaning: &str) -> MeasurementRow {
        MeasurementRow {
            time: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            ozone_ppb: 0.0,
            qc_value,
            qc_meaning: qc_meaning.to_string(),
        }
    }

    #[test]
    fn sorted_and_deduplicated() {
        let rows = [row(2, "Bad"), row(0, "Good"), row(2, "Bad"), row(1, "Suspect"), row(0, "Good")];
        let cb = QcCodebook::from_rows(&rows);
        assert_eq!(cb.flag_values(), &[0, 1, 2]);
        assert_eq!(cb.flag_meanings(), "Good Suspect Bad");
    }

    #[test]
    fn first_meaning_in_row_order_wins() {
        let rows = [row(3, "instrument warm up"), row(1, "ok"), row(3, "something else")];
        let cb = QcCodebook::from_rows(&rows);
        assert_eq!(cb.flag_values(), &[1, 3]);
        assert_eq!(cb.flag_meanings(), "ok instrument_warm_up");
    }

    #[test]
    fn meanings_split_back_index_for_index() {
        let rows = [row(-1, "missing value"), row(0, "Good"), row(9, "calibration in progress")];
        let cb = QcCodebook::from_rows(&rows);
        let joined = cb.flag_meanings();
        let split: Vec<_> = joined.split(' ').collect();
        assert_eq!(split.len(), cb.len());
        assert_eq!(split, vec!["missing_value", "Good", "calibration_in_progress"]);
    }

    #[test]
    fn no_rows_no_codes() {
        let cb = QcCodebook::from_rows(&[]);
        assert!(cb.is_empty());
        assert_eq!(cb.flag_meanings(), "");
    }
}
