use std::collections::VecDeque;

use super::types::LocationReport;

pub const DEFAULT_CAPACITY: usize = 20;

/// Most-recent-first buffer of reports kept for on-device display.
#[derive(Debug, Clone)]
pub struct ReportLog {
    capacity: usize,
    entries: VecDeque<LocationReport>,
}

impl Default for ReportLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ReportLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, report: LocationReport) {
        self.entries.push_front(report);
        self.entries.truncate(self.capacity);
    }

    /// Index 0 is the newest report.
    pub fn snapshot(&self) -> Vec<LocationReport> {
        self.entries.iter().cloned().collect()
    }

    pub fn rows(&self) -> Vec<DisplayRow> {
        self.entries.iter().map(DisplayRow::from).collect()
    }
}

/// One rendered table row: id, lat, lon, speed (km/h), time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub operator_id: String,
    pub latitude: String,
    pub longitude: String,
    pub speed_kmh: String,
    pub timestamp: String,
}

impl From<&LocationReport> for DisplayRow {
    fn from(report: &LocationReport) -> Self {
        Self {
            operator_id: report.operator_id().to_string(),
            latitude: format!("{:.5}", report.latitude()),
            longitude: format!("{:.5}", report.longitude()),
            speed_kmh: format!("{:.1}", report.speed_kmh()),
            timestamp: report.captured_at().to_string(),
        }
    }
}

const HEADERS: [&str; 5] = ["Bus ID", "Latitude", "Longitude", "Speed (km/h)", "Time"];

pub fn render_table(rows: &[DisplayRow]) -> String {
    let cells: Vec<[&str; 5]> = rows
        .iter()
        .map(|r| {
            [
                r.operator_id.as_str(),
                r.latitude.as_str(),
                r.longitude.as_str(),
                r.speed_kmh.as_str(),
                r.timestamp.as_str(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for line in std::iter::once(&HEADERS).chain(cells.iter()) {
        let padded: Vec<String> = line
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{Encoder, Fix, OperatorId};
    use chrono::{FixedOffset, Utc};

    fn report(id: &str, lat: f64) -> LocationReport {
        let encoder = Encoder::new(FixedOffset::east_opt(0).unwrap());
        encoder.encode(
            &OperatorId::new(id).unwrap(),
            &Fix::new(lat, 77.6, Some(1.0)),
            Utc::now(),
        )
    }

    #[test]
    fn never_exceeds_capacity_and_keeps_newest_first() {
        let mut log = ReportLog::default();
        for i in 0..57 {
            log.push(report("BUS7", i as f64));
            let reports = log.snapshot();
            assert!(reports.len() <= DEFAULT_CAPACITY);
            assert_eq!(reports[0].latitude(), i as f64);
        }
        assert_eq!(log.snapshot().len(), DEFAULT_CAPACITY);

        let lats: Vec<f64> = log.snapshot().iter().map(|r| r.latitude()).collect();
        let expected: Vec<f64> = (37..57).rev().map(|i| i as f64).collect();
        assert_eq!(lats, expected);
    }

    #[test]
    fn twenty_first_push_evicts_oldest() {
        let mut log = ReportLog::default();
        for i in 0..20 {
            log.push(report("BUS7", i as f64));
        }
        assert_eq!(log.snapshot().last().unwrap().latitude(), 0.0);

        log.push(report("BUS7", 20.0));
        let reports = log.snapshot();
        assert_eq!(reports.len(), 20);
        assert_eq!(reports.last().unwrap().latitude(), 1.0);
    }

    #[test]
    fn keeps_reports_from_different_operators() {
        let mut log = ReportLog::with_capacity(3);
        log.push(report("BUS7", 1.0));
        log.push(report("BUS9", 2.0));
        log.push(report("BUS7", 2.0));

        let ids: Vec<String> = log
            .snapshot()
            .iter()
            .map(|r| r.operator_id().to_string())
            .collect();
        assert_eq!(ids, vec!["BUS7", "BUS9", "BUS7"]);
    }

    #[test]
    fn rows_are_formatted_for_display() {
        let mut log = ReportLog::default();
        log.push(report("BUS7", 12.9));
        let row = &log.rows()[0];
        assert_eq!(row.operator_id, "BUS7");
        assert_eq!(row.latitude, "12.90000");
        assert_eq!(row.longitude, "77.60000");
        assert_eq!(row.speed_kmh, "3.6");
    }

    #[test]
    fn table_has_header_and_one_line_per_row() {
        let mut log = ReportLog::default();
        log.push(report("BUS7", 1.0));
        log.push(report("BUS7", 2.0));
        let table = render_table(&log.rows());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Bus ID"));
        assert!(lines[1].contains("2.00000"));
        assert!(lines[2].contains("1.00000"));
    }
}
