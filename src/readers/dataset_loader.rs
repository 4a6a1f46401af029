use crate::error::{ProcessingError, Result};
use crate::models::{timestamp_from_parts, AirQualityRecord, Dataset, Pollutant};
use crate::utils::constants::{
    DEFAULT_BUFFER_SIZE, FIELD_DELIMITER, STATION_COLUMN, TIME_COLUMNS,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// One raw input row: column name -> cell text.
pub type RawRow = HashMap<String, String>;

/// Counts of what the loader tolerated while building a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped_invalid_time: usize,
    pub dropped_missing_station: usize,
    pub duplicate_timestamps: usize,
    pub coerced_cells: usize,
    pub missing_columns: Vec<Pollutant>,
}

impl LoadReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_invalid_time + self.dropped_missing_station + self.duplicate_timestamps
    }

    pub fn summary(&self) -> String {
        format!(
            "Rows: {} read, {} kept ({} bad time, {} no station, {} duplicate timestamps)\n\
            Unparseable measurement cells: {}",
            self.rows_read,
            self.rows_kept,
            self.dropped_invalid_time,
            self.dropped_missing_station,
            self.duplicate_timestamps,
            self.coerced_cells
        )
    }
}

/// Positions of the known columns within a header row.
#[derive(Debug, Clone)]
struct ColumnLayout {
    station: usize,
    time: [usize; 4],
    pollutants: Vec<(Pollutant, usize)>,
}

impl ColumnLayout {
    fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        if headers.is_empty() || headers.iter().all(|h| h.as_ref().is_empty()) {
            return Err(ProcessingError::MissingHeader);
        }

        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.as_ref() == name)
                .ok_or_else(|| ProcessingError::MissingColumn {
                    column: name.to_string(),
                })
        };

        let station = position(STATION_COLUMN)?;
        let time = [
            position(TIME_COLUMNS[0])?,
            position(TIME_COLUMNS[1])?,
            position(TIME_COLUMNS[2])?,
            position(TIME_COLUMNS[3])?,
        ];

        let pollutants = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| Pollutant::from_column(h.as_ref()).map(|p| (p, idx)))
            .collect();

        Ok(Self {
            station,
            time,
            pollutants,
        })
    }

    fn present_pollutants(&self) -> impl Iterator<Item = Pollutant> + '_ {
        self.pollutants.iter().map(|(p, _)| *p)
    }

    fn missing_pollutants(&self) -> Vec<Pollutant> {
        Pollutant::ALL
            .into_iter()
            .filter(|p| !self.pollutants.iter().any(|(q, _)| q == p))
            .collect()
    }

    /// Coerce one row. `None` means the row has no usable identity and is dropped.
    fn parse_row<'a, F>(&self, field: F, report: &mut LoadReport) -> Option<AirQualityRecord>
    where
        F: Fn(usize) -> Option<&'a str>,
    {
        let parts: Vec<Option<i64>> = self
            .time
            .iter()
            .map(|&idx| field(idx).and_then(parse_integral))
            .collect();

        let timestamp = match parts.as_slice() {
            [Some(year), Some(month), Some(day), Some(hour)] => {
                compose_timestamp(*year, *month, *day, *hour)
            }
            _ => None,
        };
        let Some(timestamp) = timestamp else {
            report.dropped_invalid_time += 1;
            return None;
        };

        let station = field(self.station).map(str::trim).unwrap_or_default();
        if station.is_empty() {
            report.dropped_missing_station += 1;
            return None;
        }

        let mut record = AirQualityRecord::new(normalize_station(station), timestamp);
        for &(pollutant, idx) in &self.pollutants {
            let raw = field(idx).map(str::trim).unwrap_or_default();
            let value = parse_measurement(raw);
            if value.is_none() && !is_missing_marker(raw) {
                report.coerced_cells += 1;
            }
            record.set_value(pollutant, value);
        }

        Some(record)
    }
}

/// Builds a [`Dataset`] from `;`-delimited air-quality tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetLoader;

impl DatasetLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read a dataset from a file on disk
    pub fn load_path(&self, path: &Path) -> Result<Dataset> {
        self.load_path_with_report(path).map(|(dataset, _)| dataset)
    }

    pub fn load_path_with_report(&self, path: &Path) -> Result<(Dataset, LoadReport)> {
        info!(path = %path.display(), "loading air-quality data");
        // The handle is dropped when this scope ends, on success or on error
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        self.load_reader_with_report(reader)
    }

    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Dataset> {
        self.load_reader_with_report(reader).map(|(dataset, _)| dataset)
    }

    pub fn load_reader_with_report<R: Read>(&self, reader: R) -> Result<(Dataset, LoadReport)> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(FIELD_DELIMITER)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .byte_headers()?
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();
        let layout = ColumnLayout::resolve(&headers[..])?;

        let mut report = LoadReport::default();
        let mut records = Vec::new();
        let mut row = csv::ByteRecord::new();

        while csv_reader.read_byte_record(&mut row)? {
            report.rows_read += 1;
            // Invalid UTF-8 in a cell is a coercion failure like any other bad text
            let field = |idx: usize| row.get(idx).and_then(|b| std::str::from_utf8(b).ok());
            if let Some(record) = layout.parse_row(field, &mut report) {
                records.push(record);
            }
        }

        Ok(Self::assemble(records, &layout, report))
    }

    /// Build a dataset from in-memory rows. `columns` is the header of the
    /// table the rows came from; cells missing from a row read as empty.
    pub fn load_rows<I>(&self, columns: &[&str], rows: I) -> Result<Dataset>
    where
        I: IntoIterator<Item = RawRow>,
    {
        let layout = ColumnLayout::resolve(columns)?;
        let mut report = LoadReport::default();
        let mut records = Vec::new();

        for row in rows {
            report.rows_read += 1;
            let field = |idx: usize| columns.get(idx).and_then(|c| row.get(*c)).map(String::as_str);
            if let Some(record) = layout.parse_row(field, &mut report) {
                records.push(record);
            }
        }

        Ok(Self::assemble(records, &layout, report).0)
    }

    fn assemble(
        records: Vec<AirQualityRecord>,
        layout: &ColumnLayout,
        mut report: LoadReport,
    ) -> (Dataset, LoadReport) {
        let candidates = records.len();
        let dataset = Dataset::from_records(records, layout.present_pollutants());

        report.duplicate_timestamps = candidates - dataset.len();
        report.rows_kept = dataset.len();
        report.missing_columns = layout.missing_pollutants();

        for pollutant in &report.missing_columns {
            warn!(column = %pollutant, "pollutant column not found in input");
        }
        if report.rows_dropped() > 0 {
            debug!(
                bad_time = report.dropped_invalid_time,
                no_station = report.dropped_missing_station,
                duplicates = report.duplicate_timestamps,
                "dropped rows while loading"
            );
        }
        info!(
            rows_read = report.rows_read,
            rows_kept = report.rows_kept,
            coerced_cells = report.coerced_cells,
            "dataset loaded"
        );

        (dataset, report)
    }
}

/// Numeric text that names a whole number (`"7"`, `"7.0"`, `" 7 "`).
fn parse_integral(raw: &str) -> Option<i64> {
    let value = raw.trim().parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn compose_timestamp(year: i64, month: i64, day: i64, hour: i64) -> Option<chrono::NaiveDateTime> {
    timestamp_from_parts(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
        u32::try_from(hour).ok()?,
    )
}

fn parse_measurement(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Cells that conventionally mean "not measured" and so are not counted as coercions.
fn is_missing_marker(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan")
}

/// Numeric station codes written as floats (`"12.0"`) read back as `"12"`.
fn normalize_station(raw: &str) -> String {
    match parse_integral(raw) {
        Some(code) if raw.contains('.') => code.to_string(),
        _ => raw.to_string(),
    }
}
