//! Daily behavioral recordings aligned with scan days
//!
//! Three device exports (sleep ring, wristband physiology, smartphone mood
//! questionnaires) are merged on their calendar date, gaps are filled with
//! rounded column means, and only the days a fixed lag before a scan are kept.

use crate::io::configuration::{
    DATE_COLUMN, MOOD_COLUMNS, MOOD_DATE_FORMAT, MOOD_DEVICE, MRI_DEVICE, MRI_DIR,
    PHYSIOLOGY_COLUMNS, PHYSIOLOGY_DEVICE, SCAN_DATE_FORMAT, SLEEP_COLUMNS, SLEEP_DATE_FORMAT,
    SLEEP_DEVICE, StudyConfig,
};
use crate::io::discovery::create_parent_dir;
use crate::io::error::{
    AnalysisError, Result, WithPath, computation_error, invalid_parameter, invalid_source,
};
use crate::math::normalization::{fill_missing, rounded_column_means};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use ndarray::{Array2, Axis};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Cell contents read as a missing value
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "-nan", "null", "None"];

/// Date format used when writing tables
const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp layouts accepted for timezone-aware date columns
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
];

/// How the date column of a CSV export is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// Plain calendar date with a `chrono` format string
    Calendar(&'static str),
    /// Timestamp with UTC offset, reduced to its UTC calendar date
    Timestamp,
}

impl DateFormat {
    /// Parse one cell
    pub fn parse(self, value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        match self {
            Self::Calendar(format) => NaiveDate::parse_from_str(value, format).ok(),
            Self::Timestamp => parse_timestamp_date(value),
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Calendar(format) => format,
            Self::Timestamp => "timestamp with UTC offset",
        }
    }
}

fn parse_timestamp_date(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Some(dt) = TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
    {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    // Naive timestamps are taken as UTC already
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

fn parse_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if MISSING_MARKERS.contains(&raw) {
        Some(f64::NAN)
    } else {
        raw.parse().ok()
    }
}

/// Feature values indexed by calendar date; NaN marks a missing value
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorTable {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl BehaviorTable {
    /// Build a table, checking that the dimensions agree
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is not `dates.len() × columns.len()`
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (dates.len(), columns.len()) {
            return Err(invalid_source(&format!(
                "table of {} dates and {} columns cannot hold a {}x{} matrix",
                dates.len(),
                columns.len(),
                values.nrows(),
                values.ncols()
            )));
        }
        Ok(Self {
            dates,
            columns,
            values,
        })
    }

    /// Row dates
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Feature column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Feature matrix (rows = days), without the date column
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Take ownership of the feature matrix
    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Column values by name
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.values.column(index).to_vec())
    }

    /// Relational outer join on the date
    ///
    /// Rows are ordered by date. A date present in only one table gets NaN in
    /// the other table's columns. A date repeated on both sides yields every
    /// combination of the matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined rows do not fill the result table
    pub fn outer_join(&self, other: &Self) -> Result<Self> {
        let left_index = row_index(&self.dates);
        let right_index = row_index(&other.dates);
        let keys: BTreeSet<NaiveDate> = left_index.keys().chain(right_index.keys()).copied().collect();

        let width = self.columns.len() + other.columns.len();
        let mut dates = Vec::new();
        let mut flat = Vec::new();

        for date in keys {
            let left_rows: Vec<Option<usize>> = left_index
                .get(&date)
                .map_or_else(|| vec![None], |rows| rows.iter().copied().map(Some).collect());
            let right_rows: Vec<Option<usize>> = right_index
                .get(&date)
                .map_or_else(|| vec![None], |rows| rows.iter().copied().map(Some).collect());

            for left in &left_rows {
                for right in &right_rows {
                    dates.push(date);
                    push_row(&mut flat, &self.values, *left, self.columns.len());
                    push_row(&mut flat, &other.values, *right, other.columns.len());
                }
            }
        }

        let columns = self
            .columns
            .iter()
            .chain(other.columns.iter())
            .cloned()
            .collect();
        let values = Array2::from_shape_vec((dates.len(), width), flat)
            .map_err(|e| computation_error("outer join", &e))?;

        Ok(Self {
            dates,
            columns,
            values,
        })
    }

    /// Replace missing values by the rounded mean of their column
    pub fn fill_with_rounded_means(&mut self) {
        let means = rounded_column_means(&self.values);
        fill_missing(&mut self.values, &means);
    }

    /// Rows whose date is in `keep`, in table order
    pub fn select_dates(&self, keep: &HashSet<NaiveDate>) -> Self {
        let rows: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, date)| keep.contains(*date))
            .map(|(i, _)| i)
            .collect();

        Self {
            dates: rows.iter().filter_map(|&i| self.dates.get(i).copied()).collect(),
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), &rows),
        }
    }

    /// Read selected columns of a device export
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a column is missing, or
    /// a value is not numeric. Rows with an empty date are skipped.
    pub fn from_device_csv(path: &Path, columns: &[&str], date_format: DateFormat) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_path(path)?;
        let headers = reader.headers().with_path(path)?.clone();

        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| AnalysisError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };
        let date_index = position(DATE_COLUMN)?;
        let indices = columns
            .iter()
            .map(|&name| position(name))
            .collect::<Result<Vec<_>>>()?;

        let mut dates = Vec::new();
        let mut flat = Vec::new();
        for record in reader.records() {
            let record = record.with_path(path)?;
            let raw_date = record.get(date_index).unwrap_or_default().trim();
            if raw_date.is_empty() {
                tracing::warn!("Skipping row without date in {}", path.display());
                continue;
            }
            let date = date_format
                .parse(raw_date)
                .ok_or_else(|| AnalysisError::DateParse {
                    path: path.to_path_buf(),
                    value: raw_date.to_string(),
                    format: date_format.description(),
                })?;

            for (&index, name) in indices.iter().zip(columns.iter()) {
                let raw = record.get(index).unwrap_or_default();
                let value = parse_value(raw).ok_or_else(|| {
                    invalid_source(&format!(
                        "non-numeric value '{raw}' in column '{name}' of {}",
                        path.display()
                    ))
                })?;
                flat.push(value);
            }
            dates.push(date);
        }

        let values = Array2::from_shape_vec((dates.len(), columns.len()), flat)
            .map_err(|e| computation_error("assemble table", &e))?;
        Self::new(
            dates,
            columns.iter().map(|c| (*c).to_string()).collect(),
            values,
        )
    }

    /// Write the table with a leading ISO date column
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        create_parent_dir(path)?;

        let mut writer = csv::Writer::from_path(path).with_path(path)?;
        let header: Vec<&str> = std::iter::once(DATE_COLUMN)
            .chain(self.columns.iter().map(String::as_str))
            .collect();
        writer.write_record(&header).with_path(path)?;

        for (date, row) in self.dates.iter().zip(self.values.rows()) {
            let record: Vec<String> = std::iter::once(date.format(OUTPUT_DATE_FORMAT).to_string())
                .chain(row.iter().map(ToString::to_string))
                .collect();
            writer.write_record(&record).with_path(path)?;
        }

        writer.flush().with_operation(path, "write CSV")?;
        Ok(())
    }

    /// Read a table written by [`BehaviorTable::write_csv`]
    ///
    /// # Errors
    ///
    /// Returns an error if the file has no date column or holds invalid cells
    pub fn read_csv(path: &Path) -> Result<Self> {
        let headers = csv::Reader::from_path(path)
            .with_path(path)?
            .headers()
            .with_path(path)?
            .clone();
        let columns: Vec<&str> = headers
            .iter()
            .filter(|h| h.trim() != DATE_COLUMN)
            .collect();
        Self::from_device_csv(path, &columns, DateFormat::Calendar(OUTPUT_DATE_FORMAT))
    }
}

fn row_index(dates: &[NaiveDate]) -> BTreeMap<NaiveDate, Vec<usize>> {
    let mut index: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (row, date) in dates.iter().enumerate() {
        index.entry(*date).or_default().push(row);
    }
    index
}

fn push_row(flat: &mut Vec<f64>, values: &Array2<f64>, row: Option<usize>, width: usize) {
    match row {
        Some(r) => flat.extend(values.row(r).iter().copied()),
        None => flat.extend(std::iter::repeat_n(f64::NAN, width)),
    }
}

/// Scan calendar of the configured subject
///
/// The calendar lives in the `mri` directory two levels above the behavioral
/// directory (`<root>/<modality>/<device-dir>` → `<root>/mri`).
pub fn scan_calendar_path(behav_path: &Path, config: &StudyConfig) -> PathBuf {
    let root = behav_path
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""));
    root.join(MRI_DIR).join(config.device_file(MRI_DEVICE))
}

/// Read the scan days and shift each back by `lag` days
///
/// A negative lag shifts forward, selecting days after the scan.
///
/// # Errors
///
/// Returns an error if the calendar cannot be read, lacks a date column or
/// holds an invalid date, or if the lag moves a day out of the date range
pub fn read_scan_days(path: &Path, lag: i64) -> Result<HashSet<NaiveDate>> {
    let table = BehaviorTable::from_device_csv(path, &[], DateFormat::Calendar(SCAN_DATE_FORMAT))?;
    let shift = TimeDelta::try_days(lag)
        .ok_or_else(|| invalid_parameter("lag", &lag, &"exceeds the representable range"))?;
    table
        .dates()
        .iter()
        .map(|date| {
            date.checked_sub_signed(shift).ok_or_else(|| {
                invalid_parameter("lag", &lag, &format!("shifts {date} out of range"))
            })
        })
        .collect()
}

/// Behavioral features of the days `lag` days before each scan
///
/// Sleep, mood and physiology exports of the configured subject are read
/// from `behav_path`, outer-merged on date (in that column order), gaps are
/// filled with rounded column means, and the rows are restricted to the
/// shifted scan days. A negative lag selects days after each scan.
///
/// # Errors
///
/// Returns an error if an export or the scan calendar cannot be read, or if
/// the lag moves a scan day out of the date range
pub fn get_behav_data_movie(behav_path: &Path, lag: i64, config: &StudyConfig) -> Result<BehaviorTable> {
    let sleep = BehaviorTable::from_device_csv(
        &behav_path.join(config.device_file(SLEEP_DEVICE)),
        SLEEP_COLUMNS,
        DateFormat::Calendar(SLEEP_DATE_FORMAT),
    )?;
    let physiology = BehaviorTable::from_device_csv(
        &behav_path.join(config.device_file(PHYSIOLOGY_DEVICE)),
        PHYSIOLOGY_COLUMNS,
        DateFormat::Timestamp,
    )?;
    let mood = BehaviorTable::from_device_csv(
        &behav_path.join(config.device_file(MOOD_DEVICE)),
        MOOD_COLUMNS,
        DateFormat::Calendar(MOOD_DATE_FORMAT),
    )?;

    let mut merged = sleep.outer_join(&mood)?.outer_join(&physiology)?;
    merged.fill_with_rounded_means();

    let calendar = scan_calendar_path(behav_path, config);
    let scan_days = read_scan_days(&calendar, lag)?;
    let selected = merged.select_dates(&scan_days);

    tracing::info!(
        "Selected {} of {} behavioral days ({} scans, lag {lag})",
        selected.len(),
        merged.len(),
        scan_days.len()
    );

    Ok(selected)
}
