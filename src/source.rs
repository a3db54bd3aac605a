//! Defines the [`Table`], [`Record`], and [`Error`] types and the logic for
//! reading CSV source files from disk into memory. A [`Table`] is untyped:
//! every cell is either a string or missing. See [`crate::model`] for the
//! conversion into typed records.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// An in-memory CSV table. Rows are kept in source order, which later
/// determines listing order on the generated pages.
#[derive(Debug)]
pub struct Table {
    /// The file the table was read from. Kept for error messages.
    pub path: PathBuf,

    /// The header row.
    pub headers: Vec<String>,

    /// The data rows, in file order.
    pub rows: Vec<Record>,
}

/// A single data row. Maps column names to cell values; empty cells are
/// stored as `None`.
#[derive(Debug)]
pub struct Record {
    /// The 1-based line number of the row in its source file.
    pub line: u64,

    values: HashMap<String, Option<String>>,
}

impl Record {
    /// Returns the value of `column`, or `None` if the column doesn't exist
    /// or the cell is empty.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .and_then(|value| value.as_deref())
    }
}

impl Table {
    /// Returns the first header among `names` present in the table. Used for
    /// columns that go by more than one name (e.g., `city_slug` and `slug`).
    pub fn column(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| {
            self.headers
                .iter()
                .find(|header| header == name)
                .map(|header| header.as_str())
        })
    }

    /// Like [`Table::column`] but fails with [`Error::MalformedRecord`] if
    /// none of `names` is present.
    pub fn require(&self, names: &[&str]) -> Result<&str> {
        self.column(names).ok_or_else(|| Error::MalformedRecord {
            path: self.path.clone(),
            line: 1,
            detail: format!("missing required column `{}`", names.join("` or `")),
        })
    }

    /// Returns the non-empty value of `column` in `record`, failing with
    /// [`Error::MalformedRecord`] if the cell is empty.
    pub fn required_value<'r>(&self, record: &'r Record, column: &str) -> Result<&'r str> {
        record
            .get(column)
            .ok_or_else(|| self.malformed(record, format!("empty `{}` value", column)))
    }

    /// Parses the value of `column` in `record` as a number. Empty cells and
    /// absent columns yield `Ok(None)`; anything that isn't a finite decimal
    /// number is an [`Error::MalformedRecord`].
    pub fn number(&self, record: &Record, column: &str) -> Result<Option<f64>> {
        match record.get(column) {
            None => Ok(None),
            Some(raw) => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(self.malformed(
                    record,
                    format!("`{}` is not a number: {:?}", column, raw),
                )),
            },
        }
    }

    /// Builds an [`Error::MalformedRecord`] pointing at `record`.
    pub fn malformed(&self, record: &Record, detail: String) -> Error {
        Error::MalformedRecord {
            path: self.path.clone(),
            line: record.line,
            detail,
        }
    }
}

/// Reads the CSV file at `path` into a [`Table`]. The first row is the
/// header. Cells are trimmed, and empty cells become missing values.
///
/// Fails with [`Error::SourceNotFound`] if `path` doesn't exist and with
/// [`Error::MalformedRecord`] if a row's field count disagrees with the
/// header.
pub fn read_table(path: &Path) -> Result<Table> {
    use csv::{ReaderBuilder, Trim};

    if !path.exists() {
        return Err(Error::SourceNotFound {
            path: path.to_owned(),
        });
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|err| csv_error(path, err))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| csv_error(path, err))?
        .iter()
        .map(|header| header.to_owned())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| csv_error(path, err))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        let values = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| {
                let cell = match cell.is_empty() {
                    true => None,
                    false => Some(cell.to_owned()),
                };
                (header.clone(), cell)
            })
            .collect();
        rows.push(Record { line, values });
    }

    Ok(Table {
        path: path.to_owned(),
        headers,
        rows,
    })
}

// Field-count and encoding problems are the input's fault; everything else
// csv reports (I/O, mostly) stays wrapped as-is.
fn csv_error(path: &Path, err: csv::Error) -> Error {
    use csv::ErrorKind;

    let malformed = match err.kind() {
        ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => Some((
            pos.as_ref().map(|pos| pos.line()).unwrap_or(0),
            format!("expected {} fields, found {}", expected_len, len),
        )),
        ErrorKind::Utf8 { pos, err } => Some((
            pos.as_ref().map(|pos| pos.line()).unwrap_or(0),
            err.to_string(),
        )),
        _ => None,
    };

    match malformed {
        Some((line, detail)) => Error::MalformedRecord {
            path: path.to_owned(),
            line,
            detail,
        },
        None => Error::Csv {
            path: path.to_owned(),
            err,
        },
    }
}

/// Represents the result of reading or converting a [`Table`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading a source table.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file doesn't exist.
    SourceNotFound { path: PathBuf },

    /// Returned when a row doesn't fit the table: wrong field count, missing
    /// required column or value, or an unparseable number.
    MalformedRecord {
        path: PathBuf,
        line: u64,
        detail: String,
    },

    /// Returned for other errors from the CSV reader.
    Csv { path: PathBuf, err: csv::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::SourceNotFound { path } => {
                write!(f, "Source file not found: '{}'", path.display())
            }
            Error::MalformedRecord { path, line, detail } => {
                write!(f, "Malformed record at '{}' line {}: {}", path.display(), line, detail)
            }
            Error::Csv { path, err } => {
                write!(f, "Reading '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SourceNotFound { .. } => None,
            Error::MalformedRecord { .. } => None,
            Error::Csv { path: _, err } => Some(err),
        }
    }
}
