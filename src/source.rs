//! Source tables: the two immutable inputs of a comparison run.
//!
//! A [`SourceTable`] is a header row plus rows of raw [`Cell`]s. Delimited
//! files yield only [`Cell::Empty`] and [`Cell::Text`]; workbooks also yield
//! [`Cell::Number`] for numeric cells. Only the first worksheet of a workbook
//! is read.

use std::{borrow::Cow, collections::HashSet, fmt, io::Read, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::{Encoding, UTF_8};
use log::debug;
use serde::Serialize;

use crate::io_utils::{self, InputFormat};

/// A raw, heterogeneous cell value as read from an input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Builds a cell from delimited text; a zero-length field is a missing cell.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(value) => value.is_nan(),
            Cell::Text(_) => false,
        }
    }

    /// Text rendering used for identifiers and CSV output. Whole numbers are
    /// rendered without a fractional part so `123.0` from a workbook reads `123`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(text) => Cow::Borrowed(text.as_str()),
            Cell::Number(value) => Cow::Owned(format_number(*value)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl SourceTable {
    /// Creates a table; every row is padded or truncated to the header width
    /// and duplicate header names receive `.1`, `.2`, ... suffixes.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let headers = dedupe_headers(headers);
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Convenience constructor from string cells, mostly for callers that
    /// already hold parsed text.
    pub fn from_strings<S: AsRef<str>>(name: &str, headers: &[S], rows: &[Vec<S>]) -> Self {
        Self::new(
            name,
            headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| Cell::from_raw(c.as_ref())).collect())
                .collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        &self.rows[row][column]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

pub fn load_table(path: &Path, options: &LoadOptions) -> Result<SourceTable> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string());
    let table = match InputFormat::detect(path) {
        InputFormat::Workbook => read_workbook(path, &name)?,
        InputFormat::Delimited => {
            let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
            let reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
            read_delimited_from(reader, &name, options.encoding)
                .with_context(|| format!("Reading delimited input {path:?}"))?
        }
    };
    debug!(
        "Loaded '{}': {} row(s), {} column(s)",
        table.name(),
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

pub fn read_delimited<R: Read>(
    reader: R,
    name: &str,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<SourceTable> {
    read_delimited_from(io_utils::open_csv_reader(reader, delimiter), name, encoding)
}

fn read_delimited_from<R: Read>(
    mut reader: csv::Reader<R>,
    name: &str,
    encoding: &'static Encoding,
) -> Result<SourceTable> {
    let headers = io_utils::reader_headers(&mut reader, encoding).context("Reading header row")?;
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        bail!("Input '{name}' has no header row");
    }
    let headers = headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            if header.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                header
            }
        })
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        rows.push(decoded.iter().map(|field| Cell::from_raw(field)).collect());
    }
    Ok(SourceTable::new(name, headers, rows))
}

fn read_workbook(path: &Path, name: &str) -> Result<SourceTable> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| anyhow!("Unable to open workbook {path:?}: {err}"))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("Workbook {path:?} does not contain any worksheets"))?
        .map_err(|err| anyhow!("Unable to read the first worksheet of {path:?}: {err}"))?;

    let mut rows_iter = range.rows();
    let header_row = rows_iter
        .next()
        .ok_or_else(|| anyhow!("The first worksheet of {path:?} is empty"))?;
    let headers = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| match workbook_cell(cell) {
            Cell::Empty => format!("Unnamed: {idx}"),
            other => other.as_text().trim().to_string(),
        })
        .collect::<Vec<_>>();

    let rows = rows_iter
        .map(|row| row.iter().map(workbook_cell).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(Cell::is_missing))
        .collect();
    Ok(SourceTable::new(name, headers, rows))
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) if text.is_empty() => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Bool(value) => Cell::Text(value.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    headers
        .into_iter()
        .map(|header| {
            let mut candidate = header.clone();
            let mut counter = 1usize;
            while seen.contains(&candidate) {
                candidate = format!("{header}.{counter}");
                counter += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}
