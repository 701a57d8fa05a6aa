use std::{
    collections::HashSet,
    io::{self, Write},
    path::Path,
};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use thiserror::Error;

use crate::{
    error::CompareError,
    io_utils,
    pipeline::{PairSheet, RunResult},
    source::Cell,
    summary::Summary,
};

pub const SUMMARY_SHEET: &str = "Summary";
const MAX_SHEET_NAME: usize = 31;
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("XLSX error: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Compare(#[from] CompareError),
    #[error("{0}")]
    Output(String),
}

fn sanitize_sheet_name(label: &str) -> String {
    let replaced: String = label
        .chars()
        .map(|ch| if INVALID_SHEET_CHARS.contains(&ch) { '_' } else { ch })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'').trim();
    let truncated: String = trimmed.chars().take(MAX_SHEET_NAME).collect();
    let name = truncated.trim().trim_matches('\'').trim().to_string();
    if name.is_empty() {
        "Pair".to_string()
    } else {
        name
    }
}

/// Worksheet names for the given pair labels: invalid characters replaced,
/// truncated to 31 characters and unique (case-insensitively) among
/// themselves and the summary sheet.
pub fn sheet_names<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken: HashSet<String> = HashSet::from([SUMMARY_SHEET.to_lowercase()]);
    let mut names = Vec::new();
    for label in labels {
        let base = sanitize_sheet_name(label);
        let mut candidate = base.clone();
        let mut counter = 2usize;
        while taken.contains(&candidate.to_lowercase()) {
            let suffix = format!(" ({counter})");
            let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
            candidate = format!("{}{suffix}", base.chars().take(keep).collect::<String>());
            counter += 1;
        }
        taken.insert(candidate.to_lowercase());
        names.push(candidate);
    }
    names
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<(), XlsxError> {
    match cell {
        Cell::Empty => {}
        Cell::Number(value) if value.is_finite() => {
            sheet.write_number(row, col, *value)?;
        }
        other => {
            sheet.write_string(row, col, other.as_text().as_ref())?;
        }
    }
    Ok(())
}

fn write_optional_number(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
) -> Result<(), XlsxError> {
    if let Some(value) = value {
        sheet.write_number(row, col, value)?;
    }
    Ok(())
}

fn write_header(sheet: &mut Worksheet, headers: &[String], format: &Format) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, format)?;
    }
    Ok(())
}

fn write_pair_sheet(sheet: &mut Worksheet, view: &PairSheet, header: &Format) -> Result<(), XlsxError> {
    write_header(sheet, &view.headers, header)?;
    for (idx, row) in view.rows.iter().enumerate() {
        let r = idx as u32 + 1;
        let mut col = 0u16;
        write_cell(sheet, r, col, &row.identifier)?;
        for cell in &row.metadata {
            col += 1;
            write_cell(sheet, r, col, cell)?;
        }
        write_optional_number(sheet, r, col + 1, row.outcome.portal.value())?;
        write_optional_number(sheet, r, col + 2, row.outcome.omni.value())?;
        sheet.write_string(r, col + 3, row.outcome.status.label())?;
        write_optional_number(sheet, r, col + 4, row.outcome.status.difference())?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    result: &RunResult,
    header: &Format,
    percent: &Format,
) -> Result<(), XlsxError> {
    let headers = Summary::HEADERS.map(str::to_string);
    write_header(sheet, &headers, header)?;
    for (idx, pair) in result.pairs().iter().enumerate() {
        let r = idx as u32 + 1;
        let s = &pair.summary;
        sheet.write_string(r, 0, pair.label())?;
        let counts = [
            (1, s.total),
            (2, s.valid),
            (3, s.equal),
            (5, s.unequal),
            (7, s.portal_higher),
            (8, s.omni_higher),
            (9, s.empty),
            (10, s.empty_portal),
            (11, s.empty_omni),
            (12, s.empty_both),
            (13, s.unmatched),
        ];
        for (col, count) in counts {
            sheet.write_number(r, col, count as f64)?;
        }
        sheet.write_number_with_format(r, 4, s.pct_equal / 100.0, percent)?;
        sheet.write_number_with_format(r, 6, s.pct_unequal / 100.0, percent)?;
    }
    Ok(())
}

/// Writes one worksheet per pair followed by the `Summary` sheet.
pub fn write_workbook(result: &RunResult, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let percent = Format::new().set_num_format("0.00%");

    let names = sheet_names(result.pairs().iter().map(|p| p.label()));
    for (pair, name) in result.pairs().iter().zip(&names) {
        let view = result.pair_sheet(pair.label())?;
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_pair_sheet(sheet, &view, &header)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SUMMARY_SHEET)?;
        write_summary_sheet(sheet, result, &header, &percent)?;
    }

    workbook.save(path)?;
    Ok(())
}

/// Summary table as CSV, one row per pair, percentages rendered as `12.34%`.
pub fn write_summary_csv(result: &RunResult, path: &Path) -> Result<(), ExportError> {
    let mut writer = io_utils::open_csv_writer(Some(path), b',')
        .map_err(|err| ExportError::Output(format!("{err:#}")))?;
    writer.write_record(Summary::HEADERS)?;
    for pair in result.pairs() {
        writer.write_record(pair.summary.render_row(pair.label()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Flattened joined table with every pair's derived columns. `None` or `-`
/// writes to stdout.
pub fn write_joined_csv(
    result: &RunResult,
    path: Option<&Path>,
    delimiter: u8,
) -> Result<(), ExportError> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)
        .map_err(|err| ExportError::Output(format!("{err:#}")))?;
    writer.write_record(result.headers())?;
    for record in result.records() {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(result: &RunResult, mut out: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut out, &result.report())?;
    writeln!(out)?;
    Ok(())
}
