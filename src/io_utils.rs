//! I/O helpers shared by the loaders and exporters.
//!
//! - **Format detection**: workbook extensions (`.xlsx`, `.xls`, ...) route to
//!   the spreadsheet loader, everything else is read as delimited text.
//! - **Delimiter resolution**: `.tsv` → tab, otherwise comma, unless overridden.
//! - **Encoding**: delimited input is decoded via `encoding_rs` (UTF-8 default).
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited,
    Workbook,
}

impl InputFormat {
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext)
                if WORKBOOK_EXTENSIONS
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate)) =>
            {
                InputFormat::Workbook
            }
            _ => InputFormat::Delimited,
        }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

/// Opens a CSV writer on `path`, or stdout when the path is absent or `-`.
pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let target: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .from_writer(target))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}
