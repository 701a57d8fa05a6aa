//! Single-key join; each Portal row takes the first Omni row with its id.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    error::{CompareError, Side},
    source::{Cell, SourceTable},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    /// Keep every Portal row; rows without an Omni match are flagged
    #[default]
    Left,
    /// Keep only rows found in both tables
    Inner,
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinMode::Left => f.write_str("left"),
            JoinMode::Inner => f.write_str("inner"),
        }
    }
}

/// One physical column of the joined table and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinedColumn {
    pub name: String,
    pub side: Side,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub cells: Vec<Cell>,
    pub matched: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinDiagnostics {
    pub portal_rows: usize,
    pub omni_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Distinct Omni identifiers that occur on more than one row.
    pub duplicate_omni_identifiers: usize,
    /// Unmatched Portal identifiers that would match an Omni identifier after
    /// case folding, leading-zero or trailing `.0` removal.
    pub suspected_format_mismatches: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTable {
    columns: Vec<JoinedColumn>,
    rows: Vec<JoinedRow>,
    mode: JoinMode,
    diagnostics: JoinDiagnostics,
}

impl JoinedTable {
    pub fn columns(&self) -> &[JoinedColumn] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn rows(&self) -> &[JoinedRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn mode(&self) -> JoinMode {
        self.mode
    }

    pub fn diagnostics(&self) -> &JoinDiagnostics {
        &self.diagnostics
    }

    /// Physical index of the column selected as `source` from `side`.
    pub fn position(&self, side: Side, source: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.side == side && c.source == source)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Physical layout of the joined table: Portal selections first, then Omni.
/// A name selected from both tables is suffixed with its origin on both
/// sides; remaining clashes get a numeric counter.
pub fn resolve_columns(portal_columns: &[String], omni_columns: &[String]) -> Vec<JoinedColumn> {
    let portal_names: HashSet<&str> = portal_columns.iter().map(String::as_str).collect();
    let omni_names: HashSet<&str> = omni_columns.iter().map(String::as_str).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut layout = Vec::with_capacity(portal_columns.len() + omni_columns.len());
    let sides = portal_columns
        .iter()
        .map(|c| (Side::Portal, c, omni_names.contains(c.as_str())))
        .chain(
            omni_columns
                .iter()
                .map(|c| (Side::Omni, c, portal_names.contains(c.as_str()))),
        );
    for (side, source, collides) in sides {
        let base = if collides {
            format!("{source}{}", side.suffix())
        } else {
            source.clone()
        };
        let mut candidate = base.clone();
        let mut counter = 2usize;
        while seen.contains(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        seen.insert(candidate.clone());
        layout.push(JoinedColumn {
            name: candidate,
            side,
            source: source.clone(),
        });
    }
    layout
}

pub fn identifier_key(cell: &Cell) -> String {
    cell.as_text().trim().to_string()
}

fn loose_key(key: &str) -> String {
    let lowered = key.to_lowercase();
    let without_fraction = lowered.strip_suffix(".0").unwrap_or(&lowered);
    let trimmed = without_fraction.trim_start_matches('0');
    if trimmed.is_empty() && !without_fraction.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn column_indices(
    table: &SourceTable,
    side: Side,
    columns: &[String],
) -> Result<Vec<usize>, CompareError> {
    columns
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| CompareError::UnknownColumn {
                    side,
                    column: name.clone(),
                })
        })
        .collect()
}

pub fn join(
    portal: &SourceTable,
    omni: &SourceTable,
    portal_id: &str,
    omni_id: &str,
    portal_columns: &[String],
    omni_columns: &[String],
    mode: JoinMode,
) -> Result<JoinedTable, CompareError> {
    let portal_key_idx = column_indices(portal, Side::Portal, &[portal_id.to_string()])?[0];
    let omni_key_idx = column_indices(omni, Side::Omni, &[omni_id.to_string()])?[0];
    let portal_indices = column_indices(portal, Side::Portal, portal_columns)?;
    let omni_indices = column_indices(omni, Side::Omni, omni_columns)?;
    let columns = resolve_columns(portal_columns, omni_columns);

    let mut lookup: HashMap<String, usize> = HashMap::with_capacity(omni.row_count());
    let mut duplicates: HashSet<String> = HashSet::new();
    for (row_idx, row) in omni.rows().iter().enumerate() {
        let key = identifier_key(&row[omni_key_idx]);
        if key.is_empty() {
            continue;
        }
        if lookup.contains_key(&key) {
            duplicates.insert(key);
        } else {
            lookup.insert(key, row_idx);
        }
    }

    let mut diagnostics = JoinDiagnostics {
        portal_rows: portal.row_count(),
        omni_rows: omni.row_count(),
        duplicate_omni_identifiers: duplicates.len(),
        ..JoinDiagnostics::default()
    };
    let mut loose_omni: Option<HashSet<String>> = None;
    let mut rows = Vec::with_capacity(portal.row_count());

    for portal_row in portal.rows() {
        let key = identifier_key(&portal_row[portal_key_idx]);
        let omni_row = if key.is_empty() {
            None
        } else {
            lookup.get(&key).map(|idx| &omni.rows()[*idx])
        };
        let matched = omni_row.is_some();
        if matched {
            diagnostics.matched += 1;
        } else {
            diagnostics.unmatched += 1;
            if !key.is_empty() {
                let loose = loose_omni.get_or_insert_with(|| {
                    lookup.keys().map(|k| loose_key(k)).collect::<HashSet<_>>()
                });
                if loose.contains(&loose_key(&key)) {
                    diagnostics.suspected_format_mismatches += 1;
                }
            }
            if mode == JoinMode::Inner {
                continue;
            }
        }

        let mut cells = Vec::with_capacity(columns.len());
        cells.extend(portal_indices.iter().map(|idx| portal_row[*idx].clone()));
        match omni_row {
            Some(omni_row) => cells.extend(omni_indices.iter().map(|idx| omni_row[*idx].clone())),
            None => cells.extend(omni_indices.iter().map(|_| Cell::Empty)),
        }
        rows.push(JoinedRow { cells, matched });
    }

    debug!("Joined columns: {:?}", columns.iter().map(|c| &c.name).collect::<Vec<_>>());
    info!(
        "{} join complete: {} output row(s), {} matched, {} unmatched",
        mode,
        rows.len(),
        diagnostics.matched,
        diagnostics.unmatched
    );
    Ok(JoinedTable {
        columns,
        rows,
        mode,
        diagnostics,
    })
}
