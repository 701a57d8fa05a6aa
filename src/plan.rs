//! Comparison plan: the caller's selections validated against both tables.
//!
//! The plan maps every logical role (identifiers, metadata, each pair's two
//! price columns) to a physical joined-table column once per run. Fatal
//! problems fail fast with a [`CompareError`]; a pair or metadata column that
//! cannot be resolved is dropped with a warning instead.

use std::collections::HashSet;

use anyhow::{Result, anyhow};
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    detect::Role,
    error::{CompareError, Side},
    join::{self, JoinMode, JoinedColumn},
    source::SourceTable,
};

/// A declared Portal/Omni price column pair and its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPair {
    pub label: String,
    pub portal: String,
    pub omni: String,
}

impl ComparisonPair {
    pub fn new(
        label: impl Into<String>,
        portal: impl Into<String>,
        omni: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            portal: portal.into(),
            omni: omni.into(),
        }
    }

    /// Parses `label=portal_column,omni_column`; without `label=` the pair is
    /// named `Pair {position}`.
    pub fn parse(value: &str, position: usize) -> Result<Self> {
        let (label, columns) = match value.split_once('=') {
            Some((label, columns)) => (label.trim().to_string(), columns),
            None => (format!("Pair {position}"), value),
        };
        let (portal, omni) = columns.split_once(',').ok_or_else(|| {
            anyhow!("Pair '{value}' must look like LABEL=PORTAL_COLUMN,OMNI_COLUMN")
        })?;
        let (portal, omni) = (portal.trim(), omni.trim());
        if portal.is_empty() || omni.is_empty() {
            return Err(anyhow!("Pair '{value}' is missing a column name"));
        }
        Ok(Self::new(label, portal, omni))
    }

    /// Derived column names for this pair in the flattened result table.
    pub fn derived_headers(&self) -> [String; 4] {
        [
            format!("[{}] Portal Price", self.label),
            format!("[{}] Omni Price", self.label),
            format!("[{}] Status", self.label),
            format!("[{}] Difference", self.label),
        ]
    }
}

/// A Portal column carried into the result for context, optionally tagged
/// with the role it was detected under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataColumn {
    pub column: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl MetadataColumn {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            role: None,
        }
    }

    pub fn detected(role: Role, column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            role: Some(role),
        }
    }

    /// Header used in per-pair views: the role name when detected.
    pub fn display_name(&self) -> &str {
        self.role
            .map(Role::display_name)
            .unwrap_or(self.column.as_str())
    }
}

/// Everything the caller chose for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub portal_id: Option<String>,
    pub omni_id: Option<String>,
    pub pairs: Vec<ComparisonPair>,
    pub metadata: Vec<MetadataColumn>,
    pub mode: JoinMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPlan {
    pub portal_id: String,
    pub omni_id: String,
    pub mode: JoinMode,
    pub metadata: Vec<MetadataColumn>,
    pub pairs: Vec<ComparisonPair>,
    /// Portal columns to carry, in output order: identifier, metadata, prices.
    pub portal_columns: Vec<String>,
    /// Omni columns to carry: identifier, prices.
    pub omni_columns: Vec<String>,
    pub layout: Vec<JoinedColumn>,
    pub warnings: Vec<String>,
}

impl ComparisonPlan {
    pub fn resolve(
        portal: &SourceTable,
        omni: &SourceTable,
        selection: &Selection,
    ) -> Result<Self, CompareError> {
        let portal_id = require_identifier(portal, Side::Portal, selection.portal_id.as_deref())?;
        let omni_id = require_identifier(omni, Side::Omni, selection.omni_id.as_deref())?;

        if selection.pairs.is_empty() {
            return Err(CompareError::NoPairs);
        }
        let mut labels = HashSet::new();
        for pair in &selection.pairs {
            if pair.label.trim().is_empty() {
                return Err(CompareError::EmptyLabel);
            }
            if !labels.insert(pair.label.as_str()) {
                return Err(CompareError::DuplicateLabel(pair.label.clone()));
            }
        }

        let mut warnings = Vec::new();
        let mut pairs = Vec::with_capacity(selection.pairs.len());
        for pair in &selection.pairs {
            let missing = [(Side::Portal, portal, &pair.portal), (Side::Omni, omni, &pair.omni)]
                .into_iter()
                .filter(|(_, table, column)| table.column_index(column).is_none())
                .map(|(side, _, column)| format!("'{column}' ({side})"))
                .collect::<Vec<_>>();
            if missing.is_empty() {
                pairs.push(pair.clone());
            } else {
                let message = format!(
                    "Pair '{}' skipped: column {} not found",
                    pair.label,
                    missing.join(" and ")
                );
                warn!("{message}");
                warnings.push(message);
            }
        }
        if pairs.is_empty() {
            return Err(CompareError::NoResolvablePairs);
        }

        let mut metadata = Vec::new();
        for column in &selection.metadata {
            if column.column == portal_id {
                continue;
            }
            if portal.column_index(&column.column).is_none() {
                let message = format!(
                    "Metadata column '{}' not found in the Portal table; skipped",
                    column.column
                );
                warn!("{message}");
                warnings.push(message);
                continue;
            }
            if !metadata
                .iter()
                .any(|existing: &MetadataColumn| existing.column == column.column)
            {
                metadata.push(column.clone());
            }
        }

        let portal_columns = std::iter::once(portal_id.clone())
            .chain(metadata.iter().map(|m| m.column.clone()))
            .chain(pairs.iter().map(|p| p.portal.clone()))
            .unique()
            .collect::<Vec<_>>();
        let omni_columns = std::iter::once(omni_id.clone())
            .chain(pairs.iter().map(|p| p.omni.clone()))
            .unique()
            .collect::<Vec<_>>();
        let layout = join::resolve_columns(&portal_columns, &omni_columns);
        debug!(
            "Resolved plan: portal id '{}', omni id '{}', {} pair(s), layout {:?}",
            portal_id,
            omni_id,
            pairs.len(),
            layout.iter().map(|c| &c.name).collect::<Vec<_>>()
        );

        Ok(Self {
            portal_id,
            omni_id,
            mode: selection.mode,
            metadata,
            pairs,
            portal_columns,
            omni_columns,
            layout,
            warnings,
        })
    }

    /// Physical joined-table name of a column selected from `side`.
    pub fn physical_name(&self, side: Side, source: &str) -> Option<&str> {
        self.layout
            .iter()
            .find(|c| c.side == side && c.source == source)
            .map(|c| c.name.as_str())
    }
}

fn require_identifier(
    table: &SourceTable,
    side: Side,
    selected: Option<&str>,
) -> Result<String, CompareError> {
    let column = selected
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(CompareError::MissingIdentifier(side))?;
    if table.column_index(column).is_none() {
        return Err(CompareError::UnknownColumn {
            side,
            column: column.to_string(),
        });
    }
    Ok(column.to_string())
}
