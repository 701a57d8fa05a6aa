//! One comparison run: plan → join → classify → summarize.
//!
//! The returned [`RunResult`] is owned by the caller. Re-filtering or
//! exporting takes the result by reference; a new run simply produces a new
//! value.

use log::{info, warn};
use serde::Serialize;

use crate::{
    error::{CompareError, Side},
    join::{self, JoinDiagnostics, JoinMode, JoinedTable},
    normalize::{self, Price, PricePolicy},
    plan::{ComparisonPair, ComparisonPlan, MetadataColumn, Selection},
    source::{Cell, SourceTable, format_number},
    status::{self, Outcome, StatusFilter},
    summary::{self, Summary},
};

/// Column recording whether a joined row found its Omni counterpart.
pub const MATCH_FLAG_COLUMN: &str = "Found on Omni";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairResult {
    pub pair: ComparisonPair,
    #[serde(skip)]
    pub outcomes: Vec<Outcome>,
    pub summary: Summary,
}

impl PairResult {
    pub fn label(&self) -> &str {
        &self.pair.label
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    plan: ComparisonPlan,
    joined: JoinedTable,
    pairs: Vec<PairResult>,
    policy: PricePolicy,
    warnings: Vec<String>,
}

/// Serializable digest of a run: per-pair summaries, join diagnostics and
/// warnings.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub join: JoinMode,
    pub rows: usize,
    pub pairs: &'a [PairResult],
    pub diagnostics: &'a JoinDiagnostics,
    pub warnings: &'a [String],
}

pub fn run(
    portal: &SourceTable,
    omni: &SourceTable,
    selection: &Selection,
    policy: &PricePolicy,
) -> Result<RunResult, CompareError> {
    let plan = ComparisonPlan::resolve(portal, omni, selection)?;
    let joined = join::join(
        portal,
        omni,
        &plan.portal_id,
        &plan.omni_id,
        &plan.portal_columns,
        &plan.omni_columns,
        plan.mode,
    )?;
    if plan.mode == JoinMode::Inner && joined.row_count() == 0 {
        return Err(CompareError::EmptyJoin);
    }

    let mut warnings = plan.warnings.clone();
    let diagnostics = joined.diagnostics();
    if diagnostics.suspected_format_mismatches > 0 {
        let message = format!(
            "{} unmatched Portal identifier(s) look like Omni identifiers in a different format (case, leading zeros or '.0')",
            diagnostics.suspected_format_mismatches
        );
        warn!("{message}");
        warnings.push(message);
    }
    if diagnostics.duplicate_omni_identifiers > 0 {
        let message = format!(
            "{} Omni identifier(s) occur on several rows; the first occurrence was used",
            diagnostics.duplicate_omni_identifiers
        );
        warn!("{message}");
        warnings.push(message);
    }

    let mut pairs = Vec::with_capacity(plan.pairs.len());
    for pair in &plan.pairs {
        let (Some(portal_idx), Some(omni_idx)) = (
            joined.position(Side::Portal, &pair.portal),
            joined.position(Side::Omni, &pair.omni),
        ) else {
            let message = format!(
                "Pair '{}' skipped: its columns are missing from the joined table",
                pair.label
            );
            warn!("{message}");
            warnings.push(message);
            continue;
        };
        let outcomes = joined
            .rows()
            .iter()
            .map(|row| {
                status::evaluate(&row.cells[portal_idx], &row.cells[omni_idx], row.matched, policy)
            })
            .collect::<Vec<_>>();
        let summary = summary::summarize(outcomes.iter().map(|o| &o.status));
        info!(
            "Pair '{}': {} equal, {} unequal, {} empty, {} unmatched of {} row(s) ({:.2}% equal)",
            pair.label,
            summary.equal,
            summary.unequal,
            summary.empty,
            summary.unmatched,
            summary.total,
            summary.pct_equal
        );
        pairs.push(PairResult {
            pair: pair.clone(),
            outcomes,
            summary,
        });
    }
    if pairs.is_empty() {
        return Err(CompareError::NoResolvablePairs);
    }

    Ok(RunResult {
        plan,
        joined,
        pairs,
        policy: policy.clone(),
        warnings,
    })
}

impl RunResult {
    pub fn plan(&self) -> &ComparisonPlan {
        &self.plan
    }

    pub fn joined(&self) -> &JoinedTable {
        &self.joined
    }

    pub fn pairs(&self) -> &[PairResult] {
        &self.pairs
    }

    pub fn policy(&self) -> &PricePolicy {
        &self.policy
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn pair(&self, label: &str) -> Result<&PairResult, CompareError> {
        self.pairs
            .iter()
            .find(|p| p.pair.label == label)
            .ok_or_else(|| CompareError::UnknownPair(label.to_string()))
    }

    pub fn report(&self) -> RunReport<'_> {
        RunReport {
            join: self.joined.mode(),
            rows: self.joined.row_count(),
            pairs: &self.pairs,
            diagnostics: self.joined.diagnostics(),
            warnings: &self.warnings,
        }
    }

    /// Row indices of the pair labelled `label` whose status passes `filter`.
    pub fn filter(&self, label: &str, filter: StatusFilter) -> Result<Vec<usize>, CompareError> {
        let pair = self.pair(label)?;
        Ok(pair
            .outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| filter.matches(&outcome.status))
            .map(|(idx, _)| idx)
            .collect())
    }

    /// Headers of the flattened joined table: joined columns, the match flag,
    /// then four derived columns per pair.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = self.joined.headers();
        headers.push(MATCH_FLAG_COLUMN.to_string());
        for pair in &self.pairs {
            headers.extend(pair.pair.derived_headers());
        }
        headers
    }

    pub fn records(&self) -> Vec<Vec<String>> {
        self.joined
            .rows()
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let mut record: Vec<String> =
                    row.cells.iter().map(|c| c.as_text().into_owned()).collect();
                record.push(row.matched.to_string());
                for pair in &self.pairs {
                    record.extend(derived_cells(&pair.outcomes[row_idx]));
                }
                record
            })
            .collect()
    }

    /// Per-pair view: identifier, metadata, then the pair's derived columns.
    pub fn pair_sheet(&self, label: &str) -> Result<PairSheet, CompareError> {
        let pair = self.pair(label)?;
        let id_idx = self
            .joined
            .position(Side::Portal, &self.plan.portal_id)
            .ok_or_else(|| CompareError::UnknownColumn {
                side: Side::Portal,
                column: self.plan.portal_id.clone(),
            })?;
        let metadata: Vec<(&MetadataColumn, usize)> = self
            .plan
            .metadata
            .iter()
            .filter_map(|m| {
                self.joined
                    .position(Side::Portal, &m.column)
                    .map(|idx| (m, idx))
            })
            .collect();

        let mut headers = vec![self.plan.portal_id.clone()];
        headers.extend(metadata.iter().map(|(m, _)| m.display_name().to_string()));
        headers.extend(pair.pair.derived_headers());

        let rows = self
            .joined
            .rows()
            .iter()
            .zip(&pair.outcomes)
            .map(|(row, outcome)| PairSheetRow {
                identifier: row.cells[id_idx].clone(),
                metadata: metadata.iter().map(|(_, idx)| row.cells[*idx].clone()).collect(),
                outcome: *outcome,
            })
            .collect();
        Ok(PairSheet { headers, rows })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairSheet {
    pub headers: Vec<String>,
    pub rows: Vec<PairSheetRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairSheetRow {
    pub identifier: Cell,
    pub metadata: Vec<Cell>,
    pub outcome: Outcome,
}

impl PairSheetRow {
    pub fn to_strings(&self) -> Vec<String> {
        let mut values = vec![self.identifier.as_text().into_owned()];
        values.extend(self.metadata.iter().map(|c| c.as_text().into_owned()));
        values.extend(derived_cells(&self.outcome));
        values
    }

    /// Like [`PairSheetRow::to_strings`] with prices shown as currency amounts.
    pub fn to_display_strings(&self, policy: &PricePolicy) -> Vec<String> {
        let amount = |value: Option<f64>| {
            value
                .map(|v| normalize::format_amount(v, policy))
                .unwrap_or_default()
        };
        let mut values = vec![self.identifier.as_text().into_owned()];
        values.extend(self.metadata.iter().map(|c| c.as_text().into_owned()));
        values.push(amount(self.outcome.portal.value()));
        values.push(amount(self.outcome.omni.value()));
        values.push(self.outcome.status.label().to_string());
        values.push(amount(self.outcome.status.difference()));
        values
    }
}

fn price_text(price: Price) -> String {
    price.value().map(format_number).unwrap_or_default()
}

fn derived_cells(outcome: &Outcome) -> [String; 4] {
    [
        price_text(outcome.portal),
        price_text(outcome.omni),
        outcome.status.label().to_string(),
        outcome
            .status
            .difference()
            .map(format_number)
            .unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    fn scenario() -> (SourceTable, SourceTable) {
        let portal = SourceTable::from_strings(
            "portal",
            &["SKU", "Nama", "Harga"],
            &[
                vec!["X1", "Kaos", "100"],
                vec!["X2", "Topi", "150"],
                vec!["X3", "Tas", "0"],
                vec!["X4", "Sepatu", "50"],
                vec![" X5 ", "Jaket", "75"],
            ],
        );
        let omni = SourceTable::from_strings(
            "omni",
            &["Kode", "Harga"],
            &[
                vec!["X1", "100"],
                vec!["X2", "100"],
                vec!["X3", "80"],
                vec!["X5", "75"],
            ],
        );
        (portal, omni)
    }

    fn selection(mode: JoinMode) -> Selection {
        Selection {
            portal_id: Some("SKU".into()),
            omni_id: Some("Kode".into()),
            pairs: vec![ComparisonPair::new("Web", "Harga", "Harga")],
            metadata: vec![MetadataColumn::new("Nama")],
            mode,
        }
    }

    #[test]
    fn left_run_classifies_every_portal_row() {
        let (portal, omni) = scenario();
        let result = run(&portal, &omni, &selection(JoinMode::Left), &PricePolicy::default())
            .expect("run");
        let statuses: Vec<Status> = result.pairs()[0]
            .outcomes
            .iter()
            .map(|o| o.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                Status::Equal,
                Status::UnequalPortalHigher { difference: 50.0 },
                Status::EmptyPortal,
                Status::Unmatched,
                Status::Equal,
            ]
        );
        assert_eq!(result.joined().row_count(), portal.row_count());
        assert_eq!(result.pairs()[0].summary.total, 5);
    }

    #[test]
    fn inner_run_drops_unmatched_rows() {
        let (portal, omni) = scenario();
        let result = run(&portal, &omni, &selection(JoinMode::Inner), &PricePolicy::default())
            .expect("run");
        assert_eq!(result.joined().row_count(), 4);
        assert_eq!(result.pairs()[0].summary.unmatched, 0);
    }

    #[test]
    fn inner_run_without_matches_is_an_error() {
        let (portal, _) = scenario();
        let omni = SourceTable::from_strings("omni", &["Kode", "Harga"], &[vec!["Z9", "1"]]);
        assert_eq!(
            run(&portal, &omni, &selection(JoinMode::Inner), &PricePolicy::default())
                .unwrap_err(),
            CompareError::EmptyJoin
        );
    }

    #[test]
    fn flattened_table_carries_derived_columns() {
        let (portal, omni) = scenario();
        let result = run(&portal, &omni, &selection(JoinMode::Left), &PricePolicy::default())
            .expect("run");
        let headers = result.headers();
        assert_eq!(
            headers,
            vec![
                "SKU",
                "Nama",
                "Harga_Portal",
                "Kode",
                "Harga_Omni",
                MATCH_FLAG_COLUMN,
                "[Web] Portal Price",
                "[Web] Omni Price",
                "[Web] Status",
                "[Web] Difference",
            ]
        );
        let records = result.records();
        assert_eq!(records[1][6..], ["150", "100", "Unequal - Portal Higher", "50"]);
        assert_eq!(records[2][6..], ["", "80", "Empty (Portal)", ""]);
        assert_eq!(records[3][5], "false");
        assert_eq!(records[3][3], "");
    }

    #[test]
    fn filter_reuses_the_result() {
        let (portal, omni) = scenario();
        let result = run(&portal, &omni, &selection(JoinMode::Left), &PricePolicy::default())
            .expect("run");
        assert_eq!(result.filter("Web", StatusFilter::Equal).unwrap(), vec![0, 4]);
        assert_eq!(result.filter("Web", StatusFilter::Unmatched).unwrap(), vec![3]);
        assert_eq!(result.filter("Web", StatusFilter::All).unwrap().len(), 5);
        assert_eq!(
            result.filter("Nope", StatusFilter::All).unwrap_err(),
            CompareError::UnknownPair("Nope".into())
        );
    }

    #[test]
    fn pair_sheet_lists_identifier_metadata_and_derived() {
        let (portal, omni) = scenario();
        let result = run(&portal, &omni, &selection(JoinMode::Left), &PricePolicy::default())
            .expect("run");
        let sheet = result.pair_sheet("Web").expect("sheet");
        assert_eq!(sheet.headers[..2], ["SKU", "Nama"]);
        assert_eq!(sheet.rows.len(), 5);
        assert_eq!(
            sheet.rows[0].to_strings(),
            ["X1", "Kaos", "100", "100", "Equal", "0"]
        );
        assert_eq!(
            sheet.rows[1].to_display_strings(result.policy()),
            ["X2", "Topi", "Rp 150", "Rp 100", "Unequal - Portal Higher", "Rp 50"]
        );
    }

    #[test]
    fn suspected_format_mismatch_is_warned() {
        let portal = SourceTable::from_strings("p", &["id", "p"], &[vec!["00123", "5"]]);
        let omni = SourceTable::from_strings("o", &["id", "o"], &[vec!["123", "5"]]);
        let selection = Selection {
            portal_id: Some("id".into()),
            omni_id: Some("id".into()),
            pairs: vec![ComparisonPair::new("P", "p", "o")],
            ..Selection::default()
        };
        let result = run(&portal, &omni, &selection, &PricePolicy::default()).expect("run");
        assert_eq!(result.joined().diagnostics().suspected_format_mismatches, 1);
        assert_eq!(result.pairs()[0].summary.unmatched, 1);
        assert_eq!(result.warnings().len(), 1);
    }
}
