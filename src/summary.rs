use serde::Serialize;

use crate::status::Status;

/// Aggregate counts for one comparison pair. Percentages are computed over
/// `valid` (rows with a definite price on both sides) and are zero when no
/// row is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub valid: usize,
    pub equal: usize,
    pub pct_equal: f64,
    pub unequal: usize,
    pub pct_unequal: f64,
    pub portal_higher: usize,
    pub omni_higher: usize,
    pub empty: usize,
    pub empty_portal: usize,
    pub empty_omni: usize,
    pub empty_both: usize,
    pub unmatched: usize,
}

#[derive(Debug, Default)]
struct SummaryAccumulator {
    summary: Summary,
}

impl SummaryAccumulator {
    fn ingest(&mut self, status: &Status) {
        let s = &mut self.summary;
        s.total += 1;
        match status {
            Status::Equal => s.equal += 1,
            Status::UnequalPortalHigher { .. } => s.portal_higher += 1,
            Status::UnequalOmniHigher { .. } => s.omni_higher += 1,
            Status::EmptyPortal => s.empty_portal += 1,
            Status::EmptyOmni => s.empty_omni += 1,
            Status::EmptyBoth => s.empty_both += 1,
            Status::Unmatched => s.unmatched += 1,
        }
    }

    fn finish(self) -> Summary {
        let mut s = self.summary;
        s.unequal = s.portal_higher + s.omni_higher;
        s.empty = s.empty_portal + s.empty_omni + s.empty_both;
        s.valid = s.equal + s.unequal;
        s.pct_equal = percent(s.equal, s.valid);
        s.pct_unequal = percent(s.unequal, s.valid);
        s
    }
}

fn percent(count: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        count as f64 / denominator as f64 * 100.0
    }
}

pub fn summarize<'a, I>(statuses: I) -> Summary
where
    I: IntoIterator<Item = &'a Status>,
{
    let mut accumulator = SummaryAccumulator::default();
    for status in statuses {
        accumulator.ingest(status);
    }
    accumulator.finish()
}

impl Summary {
    pub const HEADERS: [&'static str; 14] = [
        "Pair",
        "Total Rows",
        "Valid",
        "Equal",
        "% Equal",
        "Unequal",
        "% Unequal",
        "Portal Higher",
        "Omni Higher",
        "Empty",
        "Empty (Portal)",
        "Empty (Omni)",
        "Empty (Both)",
        "Not Found on Omni",
    ];

    /// One summary table row for `label`, matching [`Summary::HEADERS`].
    pub fn render_row(&self, label: &str) -> Vec<String> {
        vec![
            label.to_string(),
            self.total.to_string(),
            self.valid.to_string(),
            self.equal.to_string(),
            format!("{:.2}%", self.pct_equal),
            self.unequal.to_string(),
            format!("{:.2}%", self.pct_unequal),
            self.portal_higher.to_string(),
            self.omni_higher.to_string(),
            self.empty.to_string(),
            self.empty_portal.to_string(),
            self.empty_omni.to_string(),
            self.empty_both.to_string(),
            self.unmatched.to_string(),
        ]
    }
}
