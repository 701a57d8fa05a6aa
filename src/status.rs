use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Serialize, Serializer};

use crate::{
    normalize::{Price, PricePolicy, to_number},
    source::Cell,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Equal,
    UnequalPortalHigher { difference: f64 },
    UnequalOmniHigher { difference: f64 },
    EmptyPortal,
    EmptyOmni,
    EmptyBoth,
    Unmatched,
}

impl Status {
    pub fn code(&self) -> &'static str {
        match self {
            Status::Equal => "EQUAL",
            Status::UnequalPortalHigher { .. } => "UNEQUAL_PORTAL_HIGHER",
            Status::UnequalOmniHigher { .. } => "UNEQUAL_OMNI_HIGHER",
            Status::EmptyPortal => "EMPTY_PORTAL",
            Status::EmptyOmni => "EMPTY_OMNI",
            Status::EmptyBoth => "EMPTY_BOTH",
            Status::Unmatched => "UNMATCHED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Equal => "Equal",
            Status::UnequalPortalHigher { .. } => "Unequal - Portal Higher",
            Status::UnequalOmniHigher { .. } => "Unequal - Omni Higher",
            Status::EmptyPortal => "Empty (Portal)",
            Status::EmptyOmni => "Empty (Omni)",
            Status::EmptyBoth => "Empty (Both)",
            Status::Unmatched => "Not Found on Omni",
        }
    }

    /// Absolute price difference: the magnitude for unequal rows, zero for
    /// equal rows, nothing when either price is missing.
    pub fn difference(&self) -> Option<f64> {
        match self {
            Status::Equal => Some(0.0),
            Status::UnequalPortalHigher { difference } | Status::UnequalOmniHigher { difference } => {
                Some(*difference)
            }
            _ => None,
        }
    }

    /// Both sides carry a definite price.
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            Status::Equal | Status::UnequalPortalHigher { .. } | Status::UnequalOmniHigher { .. }
        )
    }

    pub fn is_unequal(&self) -> bool {
        matches!(
            self,
            Status::UnequalPortalHigher { .. } | Status::UnequalOmniHigher { .. }
        )
    }

    pub fn is_empty(&self) -> bool {
        matches!(
            self,
            Status::EmptyPortal | Status::EmptyOmni | Status::EmptyBoth
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Classification of one row under one comparison pair, with both
/// normalized prices kept for export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Outcome {
    pub portal: Price,
    pub omni: Price,
    pub status: Status,
}

/// Unmatched wins over emptiness; equality is exact.
pub fn classify_prices(portal: Price, omni: Price, matched: bool) -> Status {
    if !matched {
        return Status::Unmatched;
    }
    match (portal, omni) {
        (Price::Empty, Price::Empty) => Status::EmptyBoth,
        (Price::Empty, Price::Value(_)) => Status::EmptyPortal,
        (Price::Value(_), Price::Empty) => Status::EmptyOmni,
        (Price::Value(p), Price::Value(o)) => {
            if p == o {
                Status::Equal
            } else if p > o {
                Status::UnequalPortalHigher { difference: p - o }
            } else {
                Status::UnequalOmniHigher { difference: o - p }
            }
        }
    }
}

pub fn classify(portal_raw: &Cell, omni_raw: &Cell, matched: bool, policy: &PricePolicy) -> Status {
    evaluate(portal_raw, omni_raw, matched, policy).status
}

/// Normalizes both raw cells and classifies them in one step.
pub fn evaluate(portal_raw: &Cell, omni_raw: &Cell, matched: bool, policy: &PricePolicy) -> Outcome {
    let portal = to_number(portal_raw, policy);
    let omni = to_number(omni_raw, policy);
    Outcome {
        portal,
        omni,
        status: classify_prices(portal, omni, matched),
    }
}

/// Row selections offered when re-filtering a run result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[value(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    Equal,
    Unequal,
    PortalHigher,
    OmniHigher,
    Empty,
    EmptyPortal,
    EmptyOmni,
    EmptyBoth,
    Unmatched,
}

impl StatusFilter {
    pub fn matches(self, status: &Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Equal => matches!(status, Status::Equal),
            StatusFilter::Unequal => status.is_unequal(),
            StatusFilter::PortalHigher => matches!(status, Status::UnequalPortalHigher { .. }),
            StatusFilter::OmniHigher => matches!(status, Status::UnequalOmniHigher { .. }),
            StatusFilter::Empty => status.is_empty(),
            StatusFilter::EmptyPortal => matches!(status, Status::EmptyPortal),
            StatusFilter::EmptyOmni => matches!(status, Status::EmptyOmni),
            StatusFilter::EmptyBoth => matches!(status, Status::EmptyBoth),
            StatusFilter::Unmatched => matches!(status, Status::Unmatched),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        <StatusFilter as clap::ValueEnum>::from_str(value, true)
            .map_err(|_| anyhow!("Unknown status filter '{value}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn run(portal: &str, omni: &str, matched: bool) -> Status {
        classify(&text(portal), &text(omni), matched, &PricePolicy::default())
    }

    #[test]
    fn equal_prices() {
        let status = run("100", "100", true);
        assert_eq!(status, Status::Equal);
        assert_eq!(status.difference(), Some(0.0));
    }

    #[test]
    fn portal_higher_carries_magnitude() {
        let status = run("150", "100", true);
        assert_eq!(status, Status::UnequalPortalHigher { difference: 50.0 });
        assert_eq!(status.code(), "UNEQUAL_PORTAL_HIGHER");
    }

    #[test]
    fn omni_higher_carries_magnitude() {
        assert_eq!(
            run("Rp 1,000", "1250", true),
            Status::UnequalOmniHigher { difference: 250.0 }
        );
    }

    #[test]
    fn zero_portal_is_empty_not_unequal() {
        assert_eq!(run("0", "80", true), Status::EmptyPortal);
        assert_eq!(run("80", "", true), Status::EmptyOmni);
        assert_eq!(run("0", "0", true), Status::EmptyBoth);
    }

    #[test]
    fn unmatched_wins_over_everything() {
        assert_eq!(run("50", "50", false), Status::Unmatched);
        assert_eq!(run("", "", false), Status::Unmatched);
    }

    #[test]
    fn zero_pair_is_equal_when_zero_counts_as_price() {
        let policy = PricePolicy {
            zero_is_empty: false,
            ..PricePolicy::default()
        };
        assert_eq!(classify(&text("0"), &text("0"), true, &policy), Status::Equal);
    }

    #[test]
    fn sub_unit_noise_is_reported_unequal() {
        let status = classify_prices(Price::Value(0.1 + 0.2), Price::Value(0.3), true);
        assert!(status.is_unequal());
    }

    #[test]
    fn filters_select_families() {
        let higher = Status::UnequalOmniHigher { difference: 1.0 };
        assert!(StatusFilter::Unequal.matches(&higher));
        assert!(StatusFilter::OmniHigher.matches(&higher));
        assert!(!StatusFilter::PortalHigher.matches(&higher));
        assert!(StatusFilter::Empty.matches(&Status::EmptyBoth));
        assert!(!StatusFilter::Empty.matches(&Status::Unmatched));
        assert_eq!("empty-both".parse::<StatusFilter>().unwrap(), StatusFilter::EmptyBoth);
    }
}
