use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{detect::Role, join::JoinMode, status::StatusFilter};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Compare marketplace prices between a Portal export and an Omni export",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Join both exports on their identifiers and classify every price pair
    Compare(CompareArgs),
    /// Rank the columns of a file by how well they fit each column role
    Suggest(SuggestArgs),
    /// Preview the first few rows of a CSV or workbook in a formatted table
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Portal export (CSV, TSV or workbook)
    #[arg(long)]
    pub portal: PathBuf,
    /// Omni export (CSV, TSV or workbook)
    #[arg(long)]
    pub omni: PathBuf,
    /// YAML run file with identifiers, pairs, metadata and price policy
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Write the effective selections of this run to a YAML run file
    #[arg(long = "save-config")]
    pub save_config: Option<PathBuf>,
    /// Identifier column of the Portal export
    #[arg(long = "portal-id")]
    pub portal_id: Option<String>,
    /// Identifier column of the Omni export
    #[arg(long = "omni-id")]
    pub omni_id: Option<String>,
    /// Comparison pair `LABEL=PORTAL_COLUMN,OMNI_COLUMN` (label optional)
    #[arg(long = "pair", action = clap::ArgAction::Append)]
    pub pairs: Vec<String>,
    /// Portal columns to carry into the result (comma-separated, repeatable)
    #[arg(long = "metadata", action = clap::ArgAction::Append)]
    pub metadata: Vec<String>,
    /// Detect product name, brand and category columns when none are given
    #[arg(long = "auto-metadata")]
    pub auto_metadata: bool,
    /// Pair price columns by marketplace name when no pair is given
    #[arg(long = "auto-pairs")]
    pub auto_pairs: bool,
    /// Join mode
    #[arg(long = "join", value_enum)]
    pub join: Option<JoinMode>,
    /// Treat a zero price as a listed price instead of an empty one
    #[arg(long = "keep-zero-prices")]
    pub keep_zero_prices: bool,
    /// Currency token stripped from prices (defaults to `Rp`)
    #[arg(long = "currency-token")]
    pub currency_token: Option<String>,
    /// Thousands separator stripped from prices (defaults to `,`)
    #[arg(long = "thousands-separator")]
    pub thousands_separator: Option<char>,
    /// CSV delimiter character for delimited inputs and the joined output
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the Portal export (defaults to utf-8)
    #[arg(long = "portal-encoding")]
    pub portal_encoding: Option<String>,
    /// Character encoding of the Omni export (defaults to utf-8)
    #[arg(long = "omni-encoding")]
    pub omni_encoding: Option<String>,
    /// Write a workbook with one sheet per pair and a summary sheet
    #[arg(long)]
    pub xlsx: Option<PathBuf>,
    /// Write the summary table as CSV
    #[arg(long = "summary-csv")]
    pub summary_csv: Option<PathBuf>,
    /// Write the joined table with derived columns as CSV (`-` for stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Print the run report as JSON instead of the summary table
    #[arg(long, conflicts_with_all = ["show", "filter"])]
    pub json: bool,
    /// Print the rows of every pair
    #[arg(long)]
    pub show: bool,
    /// Only show rows with this status (implies --show)
    #[arg(long, value_enum)]
    pub filter: Option<StatusFilter>,
    /// Maximum rows shown per pair
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct SuggestArgs {
    /// File whose columns should be ranked
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Only rank for this role (id, price, brand, category, name)
    #[arg(long, value_parser = parse_role)]
    pub role: Option<Role>,
    /// Number of candidates listed per role
    #[arg(long, default_value_t = crate::detect::DEFAULT_SUGGESTIONS)]
    pub top: usize,
    /// Omni export to propose marketplace pairs against (input is the Portal side)
    #[arg(long = "pairs-with")]
    pub pairs_with: Option<PathBuf>,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// File to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_role(value: &str) -> Result<Role, String> {
    value.parse::<Role>().map_err(|err| err.to_string())
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be an ASCII character".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_aliases() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn compare_flags_parse() {
        let cli = Cli::try_parse_from([
            "price-parity",
            "compare",
            "--portal",
            "portal.csv",
            "--omni",
            "omni.xlsx",
            "--pair",
            "Shopee=Harga Shopee,Shopee",
            "--pair",
            "Web,Web",
            "--join",
            "inner",
            "--filter",
            "portal-higher",
        ])
        .expect("parse");
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.pairs.len(), 2);
        assert_eq!(args.join, Some(JoinMode::Inner));
        assert_eq!(args.filter, Some(StatusFilter::PortalHigher));
    }

    #[test]
    fn json_report_excludes_row_listing() {
        for flags in [&["--show"][..], &["--filter", "equal"][..]] {
            let mut argv = vec![
                "price-parity",
                "compare",
                "--portal",
                "p.csv",
                "--omni",
                "o.csv",
                "--json",
            ];
            argv.extend_from_slice(flags);
            let err = Cli::try_parse_from(argv).expect_err("conflicting flags");
            assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        }
    }

    #[test]
    fn role_aliases() {
        assert_eq!(parse_role("sku"), Ok(Role::Identifier));
        assert!(parse_role("colour").is_err());
    }
}
