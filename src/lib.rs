pub mod cli;
pub mod compare;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod io_utils;
pub mod join;
pub mod normalize;
pub mod pipeline;
pub mod plan;
pub mod preview;
pub mod source;
pub mod status;
pub mod suggest;
pub mod summary;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

pub use crate::{
    error::{CompareError, Side},
    normalize::PricePolicy,
    pipeline::{RunResult, run as compare_tables},
    plan::{ComparisonPair, MetadataColumn, Selection},
    source::{Cell, SourceTable},
    status::{Status, StatusFilter},
    summary::Summary,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("price_parity", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Command: {:?}", cli.command);
    match cli.command {
        Commands::Compare(args) => compare::execute(&args),
        Commands::Suggest(args) => suggest::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
