use std::{io, path::Path};

use anyhow::{Context, Result, bail};
use log::{debug, info};

use crate::{
    cli::CompareArgs,
    config::RunConfig,
    detect,
    export,
    io_utils,
    normalize::PricePolicy,
    pipeline::{self, RunResult},
    plan::{ComparisonPair, MetadataColumn, Selection},
    printable_delimiter,
    source::{self, LoadOptions, SourceTable},
    status::StatusFilter,
    summary::Summary,
    table,
};

pub fn execute(args: &CompareArgs) -> Result<()> {
    if args.json && args.output.as_deref().is_some_and(io_utils::is_dash) {
        bail!("--json cannot be combined with --output -; both write to stdout");
    }
    let config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let portal = load_side(&args.portal, args.delimiter, args.portal_encoding.as_deref())?;
    let omni = load_side(&args.omni, args.delimiter, args.omni_encoding.as_deref())?;

    let policy = resolve_policy(args, &config);
    let selection = resolve_selection(args, &config, &portal, &omni)?;
    debug!("Selection: {selection:?}");
    debug!("Price policy: {policy:?}");

    if let Some(path) = &args.save_config {
        effective_config(args, &config, &selection, &policy)
            .save(path)
            .with_context(|| format!("Writing run file to {path:?}"))?;
        info!("Run file written to {path:?}");
    }

    let result = pipeline::run(&portal, &omni, &selection, &policy)
        .with_context(|| format!("Comparing {:?} against {:?}", args.portal, args.omni))?;

    write_outputs(args, &result)?;
    Ok(())
}

fn load_side(path: &Path, delimiter: Option<u8>, encoding: Option<&str>) -> Result<SourceTable> {
    let options = LoadOptions {
        delimiter,
        encoding: io_utils::resolve_encoding(encoding)?,
    };
    let table = source::load_table(path, &options)
        .with_context(|| format!("Loading {path:?}"))?;
    info!(
        "Loaded {:?}: {} row(s), {} column(s)",
        path,
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

fn resolve_policy(args: &CompareArgs, config: &RunConfig) -> PricePolicy {
    let mut policy = config.policy.clone();
    if args.keep_zero_prices {
        policy.zero_is_empty = false;
    }
    if let Some(token) = &args.currency_token {
        policy.currency_token = token.clone();
    }
    if let Some(separator) = args.thousands_separator {
        policy.thousands_separator = separator;
    }
    policy
}

fn resolve_selection(
    args: &CompareArgs,
    config: &RunConfig,
    portal: &SourceTable,
    omni: &SourceTable,
) -> Result<Selection> {
    let portal_id = args.portal_id.clone().or_else(|| config.portal_id.clone());
    let omni_id = args.omni_id.clone().or_else(|| config.omni_id.clone());

    let mut pairs = if args.pairs.is_empty() {
        config.pairs.clone()
    } else {
        args.pairs
            .iter()
            .enumerate()
            .map(|(idx, value)| ComparisonPair::parse(value, idx + 1))
            .collect::<Result<Vec<_>>>()?
    };
    if pairs.is_empty() && (args.auto_pairs || config.auto_pairs) {
        pairs = detect::suggest_pairs(portal, omni);
        for pair in &pairs {
            info!(
                "Auto pair '{}': '{}' (Portal) vs '{}' (Omni)",
                pair.label, pair.portal, pair.omni
            );
        }
    }

    let mut metadata = if args.metadata.is_empty() {
        config.metadata.clone()
    } else {
        args.metadata
            .iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(MetadataColumn::new)
            .collect()
    };
    if metadata.is_empty() && (args.auto_metadata || config.auto_metadata) {
        let mut exclude: Vec<&str> = pairs.iter().map(|p| p.portal.as_str()).collect();
        if let Some(id) = portal_id.as_deref() {
            exclude.push(id);
        }
        metadata = detect::detect_metadata(portal, &exclude)
            .into_iter()
            .map(|(role, column)| {
                info!("Auto metadata: '{column}' as {role}");
                MetadataColumn::detected(role, column)
            })
            .collect();
    }

    Ok(Selection {
        portal_id,
        omni_id,
        pairs,
        metadata,
        mode: args.join.or(config.join).unwrap_or_default(),
    })
}

fn effective_config(
    args: &CompareArgs,
    config: &RunConfig,
    selection: &Selection,
    policy: &PricePolicy,
) -> RunConfig {
    RunConfig {
        portal_id: selection.portal_id.clone(),
        omni_id: selection.omni_id.clone(),
        join: Some(selection.mode),
        pairs: selection.pairs.clone(),
        metadata: selection.metadata.clone(),
        auto_metadata: args.auto_metadata || config.auto_metadata,
        auto_pairs: args.auto_pairs || config.auto_pairs,
        policy: policy.clone(),
    }
}

fn write_outputs(args: &CompareArgs, result: &RunResult) -> Result<()> {
    let delimiter = args.delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
    let joined_to_stdout = args.output.as_deref().is_some_and(io_utils::is_dash);

    if let Some(path) = &args.output {
        export::write_joined_csv(result, Some(path.as_path()), delimiter)
            .with_context(|| format!("Writing joined table to {path:?}"))?;
        if !joined_to_stdout {
            info!(
                "Joined table with {} row(s) written to {:?} (delimiter '{}')",
                result.joined().row_count(),
                path,
                printable_delimiter(delimiter)
            );
        }
    }
    if let Some(path) = &args.xlsx {
        export::write_workbook(result, path)
            .with_context(|| format!("Writing workbook to {path:?}"))?;
        info!("Workbook with {} pair sheet(s) written to {:?}", result.pairs().len(), path);
    }
    if let Some(path) = &args.summary_csv {
        export::write_summary_csv(result, path)
            .with_context(|| format!("Writing summary to {path:?}"))?;
        info!("Summary written to {path:?}");
    }

    if joined_to_stdout {
        return Ok(());
    }
    if args.json {
        export::write_json(result, io::stdout().lock()).context("Writing JSON report")?;
        return Ok(());
    }

    let headers = Summary::HEADERS.map(str::to_string);
    let rows = result
        .pairs()
        .iter()
        .map(|pair| pair.summary.render_row(pair.label()))
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);

    if args.show || args.filter.is_some() {
        show_rows(result, args.filter.unwrap_or_default(), args.limit)?;
    }
    Ok(())
}

fn show_rows(result: &RunResult, filter: StatusFilter, limit: Option<usize>) -> Result<()> {
    for pair in result.pairs() {
        let sheet = result.pair_sheet(pair.label())?;
        let selected = result.filter(pair.label(), filter)?;
        let rows = selected
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|idx| sheet.rows[*idx].to_display_strings(result.policy()))
            .collect::<Vec<_>>();
        println!();
        println!(
            "[{}] {} of {} row(s)",
            pair.label(),
            rows.len(),
            pair.summary.total
        );
        table::print_table(&sheet.headers, &rows);
    }
    Ok(())
}
