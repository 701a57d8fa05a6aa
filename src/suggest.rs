use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::SuggestArgs,
    detect::{self, Role},
    io_utils,
    source::{self, LoadOptions},
    table,
};

pub fn execute(args: &SuggestArgs) -> Result<()> {
    let options = LoadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
    };
    let input = source::load_table(&args.input, &options)
        .with_context(|| format!("Loading {:?}", args.input))?;
    let roles = match args.role {
        Some(role) => vec![role],
        None => Role::ALL.to_vec(),
    };

    let headers = ["Role", "Rank", "Column", "Score", "Marketplace"]
        .map(str::to_string)
        .to_vec();
    let mut rows = Vec::new();
    for role in roles {
        for (rank, scored) in detect::rank(input.headers(), role)
            .into_iter()
            .take(args.top)
            .enumerate()
        {
            rows.push(vec![
                role.to_string(),
                (rank + 1).to_string(),
                scored.column.clone(),
                format!("{:.3}", scored.score),
                detect::detect_marketplace(&scored.column)
                    .map(|m| m.to_string())
                    .unwrap_or_default(),
            ]);
        }
    }
    table::print_table(&headers, &rows);

    if let Some(path) = &args.pairs_with {
        let omni = source::load_table(path, &options)
            .with_context(|| format!("Loading {path:?}"))?;
        let pairs = detect::suggest_pairs(&input, &omni);
        let pair_headers = ["Label", "Portal Column", "Omni Column"]
            .map(str::to_string)
            .to_vec();
        let pair_rows = pairs
            .iter()
            .map(|p| vec![p.label.clone(), p.portal.clone(), p.omni.clone()])
            .collect::<Vec<_>>();
        println!();
        table::print_table(&pair_headers, &pair_rows);
        info!("{} marketplace pair(s) proposed against {:?}", pairs.len(), path);
    }
    Ok(())
}
