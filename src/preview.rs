use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::PreviewArgs,
    io_utils,
    source::{self, LoadOptions},
    table,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let options = LoadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
    };
    let input = source::load_table(&args.input, &options)
        .with_context(|| format!("Loading {:?}", args.input))?;
    let rows = input
        .rows()
        .iter()
        .take(args.rows)
        .map(|row| row.iter().map(|cell| cell.as_text().into_owned()).collect())
        .collect::<Vec<Vec<String>>>();

    table::print_table(input.headers(), &rows);
    println!(
        "{} row(s) x {} column(s)",
        input.row_count(),
        input.column_count()
    );
    info!("Displayed {} row(s) from {:?}", rows.len(), args.input);
    Ok(())
}
