use std::borrow::Cow;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Renders an aligned plain-text table. Columns whose non-empty cells all
/// look numeric (counts, prices, percentages) are right aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    let mut numeric = vec![true; column_count];
    let mut populated = vec![false; column_count];

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
            if !cell.trim().is_empty() {
                populated[idx] = true;
                numeric[idx] &= looks_numeric(cell);
            }
        }
    }
    let aligns = numeric
        .iter()
        .zip(&populated)
        .map(|(numeric, populated)| {
            if *numeric && *populated {
                Align::Right
            } else {
                Align::Left
            }
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &aligns));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths, &aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim().trim_end_matches('%').replace(',', "");
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let mut cells = Vec::with_capacity(widths.len());
    for (idx, width) in widths.iter().enumerate() {
        let value = values.get(idx).map(String::as_str).unwrap_or("");
        let sanitized = sanitize_cell(value);
        let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
        let cell = match aligns[idx] {
            Align::Left => format!("{sanitized}{padding}"),
            Align::Right => format!("{padding}{sanitized}"),
        };
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().filter(|ch| !ch.is_control()).count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
