//! Terminal rendering of tables, rows and session status.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use review_core::{Phase, ReviewSession, RowClassification, SessionFault, SessionSummary};
use review_match::Candidate;
use review_model::{Identity, TypeCatalog, TypeTag};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

/// Extracted table with 1-based row numbers.
pub fn extracted_table(table: &review_model::Table) -> Table {
    let mut out = Table::new();
    let mut header = vec![header_cell("#")];
    header.extend(table.headers().iter().map(|h| header_cell(h)));
    out.set_header(header);
    apply_table_style(&mut out);
    align_column(&mut out, 0, CellAlignment::Right);
    for (index, row) in table.rows().iter().enumerate() {
        let mut cells = vec![dim_cell(index + 1)];
        cells.extend(row.iter().map(Cell::new));
        out.add_row(cells);
    }
    out
}

/// Per-column view of the row under review.
pub fn row_table(headers: &[String], row: &RowClassification) -> Table {
    let mut out = Table::new();
    out.set_header(vec![
        header_cell("Col"),
        header_cell("Header"),
        header_cell("Value"),
        header_cell("Type"),
        header_cell("Included"),
    ]);
    apply_table_style(&mut out);
    align_column(&mut out, 0, CellAlignment::Right);
    align_column(&mut out, 4, CellAlignment::Center);
    for column in 0..row.column_count() {
        let header = headers.get(column).map_or("", String::as_str);
        let value = row.value(column).unwrap_or_default();
        let value_cell = if row.is_corrected(column) {
            let extracted = row.extracted_value(column).unwrap_or_default();
            Cell::new(format!("{value} (was {extracted})")).fg(Color::Yellow)
        } else {
            Cell::new(value)
        };
        let type_cell = match row.type_of(column) {
            Some(tag) if row.catalog().is_name(tag) => Cell::new(tag)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Some(tag) => Cell::new(tag),
            None => dim_cell("-"),
        };
        let included_cell = if row.is_included(column) {
            Cell::new("✓").fg(Color::Green)
        } else {
            dim_cell("-")
        };
        out.add_row(vec![
            dim_cell(column + 1),
            Cell::new(header),
            value_cell,
            type_cell,
            included_cell,
        ]);
    }
    out
}

/// Types each column of `row` may take; the bare catalog without a row.
pub fn type_table(catalog: &TypeCatalog, row: Option<&RowClassification>) -> Table {
    let mut out = Table::new();
    apply_table_style(&mut out);
    let Some(row) = row else {
        out.set_header(vec![header_cell("Type")]);
        for tag in catalog.tags() {
            out.add_row(vec![tag_cell(catalog, tag)]);
        }
        return out;
    };
    out.set_header(vec![
        header_cell("Col"),
        header_cell("Type"),
        header_cell("Offered"),
    ]);
    align_column(&mut out, 0, CellAlignment::Right);
    for column in 0..row.column_count() {
        let current = row
            .type_of(column)
            .map_or_else(|| dim_cell("-"), |tag| tag_cell(catalog, tag));
        let offered = if row.is_type_editable(column) {
            let tags: Vec<&str> = row
                .available_types(column)
                .into_iter()
                .map(TypeTag::as_str)
                .collect();
            Cell::new(tags.join(", "))
        } else {
            dim_cell("locked (excluded)")
        };
        out.add_row(vec![dim_cell(column + 1), current, offered]);
    }
    out
}

/// Ranked candidates; `bound` marks the identity currently bound.
pub fn candidate_table(candidates: &[Candidate], bound: Option<i64>, limit: usize) -> Table {
    let mut out = Table::new();
    out.set_header(vec![
        header_cell("Rank"),
        header_cell("Id"),
        header_cell("Name"),
        header_cell("Distance"),
        header_cell("Similarity"),
    ]);
    apply_table_style(&mut out);
    align_column(&mut out, 0, CellAlignment::Right);
    align_column(&mut out, 3, CellAlignment::Right);
    align_column(&mut out, 4, CellAlignment::Right);
    for (rank, candidate) in candidates.iter().take(limit).enumerate() {
        let is_bound = bound == Some(candidate.identity.id);
        let rank_cell = if is_bound {
            Cell::new(format!("* {}", rank + 1))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            dim_cell(rank + 1)
        };
        out.add_row(vec![
            rank_cell,
            Cell::new(candidate.identity.id),
            Cell::new(&candidate.identity.name),
            Cell::new(candidate.distance),
            Cell::new(format!("{:.2}", candidate.similarity)),
        ]);
    }
    out
}

pub fn identity_table(identities: &[Identity]) -> Table {
    let mut out = Table::new();
    out.set_header(vec![header_cell("Id"), header_cell("Name")]);
    apply_table_style(&mut out);
    align_column(&mut out, 0, CellAlignment::Right);
    for identity in identities {
        out.add_row(vec![Cell::new(identity.id), Cell::new(&identity.name)]);
    }
    out
}

pub fn summary_table(summary: &SessionSummary) -> Table {
    let mut out = Table::new();
    out.set_header(vec![
        header_cell("Rows"),
        header_cell("Saved"),
        header_cell("Skipped"),
        header_cell("Failed attempts"),
    ]);
    apply_table_style(&mut out);
    let failed = if summary.failed_attempts > 0 {
        Cell::new(summary.failed_attempts).fg(Color::Red)
    } else {
        dim_cell(0)
    };
    out.add_row(vec![
        Cell::new(summary.total_rows),
        Cell::new(summary.saved).fg(Color::Green),
        Cell::new(summary.skipped),
        failed,
    ]);
    out
}

/// One-line description of where the session is.
pub fn status_line(session: &ReviewSession) -> String {
    let state = session.state();
    match state.phase() {
        Phase::AwaitingInput => "awaiting input: load an extracted table".to_string(),
        Phase::Reviewing => {
            let mut line = format!(
                "row {} of {}",
                state.current_row_index() + 1,
                state.total_rows()
            );
            if let Some(row) = state.row() {
                match (row.name_column(), row.bound_identity()) {
                    (Some(column), Some(identity)) => {
                        line.push_str(&format!(" | name in column {}: {identity}", column + 1));
                    }
                    (Some(column), None) => {
                        line.push_str(&format!(" | name in column {}: no match", column + 1));
                    }
                    (None, _) => line.push_str(" | no name column"),
                }
            }
            line
        }
        Phase::Complete => {
            let summary = state.summary();
            format!(
                "review complete: {} saved, {} skipped",
                summary.saved, summary.skipped
            )
        }
    }
}

pub fn fault_line(fault: &SessionFault) -> String {
    if fault.retryable {
        format!("error: {} (submit again to retry)", fault.message)
    } else {
        format!("error: {}", fault.message)
    }
}

fn tag_cell(catalog: &TypeCatalog, tag: &TypeTag) -> Cell {
    if catalog.is_name(tag) {
        Cell::new(tag).add_attribute(Attribute::Bold)
    } else {
        Cell::new(tag)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
