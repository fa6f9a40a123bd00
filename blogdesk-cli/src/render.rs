//! Plain-text table output

use std::fmt::Write;

use blogdesk_lib::model::Row;
use blogdesk_lib::query::Direction;
use blogdesk_lib::table::TableView;

/// Formats the visible data columns of a page as aligned text.
///
/// Control columns (selection, row actions) have no label and are skipped.
pub fn page<R: Row>(view: &TableView<'_, R>) -> String {
    let columns: Vec<_> = view.columns.iter().filter(|c| !c.def.label.is_empty()).collect();
    let header: Vec<String> = columns
        .iter()
        .map(|c| match c.sort {
            Some(Direction::Asc) => format!("{} ^", c.def.label),
            Some(Direction::Desc) => format!("{} v", c.def.label),
            None => c.def.label.clone(),
        })
        .collect();
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.value(&c.def.id).and_then(|v| v.to_text()).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", line("ID", &header, &widths, id_width(view)));
    for (row, cells) in view.rows.iter().zip(&rows) {
        let _ = writeln!(out, "{}", line(row.id(), cells, &widths, id_width(view)));
    }
    out
}

/// `Page 2 of 3 (25 rows)`, or `No rows` for an empty result.
pub fn summary<R>(view: &TableView<'_, R>) -> String {
    match view.total_count {
        Some(0) | None => "No rows".to_string(),
        Some(total) => format!(
            "Page {} of {} ({} rows, {} per page)",
            view.page_index + 1,
            view.page_count,
            total,
            view.page_size
        ),
    }
}

fn id_width<R: Row>(view: &TableView<'_, R>) -> usize {
    view.rows.iter().map(|r| r.id().chars().count()).max().unwrap_or(0).max(2)
}

fn line(id: &str, cells: &[String], widths: &[usize], id_width: usize) -> String {
    let mut out = format!("{:<width$}", id, width = id_width);
    for (cell, width) in cells.iter().zip(widths) {
        let _ = write!(out, "  {:<width$}", cell, width = width);
    }
    out.trim_end().to_string()
}
