// src/worklist.rs

use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{debug, info};

use crate::record::WorklistRow;

/// The article-id column is the first header containing this.
pub const ARTICLE_COLUMN_MARKER: &str = "記事";
/// Optional sequence-number column, matched exactly.
pub const NUMBER_COLUMN: &str = "番号";

/// Renders a cell the way it reads in the sheet: whole numbers without a
/// trailing `.0`, empty cells as `""`.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Builds the worklist from a header row and data rows of rendered cells.
/// Fails when no header mentions [`ARTICLE_COLUMN_MARKER`].
pub fn from_table<I>(header: &[String], rows: I) -> Result<Vec<WorklistRow>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let Some(article_col) = header.iter().position(|h| h.contains(ARTICLE_COLUMN_MARKER)) else {
        bail!("no column containing 「{}」 in header {:?}", ARTICLE_COLUMN_MARKER, header);
    };
    let number_col = header.iter().position(|h| h.trim() == NUMBER_COLUMN);
    debug!(article = %header[article_col], ?number_col, "worklist columns");

    fn cell(row: &[String], col: usize) -> String {
        row.get(col).cloned().unwrap_or_default()
    }

    Ok(rows
        .into_iter()
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .map(|row| WorklistRow {
            number: number_col.map(|c| cell(&row, c)).unwrap_or_default(),
            article_id: cell(&row, article_col),
        })
        .collect())
}

/// Reads the worklist from the first sheet of `path` (.xlsx, .xls, .ods).
pub fn load(path: &Path) -> Result<Vec<WorklistRow>> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("opening workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("{} has no sheets", path.display()))?
        .with_context(|| format!("reading first sheet of {}", path.display()))?;

    let mut rows = range
        .rows()
        .map(|r| r.iter().map(cell_text).collect::<Vec<_>>());
    let header = rows
        .next()
        .ok_or_else(|| anyhow!("{} is empty", path.display()))?;

    let worklist = from_table(&header, rows)?;
    info!(path = %path.display(), rows = worklist.len(), "worklist loaded");
    Ok(worklist)
}
