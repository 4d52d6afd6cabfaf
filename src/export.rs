// src/export.rs

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::record::{ArticleRecord, COLUMNS};

/// Font applied to every cell of the output sheet.
pub const FONT_NAME: &str = "游ゴシック";
pub const SHEET_NAME: &str = "Sheet1";

/// `<dir of input>/<YYYY_MMDD_HHMMSS>_output.xlsx`
pub fn output_path(input: &Path, now: NaiveDateTime) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{}_output.xlsx", now.format("%Y_%m%d_%H%M%S")))
}

/// Writes the header row and one row per record to a fresh workbook at `path`.
pub fn write_workbook(path: &Path, records: &[ArticleRecord]) -> Result<()> {
    let font = Format::new().set_font_name(FONT_NAME);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &font)?;
    }
    for (i, record) in records.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, value) in record.to_cells().iter().enumerate() {
            sheet.write_string_with_format(row, col as u16, *value, &font)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), rows = records.len(), "workbook written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ArticleFields, WorklistRow};
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn output_name_follows_input_directory() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 1)
            .unwrap();
        let p = output_path(Path::new("/data/lists/input.xlsx"), now);
        assert_eq!(p, PathBuf::from("/data/lists/2024_0305_090701_output.xlsx"));

        let bare = output_path(Path::new("input.xlsx"), now);
        assert_eq!(bare, PathBuf::from("2024_0305_090701_output.xlsx"));
    }

    #[test]
    fn writes_header_and_rows() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.xlsx");
        let ok = ArticleRecord::extracted(
            &WorklistRow { number: "1".into(), article_id: "a".into() },
            ArticleFields {
                title: "タイトル1".into(),
                answer: "line1\nline2".into(),
                ..Default::default()
            },
        );
        let failed = ArticleRecord::failed(&WorklistRow {
            number: "7".into(),
            article_id: "AB-123".into(),
        });
        write_workbook(&path, &[ok, failed])?;

        let mut wb = open_workbook_auto(&path)?;
        let names = wb.sheet_names();
        assert_eq!(names, vec![SHEET_NAME.to_string()]);
        let range = wb.worksheet_range_at(0).unwrap()?;
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|r| {
                r.iter()
                    .map(|c| match c {
                        Data::String(s) => s.clone(),
                        Data::Empty => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        assert_eq!(rows[1][3], "タイトル1");
        assert_eq!(rows[1][8], "line1\nline2");
        assert_eq!(rows[2][0], "7");
        assert_eq!(rows[2][1], "AB-123");
        assert_eq!(rows[2][3], "エラー発生");
        Ok(())
    }

    #[test]
    fn empty_output_still_has_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.xlsx");
        write_workbook(&path, &[])?;

        let mut wb = open_workbook_auto(&path)?;
        let range = wb.worksheet_range_at(0).unwrap()?;
        assert_eq!(range.height(), 1);
        assert_eq!(range.width(), COLUMNS.len());
        Ok(())
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.xlsx");
        assert!(write_workbook(&path, &[]).is_err());
    }
}
