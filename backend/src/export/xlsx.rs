//! Multi-sheet workbook export.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use super::{Cell, SheetTable};
use crate::error::ExportResult;

/// Longest sheet name the xlsx format accepts.
pub const MAX_SHEET_NAME: usize = 31;

/// Sheet name clipped to [`MAX_SHEET_NAME`] characters.
pub fn sheet_name(name: &str) -> String {
    name.chars().take(MAX_SHEET_NAME).collect()
}

fn build_workbook(tables: &[SheetTable]) -> ExportResult<Workbook> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in tables {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(&table.name))?;

        for (col, header) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (i, row) in table.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let c = col as u16;
                match cell {
                    Cell::Text(s) => sheet.write_string(r, c, s)?,
                    Cell::Int(n) => sheet.write_number(r, c, *n as f64)?,
                    Cell::Float(x) => sheet.write_number(r, c, *x)?,
                };
            }
        }
    }

    Ok(workbook)
}

/// Write every table as its own sheet to `path`.
pub fn write_workbook(tables: &[SheetTable], path: &Path) -> ExportResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut workbook = build_workbook(tables)?;
    workbook.save(path)?;
    Ok(())
}

/// Workbook bytes, for HTTP downloads.
pub fn workbook_bytes(tables: &[SheetTable]) -> ExportResult<Vec<u8>> {
    let mut workbook = build_workbook(tables)?;
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::export::{staff_table, summary_tables, totals_table};
    use crate::models::GroupTotal;
    use crate::transform::run_bytes;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use tempfile::tempdir;

    #[test]
    fn test_sheet_name_truncated() {
        let long = "Conduct Points By Form And House Ranked";
        assert_eq!(sheet_name(long).chars().count(), MAX_SHEET_NAME);
        assert_eq!(sheet_name("Staff Summary"), "Staff Summary");
    }

    #[test]
    fn test_workbook_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("weekly_summary_W1.xlsx");
        let tables = vec![
            staff_table(&[]),
            totals_table(
                "House Totals",
                "House",
                "House Points",
                &[GroupTotal { key: "Brunel".into(), value: 12 }],
            ),
        ];

        write_workbook(&tables, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    fn assert_cell(sheet: &str, cell: &Cell, data: &Data) {
        match (cell, data) {
            (Cell::Text(s), Data::String(d)) => assert_eq!(s, d, "{}", sheet),
            (Cell::Text(s), Data::Empty) => assert!(s.is_empty(), "{}: {:?}", sheet, s),
            (Cell::Int(n), Data::Float(d)) => assert_eq!(*n as f64, *d, "{}", sheet),
            (Cell::Int(n), Data::Int(d)) => assert_eq!(n, d, "{}", sheet),
            (Cell::Float(x), Data::Float(d)) => assert!((x - d).abs() < 1e-9, "{}", sheet),
            (cell, data) => panic!("{}: wrote {:?}, read {:?}", sheet, cell, data),
        }
    }

    #[test]
    fn test_workbook_reads_back() {
        let text = "Pupil Name,House,Form,Year,Reward,Category,Points,Date,Reward Description,Teacher,Dep,Subject\n\
            Ann Lee,B,7A,7,House Point,Effort,5,2024-09-09,Great work,ab,Maths,Maths\n\
            Bob Ray,K,8C,8,Detention,Behaviour,-2,2024-09-10,,cd,Science,Physics\n\
            Cal Day,B,7A,7,House Point,Homework,3,,,ab,Maths,Maths\n";
        let config = PipelineConfig {
            week_label: "W1".into(),
            ..PipelineConfig::default()
        };
        let report = run_bytes(text.as_bytes(), None, &config).unwrap();
        let tables = summary_tables(&report.summaries, &report.partition);

        let dir = tempdir().unwrap();
        let path = dir.path().join("weekly_summary_W1.xlsx");
        write_workbook(&tables, &path).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let names: Vec<String> = tables.iter().map(|t| sheet_name(&t.name)).collect();
        assert_eq!(workbook.sheet_names(), names);

        for table in &tables {
            let range = workbook.worksheet_range(&table.name).unwrap();
            let rows: Vec<&[Data]> = range.rows().collect();
            assert_eq!(rows.len(), table.rows.len() + 1, "{}", table.name);

            let headers: Vec<String> = rows[0].iter().map(|d| d.to_string()).collect();
            assert_eq!(headers, table.headers, "{}", table.name);

            for (written, read) in table.rows.iter().zip(&rows[1..]) {
                for (col, cell) in written.iter().enumerate() {
                    let data = read.get(col).unwrap_or(&Data::Empty);
                    assert_cell(&table.name, cell, data);
                }
            }
        }

        let totals = workbook.worksheet_range("House Totals").unwrap();
        assert_eq!(totals.get((1, 0)), Some(&Data::String("Brunel".into())));
        assert_eq!(totals.get((1, 1)), Some(&Data::Float(8.0)));
    }

    #[test]
    fn test_workbook_bytes() {
        let bytes = workbook_bytes(&[staff_table(&[])]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
