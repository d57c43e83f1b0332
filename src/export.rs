use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::parser::CaseRecord;

pub const CSV_HEADER: [&str; 6] = ["Sno", "CaseNo", "DiaryNo", "CaseNoMap", "JudgeName", "CourtNo"];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(w: &mut W, row: &[&str]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

/// Header plus one row per record.
pub fn write_csv<W: Write>(mut w: W, records: &[CaseRecord]) -> io::Result<()> {
    write_row(&mut w, &CSV_HEADER)?;
    for r in records {
        write_row(
            &mut w,
            &[
                &r.serial_no,
                &r.case_no,
                &r.diary_no,
                &r.case_no_display,
                &r.judge_names,
                &r.court_no,
            ],
        )?;
    }
    w.flush()
}

pub fn write_csv_file(path: &Path, records: &[CaseRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_csv(BufWriter::new(file), records).with_context(|| format!("Failed to write {:?}", path))
}
