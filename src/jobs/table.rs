use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use serde::{Deserialize, Serialize};

use crate::foundation::error::StampResult;

/// One cell of the job table, keeping "empty" distinct from any text value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Boolean cell.
    Bool(bool),
    /// Numeric cell; spreadsheet integers are widened.
    Number(f64),
    /// Text cell, possibly empty.
    Text(String),
    /// Blank cell or JSON `null`.
    Empty,
}

impl CellValue {
    /// Whether the cell is blank.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// One data row of the job table, keyed by column header.
#[derive(Clone, Debug, PartialEq)]
pub struct TableRecord {
    /// 1-based row number in the source table, header included.
    pub line: usize,
    /// Cells keyed by column header.
    pub cells: BTreeMap<String, CellValue>,
}

impl TableRecord {
    /// Record at `line` holding `cells`.
    pub fn new(line: usize, cells: impl IntoIterator<Item = (String, CellValue)>) -> Self {
        Self {
            line,
            cells: cells.into_iter().collect(),
        }
    }

    /// Cell under `column`, if the table has that column.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }
}

/// Read every data row of the job table at `path`.
///
/// Spreadsheets (`xlsx`, `xlsm`, `xlsb`, `xls`, `ods`) use their first sheet
/// with the first row as header. `json` files hold an array of objects.
/// Rows whose cells are all empty are skipped.
pub fn read_job_table(path: &Path) -> StampResult<Vec<TableRecord>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let records = match ext.as_str() {
        "json" => read_json_table(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_spreadsheet(path)?,
        _ => {
            return Err(anyhow!(
                "unsupported job table format '{}' (expected a spreadsheet or .json)",
                path.display()
            )
            .into());
        }
    };

    tracing::info!(path = %path.display(), rows = records.len(), "job table read");
    Ok(records)
}

fn read_json_table(path: &Path) -> StampResult<Vec<TableRecord>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read job table '{}'", path.display()))?;
    let rows: Vec<BTreeMap<String, CellValue>> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse job table '{}'", path.display()))?;

    Ok(rows
        .into_iter()
        .enumerate()
        .filter(|(_, cells)| !cells.values().all(CellValue::is_empty))
        .map(|(i, cells)| TableRecord { line: i + 2, cells })
        .collect())
}

fn read_spreadsheet(path: &Path) -> StampResult<Vec<TableRecord>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("open job table '{}'", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("job table '{}' has no worksheet", path.display()))?
        .with_context(|| format!("read first worksheet of '{}'", path.display()))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();

    let mut records = Vec::new();
    for (i, row) in rows.enumerate() {
        let cells: BTreeMap<String, CellValue> = header
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(col, name)| {
                let value = row.get(col).map(cell_value).unwrap_or(CellValue::Empty);
                (name.clone(), value)
            })
            .collect();
        if cells.values().all(CellValue::is_empty) {
            continue;
        }
        records.push(TableRecord {
            line: i + 2,
            cells,
        });
    }
    Ok(records)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/table.rs"]
mod tests;
