// Excel import/export for the task collection

use crate::models::{Category, Task, now_ms};
use crate::slot::Slot;
use crate::store::TaskStore;
use calamine::{Data, Reader, Xlsx};
use chrono::{Days, NaiveDate};
use eyre::{Context, Result};
use rust_xlsxwriter::Workbook;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default file name for exports
pub const EXPORT_FILE_NAME: &str = "todo-list.xlsx";

/// Worksheet name used on export
pub const SHEET_NAME: &str = "To-Do List";

/// Header row, in column order; every imported row must carry all of them
pub const REQUIRED_FIELDS: [&str; 7] = [
    "id",
    "description",
    "startDate",
    "dueDate",
    "category",
    "isCompleted",
    "isExpired",
];

const UNTITLED: &str = "Untitled Task";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("not an .xlsx file: {0}")]
    WrongFileType(PathBuf),

    #[error("row {row} is missing required fields: {}", fields.join(", "))]
    MissingFields { row: usize, fields: Vec<&'static str> },

    #[error("failed to process workbook: {0}")]
    Malformed(String),

    #[error("failed to read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0:#}")]
    Storage(eyre::Report),
}

impl From<eyre::Report> for ImportError {
    fn from(report: eyre::Report) -> Self {
        ImportError::Storage(report)
    }
}

impl ImportError {
    /// Notification text shown to the user
    pub fn user_message(&self) -> String {
        match self {
            ImportError::WrongFileType(_) => "Please upload a valid Excel file.".to_string(),
            ImportError::MissingFields { .. } => format!(
                "Invalid data structure in the file. Please ensure the data includes {}.",
                REQUIRED_FIELDS.map(|f| format!("'{}'", f)).join(", ")
            ),
            ImportError::Malformed(_) | ImportError::Io(_) => {
                "An error occurred while processing the file.".to_string()
            }
            ImportError::Storage(report) => format!("Failed to save imported tasks: {:#}", report),
        }
    }
}

/// What an import did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Ids of the tasks added, in file order
    pub imported: Vec<i64>,
    /// Ids that already existed and were left alone
    pub skipped: Vec<i64>,
}

impl ImportReport {
    pub fn message(&self) -> String {
        let n = self.imported.len();
        let mut parts = vec![if n == 0 {
            "No new tasks were imported.".to_string()
        } else {
            format!("{} task{} imported successfully.", n, if n == 1 { "" } else { "s" })
        }];
        parts.extend(
            self.skipped
                .iter()
                .map(|id| format!("Task with ID {} already exists.", id)),
        );
        parts.join(" ")
    }
}

// ============================================================================
// Export
// ============================================================================

/// Serialize `tasks` into an in-memory workbook
pub fn export_bytes(tasks: &[Task]) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(tasks)?;
    let bytes = workbook.save_to_buffer().context("Failed to serialize workbook")?;
    Ok(bytes)
}

/// Write `tasks` to an .xlsx file at `path`
pub fn export_xlsx(tasks: &[Task], path: &Path) -> Result<()> {
    let mut workbook = build_workbook(tasks)?;
    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook {:?}", path))?;
    info!(file = ?path, count = tasks.len(), "Exported tasks");
    Ok(())
}

fn build_workbook(tasks: &[Task]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, field) in REQUIRED_FIELDS.iter().enumerate() {
        sheet.write_string(0, col as u16, *field)?;
    }

    for (index, task) in tasks.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_number(row, 0, task.id as f64)?;
        sheet.write_string(row, 1, &task.description)?;
        sheet.write_string(row, 2, task.start_date.format("%Y-%m-%d").to_string())?;
        sheet.write_string(row, 3, task.due_date.format("%Y-%m-%d").to_string())?;
        sheet.write_string(row, 4, task.category.as_str())?;
        sheet.write_boolean(row, 5, task.is_completed)?;
        sheet.write_boolean(row, 6, task.is_expired)?;
    }

    Ok(workbook)
}

// ============================================================================
// Import
// ============================================================================

/// Import an .xlsx file into `store`
pub fn import_xlsx<S: Slot>(store: &mut TaskStore<S>, path: &Path, today: NaiveDate) -> Result<ImportReport, ImportError> {
    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if !is_xlsx {
        return Err(ImportError::WrongFileType(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    import_bytes(store, &bytes, today)
}

/// Import workbook bytes into `store`
///
/// Structure and values are checked for every row before anything is added,
/// and the new rows are stored in one write, so a failed import leaves the
/// store untouched. Rows whose id is already
/// present are skipped and reported.
pub fn import_bytes<S: Slot>(store: &mut TaskStore<S>, bytes: &[u8], today: NaiveDate) -> Result<ImportReport, ImportError> {
    let rows = read_rows(bytes)?;

    for row in &rows {
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !row.cells.contains_key(field))
            .collect();
        if !missing.is_empty() {
            warn!(row = row.number, ?missing, "Import rejected: missing fields");
            return Err(ImportError::MissingFields {
                row: row.number,
                fields: missing,
            });
        }
    }

    let parsed = rows.iter().map(parse_row).collect::<Result<Vec<_>, _>>()?;

    let mut seen: HashSet<i64> = store.tasks().iter().map(|t| t.id).collect();
    let fallback_base = now_ms();
    let mut report = ImportReport::default();
    let mut fresh = Vec::new();

    for (index, row) in parsed.into_iter().enumerate() {
        if let Some(id) = row.id.filter(|id| seen.contains(id)) {
            debug!(id, "Skipping duplicate id");
            report.skipped.push(id);
            continue;
        }

        let id = match row.id {
            Some(id) => id,
            None => {
                let mut id = fallback_base + index as i64;
                while seen.contains(&id) {
                    id += 1;
                }
                id
            }
        };

        seen.insert(id);
        fresh.push(row.into_task(id, today));
        report.imported.push(id);
    }

    store.extend(fresh)?;

    info!(
        imported = report.imported.len(),
        skipped = report.skipped.len(),
        "Import complete"
    );
    Ok(report)
}

/// Non-empty cells of one data row keyed by header name
struct RawRow {
    /// Spreadsheet row number, 1-based, header is row 1
    number: usize,
    cells: HashMap<&'static str, Data>,
}

/// Row values with falsy entries mapped to `None`
struct ParsedRow {
    id: Option<i64>,
    description: Option<String>,
    start_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    category: Category,
    is_completed: bool,
    is_expired: bool,
}

impl ParsedRow {
    fn into_task(self, id: i64, today: NaiveDate) -> Task {
        Task {
            id,
            description: self.description.unwrap_or_else(|| UNTITLED.to_string()),
            start_date: self.start_date.unwrap_or(today),
            due_date: self.due_date.unwrap_or(today),
            category: self.category,
            is_completed: self.is_completed,
            is_expired: self.is_expired,
        }
    }
}

fn read_rows(bytes: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ImportError::Malformed(e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::Malformed("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ImportError::Malformed(e.to_string()))?;

    let mut iter = range.rows();
    let Some(header) = iter.next() else {
        return Ok(Vec::new());
    };

    let mut columns: HashMap<usize, &'static str> = HashMap::new();
    for (col, cell) in header.iter().enumerate() {
        let Data::String(name) = cell else { continue };
        let Some(field) = REQUIRED_FIELDS.iter().find(|f| **f == name.trim()) else {
            continue;
        };
        // First column with a given header wins
        if !columns.values().any(|existing| existing == field) {
            columns.insert(col, *field);
        }
    }

    let mut rows = Vec::new();
    for (offset, cells) in iter.enumerate() {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut row = RawRow {
            number: range.start().map(|(r, _)| r as usize).unwrap_or(0) + offset + 2,
            cells: HashMap::new(),
        };
        for (col, cell) in cells.iter().enumerate() {
            if matches!(cell, Data::Empty) {
                continue;
            }
            if let Some(field) = columns.get(&col) {
                row.cells.insert(*field, cell.clone());
            }
        }
        rows.push(row);
    }

    debug!(sheet = %sheet, rows = rows.len(), "Read workbook rows");
    Ok(rows)
}

fn parse_row(row: &RawRow) -> Result<ParsedRow, ImportError> {
    let cell = |field: &str| row.cells.get(field).unwrap_or(&Data::Empty);
    let bad = |field: &str, cell: &Data| {
        ImportError::Malformed(format!("row {}: invalid {} value {:?}", row.number, field, cell))
    };

    let id = match cell("id") {
        Data::Int(i) => Some(*i),
        Data::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(s.trim().parse::<i64>().map_err(|_| bad("id", cell("id")))?),
        other => return Err(bad("id", other)),
    }
    .filter(|id| *id != 0);

    let description = match cell("description") {
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        _ => None,
    }
    .filter(|s| !s.trim().is_empty());

    let start_date = cell_date(cell("startDate")).ok_or_else(|| bad("startDate", cell("startDate")))?;
    let due_date = cell_date(cell("dueDate")).ok_or_else(|| bad("dueDate", cell("dueDate")))?;

    let category = match cell("category") {
        Data::String(s) => Category::from_import(s),
        _ => Category::None,
    };

    let is_completed = cell_bool(cell("isCompleted")).ok_or_else(|| bad("isCompleted", cell("isCompleted")))?;
    let is_expired = cell_bool(cell("isExpired")).ok_or_else(|| bad("isExpired", cell("isExpired")))?;

    Ok(ParsedRow {
        id,
        description,
        start_date,
        due_date,
        category,
        is_completed,
        is_expired,
    })
}

/// Outer `None` means unreadable, inner `None` means blank
fn cell_date(cell: &Data) -> Option<Option<NaiveDate>> {
    match cell {
        Data::Empty => Some(None),
        Data::String(s) | Data::DateTimeIso(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(None);
            }
            // Accept full ISO timestamps by keeping the date part
            let date_part = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok().map(Some)
        }
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map(Some),
        Data::Float(f) => excel_serial_to_date(*f).map(Some),
        Data::Int(i) => excel_serial_to_date(*i as f64).map(Some),
        _ => None,
    }
}

fn cell_bool(cell: &Data) -> Option<bool> {
    match cell {
        Data::Empty => Some(false),
        Data::Bool(b) => Some(*b),
        Data::Int(i) => Some(*i != 0),
        Data::Float(f) => Some(*f != 0.0),
        Data::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "false" | "0" | "no" => Some(false),
            "true" | "1" | "yes" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Excel's 1900 date system counts days from 1899-12-30
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Serials past the last representable date are unreadable, not clamped
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}
