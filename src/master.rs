//! Master lookup: matches the report's anchor code and distributor against the
//! master table and back-fills both report sheets from the matched row.

use crate::Progress;
use crate::cells::{CellRef, CellValue};
use crate::config::{MasterFields, ReportSchema};
use crate::error::{ReportError, Result};
use crate::template::find_boundary_row;
use crate::workbook::{self, text_at, value_at, write_text, write_value};
use calamine::{Reader, open_workbook_auto};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterOutcome {
    /// 1-based sheet row of the first matching master record.
    Matched { master_row: usize },
    NoMatch,
    /// The master file has no anchor-code or distributor-name header.
    MissingColumns,
}

/// Master sheet contents, header row first.
#[derive(Debug, Clone, Default)]
pub struct MasterTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl MasterTable {
    /// Value under `header` in a row; duplicate headers resolve to the last column.
    pub fn field(&self, row: &[CellValue], header: &str) -> CellValue {
        self.headers
            .iter()
            .rposition(|h| h == header)
            .and_then(|i| row.get(i).cloned())
            .unwrap_or_default()
    }
}

/// Loads the first worksheet in workbook order; the saved active sheet is not consulted.
pub fn load_master(path: &Path) -> Result<MasterTable> {
    if !path.is_file() {
        return Err(ReportError::file_access(path, "file not found"));
    }
    let mut wb = open_workbook_auto(path).map_err(|e| ReportError::file_access(path, e))?;
    let Some(name) = wb.sheet_names().first().cloned() else {
        return Ok(MasterTable::default());
    };
    let range = wb.worksheet_range(&name).map_err(|e| ReportError::file_access(path, e))?;
    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|r| r.iter().map(|c| CellValue::from_calamine(c).to_text()).collect())
        .unwrap_or_default();
    let rows = rows.map(|r| r.iter().map(CellValue::from_calamine).collect()).collect();
    Ok(MasterTable { headers, rows })
}

/// Strips surrounding whitespace and the ".0" left behind by numeric codes read as text.
pub fn normalize_code(code: &str) -> String {
    let s = code.trim();
    s.strip_suffix(".0").unwrap_or(s).to_string()
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalized (anchor code, distributor name) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub code: String,
    pub name: String,
}

impl MatchKey {
    pub fn new(code: &str, name: &str) -> Self {
        Self { code: normalize_code(code), name: normalize_name(name) }
    }
}

/// Column indices of the anchor-code and distributor-name headers.
/// When several headers match, the rightmost one is used.
pub fn find_key_columns(headers: &[String], fields: &MasterFields) -> (Option<usize>, Option<usize>) {
    let matches = |h: &str, keys: &[String]| {
        let l = h.to_lowercase();
        keys.iter().any(|k| l.contains(&k.to_lowercase()))
    };
    let code = headers.iter().rposition(|h| matches(h, &fields.anchor_code_keys));
    let name = headers.iter().rposition(|h| matches(h, &fields.distributor_keys));
    (code, name)
}

/// Index of the first row whose normalized key equals `key`.
pub fn find_match(table: &MasterTable, key: &MatchKey, code_col: usize, name_col: usize) -> Option<usize> {
    table.rows.iter().position(|row| {
        let cell = |i: usize| row.get(i).map(CellValue::to_text).unwrap_or_default();
        MatchKey::new(&cell(code_col), &cell(name_col)) == *key
    })
}

/// Replaces the first placeholder phrase found in a sign-off note with today's date.
pub fn fill_date_note(note: &str, today: NaiveDate) -> Option<String> {
    let long = today.format("%d-%m-%Y");
    if note.contains("date upto  ( )") {
        Some(note.replace("date upto  ( )", &format!("date upto ({long})")))
    } else if note.contains("date of Audit. ( )") {
        Some(note.replace("date of Audit. ( )", &format!("date of Audit. ({long})")))
    } else if note.contains("()") {
        Some(note.replace("()", &format!("({})", today.format("%d-%m-%y"))))
    } else {
        None
    }
}

/// Values taken from the matched master row.
struct MatchedFields {
    serial: CellValue,
    anchor_name: CellValue,
    region: CellValue,
    code_display: CellValue,
    distributor_city: String,
    reported_value: CellValue,
}

impl MatchedFields {
    fn extract(table: &MasterTable, row: &[CellValue], fields: &MasterFields) -> Self {
        let serial_header = fields.audit_serial.trim().to_lowercase();
        let serial = table
            .headers
            .iter()
            .position(|h| h.trim().to_lowercase() == serial_header)
            .and_then(|i| row.get(i).cloned())
            .unwrap_or_default();
        let db_name = table.field(row, &fields.db_name).to_text();
        let city = table.field(row, &fields.city).to_text();
        let distributor_city =
            if db_name.is_empty() && city.is_empty() { String::new() } else { format!("{db_name} & {city}") };
        Self {
            serial,
            anchor_name: table.field(row, &fields.anchor_name),
            region: table.field(row, &fields.region),
            code_display: table.field(row, &fields.code_display),
            distributor_city,
            reported_value: table.field(row, &fields.reported_value),
        }
    }
}

/// Looks up the report's key in the master file and fills the dependent cells.
///
/// A missing key column or an unmatched key is reported through `progress` and
/// leaves the report unchanged; the workbook is saved to `output` either way.
pub fn resolve_master(
    report: &Path,
    master: &Path,
    output: &Path,
    schema: &ReportSchema,
    today: NaiveDate,
    progress: &mut dyn Progress,
) -> Result<MasterOutcome> {
    progress.message("Processing master file lookup...");
    let layout = &schema.article;
    let mut book = workbook::open(report)?;
    let article = workbook::sheet(&book, &layout.sheet)?;
    let boundary = find_boundary_row(article, layout).ok_or_else(|| {
        ReportError::structure(format!("report sheet '{}' has no '{}' row", layout.sheet, layout.boundary_label))
    })?;
    let first = layout.exemplar_row;
    let code = text_at(article, layout.anchor_code.0, first);
    let name = text_at(article, layout.distributor_name.0, first);
    progress.message(&format!("Looking up: Anchor Code = {code}, Distributor = {name}"));

    let table = load_master(master)?;
    debug!(headers = ?table.headers, "master headers");
    let outcome = match find_key_columns(&table.headers, &schema.master) {
        (Some(code_col), Some(name_col)) if boundary > first => {
            let key = MatchKey::new(&code, &name);
            match find_match(&table, &key, code_col, name_col) {
                Some(idx) => {
                    debug!(row = idx + 2, ?key, "master match");
                    progress.message("Found matching row in master file");
                    let matched = MatchedFields::extract(&table, &table.rows[idx], &schema.master);
                    apply_match(&mut book, schema, &matched, boundary, today, progress)?;
                    MasterOutcome::Matched { master_row: idx + 2 }
                }
                None => {
                    progress.message("No matching row found in master file");
                    MasterOutcome::NoMatch
                }
            }
        }
        (Some(_), Some(_)) => {
            progress.message("Report has no data rows to look up");
            MasterOutcome::NoMatch
        }
        (code_col, name_col) => {
            warn!(?code_col, ?name_col, "master key columns not found");
            progress.message("Could not find required columns in master file");
            MasterOutcome::MissingColumns
        }
    };

    workbook::save(&book, output)?;
    info!(?outcome, "master lookup finished");
    Ok(outcome)
}

fn apply_match(
    book: &mut umya_spreadsheet::Spreadsheet,
    schema: &ReportSchema,
    matched: &MatchedFields,
    boundary: u32,
    today: NaiveDate,
    progress: &mut dyn Progress,
) -> Result<()> {
    let layout = &schema.article;
    let sign = &schema.sign;

    let article = workbook::sheet_mut(book, &layout.sheet)?;
    for row in layout.exemplar_row..boundary {
        write_value(article, layout.anchor_name.0, row, &matched.anchor_name);
        write_value(article, layout.region.0, row, &matched.region);
    }
    write_value(article, layout.audit_serial.col, layout.audit_serial.row, &matched.serial);
    let totals: Vec<(CellRef, CellValue)> = sign
        .totals
        .iter()
        .map(|t| (t.to, value_at(article, CellRef::new(t.from.0, boundary))))
        .collect();

    progress.message("Updating Sign Format sheet...");
    let sheet = workbook::sheet_mut(book, &sign.sheet)?;
    write_value(sheet, sign.serial.col, sign.serial.row, &matched.serial);
    write_value(sheet, sign.anchor_code.col, sign.anchor_code.row, &matched.code_display);
    write_value(sheet, sign.anchor_name.col, sign.anchor_name.row, &matched.anchor_name);
    write_text(sheet, sign.distributor_city, &matched.distributor_city);
    write_text(sheet, sign.report_date, &today.format("%d-%m-%Y").to_string());

    for at in &sign.date_notes {
        let note = text_at(sheet, at.col, at.row);
        if let Some(filled) = fill_date_note(&note, today) {
            write_text(sheet, *at, &filled);
        }
    }

    for (to, value) in &totals {
        write_value(sheet, to.col, to.row, value);
    }
    write_value(sheet, sign.reported_value.col, sign.reported_value.row, &matched.reported_value);
    Ok(())
}
