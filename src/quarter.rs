//! Fiscal-quarter rollup of total audited value onto the sign-off sheet.

use crate::Progress;
use crate::cells::{CellRef, CellValue};
use crate::config::{QuarterOrder, ReportSchema};
use crate::error::{ReportError, Result};
use crate::workbook::{self, clear, write_number, write_text};
use calamine::{Reader, open_workbook_auto};
use chrono::{Datelike, NaiveDate};
use std::{collections::HashMap, fmt, path::Path};
use tracing::{debug, info};

/// Text formats accepted for manufacturing dates, tried in order.
const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

/// A quarter of an April-to-March fiscal year. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiscalQuarter {
    /// Calendar year in which the fiscal year starts.
    pub start_year: i32,
    pub quarter: u8,
}

impl FiscalQuarter {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        let start_year = if month >= 4 { date.year() } else { date.year() - 1 };
        let quarter = match month {
            4..=6 => 1,
            7..=9 => 2,
            10..=12 => 3,
            _ => 4,
        };
        Self { start_year, quarter }
    }
}

impl fmt::Display for FiscalQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Q{} FY {:02}-{:02}",
            self.quarter,
            self.start_year.rem_euclid(100),
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

/// Manufacturing date of a report cell: native dates, or text in one of the accepted formats.
pub fn parse_manufacturing_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(dt) => Some(dt.date()),
        CellValue::Text(s) => {
            let s = s.trim();
            DATE_FORMATS.iter().find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        }
        _ => None,
    }
}

pub fn quarter_label(value: &CellValue) -> Option<String> {
    parse_manufacturing_date(value).map(|d| FiscalQuarter::from_date(d).to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuarterTotal {
    pub label: String,
    pub value: f64,
}

/// Sums values per fiscal quarter; rows without a usable date are left out.
pub fn sum_by_quarter<'a>(
    rows: impl IntoIterator<Item = (&'a CellValue, &'a CellValue)>,
    order: QuarterOrder,
) -> Vec<QuarterTotal> {
    let mut sums: HashMap<FiscalQuarter, f64> = HashMap::new();
    for (date, value) in rows {
        let Some(quarter) = parse_manufacturing_date(date).map(FiscalQuarter::from_date) else {
            continue;
        };
        *sums.entry(quarter).or_insert(0.0) += value.to_f64_or_zero();
    }

    let mut buckets: Vec<(FiscalQuarter, f64)> = sums.into_iter().collect();
    match order {
        QuarterOrder::Lexical => buckets.sort_by_key(|(q, _)| q.to_string()),
        QuarterOrder::Fiscal => buckets.sort_by_key(|(q, _)| *q),
    }
    buckets.into_iter().map(|(q, value)| QuarterTotal { label: q.to_string(), value }).collect()
}

/// Reads (manufacturing date, total audited value) pairs from the saved report, using cached formula results.
fn read_report_rows(report: &Path, schema: &ReportSchema) -> Result<Vec<(CellValue, CellValue)>> {
    let layout = &schema.article;
    let mut wb = open_workbook_auto(report).map_err(|e| ReportError::file_access(report, e))?;
    let range = wb
        .worksheet_range(&layout.sheet)
        .map_err(|e| ReportError::file_access(report, e))?;
    let Some((last_row, _)) = range.end() else {
        return Ok(Vec::new());
    };

    let cell = |row: u32, col: u32| {
        range.get_value((row - 1, col - 1)).map(CellValue::from_calamine).unwrap_or_default()
    };
    Ok((layout.exemplar_row..=last_row + 1)
        .map(|row| (cell(row, layout.manufacturing_date.0), cell(row, layout.total_value.0)))
        .collect())
}

/// Writes labels into the quarter block and sums into the row below it, clearing the block first.
fn write_quarter_block(sheet: &mut umya_spreadsheet::Worksheet, start: CellRef, slots: u32, totals: &[QuarterTotal]) {
    for i in 0..slots {
        clear(sheet, CellRef::new(start.col + i, start.row));
        clear(sheet, CellRef::new(start.col + i, start.row + 1));
    }
    for (i, total) in (0..slots).zip(totals) {
        write_text(sheet, CellRef::new(start.col + i, start.row), &total.label);
        write_number(sheet, CellRef::new(start.col + i, start.row + 1), total.value);
    }
}

/// Groups the report's total audited value by manufacturing quarter and writes
/// the result onto the sign-off sheet. Returns every bucket in display order.
pub fn aggregate_quarters(
    report: &Path,
    output: &Path,
    schema: &ReportSchema,
    progress: &mut dyn Progress,
) -> Result<Vec<QuarterTotal>> {
    progress.message("Processing Manufacturing Quarter grouping...");
    let rows = read_report_rows(report, schema)?;
    let sign = &schema.sign;
    let totals = sum_by_quarter(rows.iter().map(|(d, v)| (d, v)), sign.quarter_order);
    debug!(?totals, "quarter buckets");

    let mut book = workbook::open(report)?;
    let sheet = workbook::sheet_mut(&mut book, &sign.sheet)?;
    write_quarter_block(sheet, sign.quarter_start, sign.quarter_slots, &totals);
    workbook::save(&book, output)?;

    for total in totals.iter().take(sign.quarter_slots as usize) {
        progress.message(&format!("Filled {}: {}", total.label, total.value));
    }
    if totals.len() > sign.quarter_slots as usize {
        progress.message(&format!(
            "Only the first {} of {} quarters fit on the sign-off sheet",
            sign.quarter_slots,
            totals.len()
        ));
    }
    info!(quarters = totals.len(), "quarter grouping written");
    Ok(totals)
}
