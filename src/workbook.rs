//! Template-preserving workbook access.
//!
//! Stages that must keep styles and formulas intact go through
//! `umya-spreadsheet`; plain value reads use calamine.

use crate::cells::{CellRef, CellValue, excel_serial, is_date_format, parse_number};
use crate::error::{ReportError, Result};
use std::path::Path;
use umya_spreadsheet::{Spreadsheet, Worksheet, reader, writer};

const DATE_FORMAT: &str = "dd-mm-yyyy";

pub fn open(path: &Path) -> Result<Spreadsheet> {
    if !path.is_file() {
        return Err(ReportError::file_access(path, "file not found"));
    }
    reader::xlsx::read(path).map_err(|e| ReportError::file_access(path, e))
}

pub fn save(book: &Spreadsheet, path: &Path) -> Result<()> {
    writer::xlsx::write(book, path).map_err(|e| ReportError::file_access(path, e))
}

pub fn sheet<'a>(book: &'a Spreadsheet, name: &str) -> Result<&'a Worksheet> {
    book.get_sheet_by_name(name)
        .ok_or_else(|| ReportError::structure(format!("workbook has no sheet named '{name}'")))
}

pub fn sheet_mut<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet> {
    book.get_sheet_by_name_mut(name)
        .ok_or_else(|| ReportError::structure(format!("workbook has no sheet named '{name}'")))
}

/// Displayed text of a cell, empty when the cell does not exist.
pub fn text_at(sheet: &Worksheet, col: u32, row: u32) -> String {
    sheet.get_cell((col, row)).map(|c| c.get_value().to_string()).unwrap_or_default()
}

pub fn number_at(sheet: &Worksheet, col: u32, row: u32) -> Option<f64> {
    let cell = sheet.get_cell((col, row))?;
    cell.get_value_number().or_else(|| parse_number(&cell.get_value()))
}

pub fn has_formula(sheet: &Worksheet, col: u32, row: u32) -> bool {
    sheet.get_cell((col, row)).is_some_and(|c| !c.get_formula().is_empty())
}

/// Writes a scalar while keeping the cell's style. Empty values leave the cell untouched.
pub fn write_value(sheet: &mut Worksheet, col: u32, row: u32, value: &CellValue) {
    match value {
        CellValue::Empty => {}
        CellValue::Text(s) => {
            sheet.get_cell_mut((col, row)).set_value_string(s.as_str());
        }
        CellValue::Number(n) => {
            sheet.get_cell_mut((col, row)).set_value_number(*n);
        }
        CellValue::Bool(b) => {
            sheet.get_cell_mut((col, row)).set_value_bool(*b);
        }
        CellValue::Date(dt) => {
            let cell = sheet.get_cell_mut((col, row));
            let dated = cell
                .get_style()
                .get_number_format()
                .is_some_and(|f| is_date_format(f.get_format_code()));
            if !dated {
                cell.get_style_mut().get_number_format_mut().set_format_code(DATE_FORMAT);
            }
            cell.set_value_number(excel_serial(*dt));
        }
    }
}

pub fn write_text(sheet: &mut Worksheet, at: CellRef, text: &str) {
    sheet.get_cell_mut(at.coords()).set_value_string(text);
}

pub fn write_number(sheet: &mut Worksheet, at: CellRef, n: f64) {
    sheet.get_cell_mut(at.coords()).set_value_number(n);
}

pub fn clear(sheet: &mut Worksheet, at: CellRef) {
    sheet.get_cell_mut(at.coords()).set_blank();
}

/// Stored value of a cell as a scalar; numbers stay numbers.
pub fn value_at(sheet: &Worksheet, at: CellRef) -> CellValue {
    let Some(cell) = sheet.get_cell(at.coords()) else {
        return CellValue::Empty;
    };
    match cell.get_value_number() {
        Some(n) => CellValue::Number(n),
        None => {
            let text = cell.get_value();
            if text.is_empty() { CellValue::Empty } else { CellValue::Text(text.to_string()) }
        }
    }
}
