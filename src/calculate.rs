//! Fills the generated rows and computes the money columns and subtotals.

use crate::Progress;
use crate::cells::CellValue;
use crate::config::{ArticleLayout, FieldSource, ReportSchema, SourceFields};
use crate::countsheet::SourceRecord;
use crate::error::{ReportError, Result};
use crate::template::{ExpandedRows, expand_template};
use crate::workbook::{self, has_formula, number_at, write_value};
use std::path::Path;
use tracing::{debug, info};
use umya_spreadsheet::Worksheet;

/// Quantity and value totals of one countsheet row.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedTotals {
    pub total_qty: f64,
    pub inr: [f64; 3],
    pub total_value: f64,
}

impl DerivedTotals {
    pub fn compute(record: &SourceRecord, fields: &SourceFields) -> Self {
        let rate = record.get(&fields.rate).to_f64_or_zero();
        let qty = fields.quantities.each_ref().map(|q| record.get(q).to_f64_or_zero());
        let inr = qty.map(|q| q * rate);
        Self { total_qty: qty.iter().sum(), inr, total_value: inr.iter().sum() }
    }
}

/// Value of a mapped column for the record at `index` (0-based).
pub fn mapped_value(source: &FieldSource, index: usize, record: &SourceRecord) -> CellValue {
    match source {
        FieldSource::SerialNumber => CellValue::Number((index + 1) as f64),
        FieldSource::Constant { value } => CellValue::Text(value.clone()),
        FieldSource::Field { header } => record.get(header).clone(),
    }
}

/// Writes mapped values, re-anchored formulas and derived totals into every generated row.
pub fn populate_rows(sheet: &mut Worksheet, rows: &ExpandedRows, records: &[SourceRecord], schema: &ReportSchema) {
    let layout = &schema.article;
    let derived: Vec<u32> =
        [layout.total_qty, layout.total_value].iter().chain(&layout.inr).map(|c| c.0).collect();
    for (i, (row, record)) in rows.rows().zip(records).enumerate() {
        for col in 0..layout.column_count {
            let target = col + 1;
            match layout.columns.iter().find(|b| b.column == col) {
                Some(binding) => write_value(sheet, target, row, &mapped_value(&binding.source, i, record)),
                // derived totals replace whatever the exemplar had here
                None if derived.contains(&target) => {}
                None => {
                    if let Some(formula) = rows.styles.formula_for(col as usize, row) {
                        sheet.get_cell_mut((target, row)).set_formula(formula.trim_start_matches('='));
                    }
                }
            }
        }

        let totals = DerivedTotals::compute(record, &schema.source);
        write_totals(sheet, layout, row, &totals);
    }
}

fn write_totals(sheet: &mut Worksheet, layout: &ArticleLayout, row: u32, totals: &DerivedTotals) {
    sheet.get_cell_mut((layout.total_qty.0, row)).set_value_number(totals.total_qty);
    for (col, value) in layout.inr.iter().zip(totals.inr) {
        sheet.get_cell_mut((col.0, row)).set_value_number(value);
    }
    sheet.get_cell_mut((layout.total_value.0, row)).set_value_number(totals.total_value);
}

/// Sums each subtotal column over the generated rows into the row below them.
/// Cells holding formulas are skipped; other non-numeric cells count as zero.
pub fn write_subtotals(sheet: &mut Worksheet, rows: &ExpandedRows, layout: &ArticleLayout) -> Vec<(u32, f64)> {
    let target = rows.subtotal_row();
    let mut sums = Vec::new();
    for col in layout.subtotal_first.0..=layout.subtotal_last.0 {
        let sum: f64 = rows
            .rows()
            .filter(|&row| !has_formula(sheet, col, row))
            .map(|row| number_at(sheet, col, row).unwrap_or(0.0))
            .sum();
        sheet.get_cell_mut((col, target)).set_value_number(sum);
        sums.push((col, sum));
    }
    sums
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleReport {
    pub data_rows: usize,
    pub subtotal_row: u32,
}

/// Expands the template, fills one row per record and saves the result to `output`.
pub fn write_article_report(
    template: &Path,
    output: &Path,
    records: &[SourceRecord],
    schema: &ReportSchema,
    progress: &mut dyn Progress,
) -> Result<ArticleReport> {
    progress.message("Loading template...");
    let mut book = workbook::open(template)?;
    let count = u32::try_from(records.len())
        .map_err(|_| ReportError::structure("too many countsheet rows for one worksheet"))?;
    let rows = expand_template(&mut book, schema, count, progress)?;

    let sheet = workbook::sheet_mut(&mut book, &schema.article.sheet)?;
    populate_rows(sheet, &rows, records, schema);

    progress.message("Calculating subtotals...");
    let sums = write_subtotals(sheet, &rows, &schema.article);
    debug!(row = rows.subtotal_row(), ?sums, "subtotals written");

    workbook::save(&book, output)?;
    info!(output = %output.display(), rows = count, "article sheet written");
    progress.message(&format!("Data written to {}", output.display()));
    Ok(ArticleReport { data_rows: records.len(), subtotal_row: rows.subtotal_row() })
}
