//! Replicates the template's exemplar row once per countsheet record.

use crate::Progress;
use crate::cells::column_letters;
use crate::config::{ArticleLayout, ReportSchema};
use crate::error::{ReportError, Result};
use crate::workbook::{self, text_at};
use regex::Regex;
use tracing::{debug, info};
use umya_spreadsheet::{Spreadsheet, Style, Worksheet};

/// Style and formula captured from one exemplar cell.
#[derive(Debug, Clone)]
pub struct ColumnTemplate {
    pub style: Style,
    pub formula: Option<String>,
}

/// Per-column styles and formulas of the exemplar row.
#[derive(Debug, Clone)]
pub struct StyleTemplate {
    exemplar_row: u32,
    columns: Vec<ColumnTemplate>,
    row_ref: Regex,
}

impl StyleTemplate {
    pub fn capture(sheet: &Worksheet, layout: &ArticleLayout) -> Self {
        let row = layout.exemplar_row;
        let columns = (1..=layout.column_count)
            .map(|col| match sheet.get_cell((col, row)) {
                Some(cell) => {
                    let formula = cell.get_formula();
                    ColumnTemplate {
                        style: cell.get_style().clone(),
                        formula: (!formula.is_empty()).then(|| formula.to_string()),
                    }
                }
                None => ColumnTemplate { style: Style::default(), formula: None },
            })
            .collect();
        Self { exemplar_row: row, columns, row_ref: row_ref_pattern(row) }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Exemplar formula of a column re-anchored to `target_row`.
    pub fn formula_for(&self, idx: usize, target_row: u32) -> Option<String> {
        let formula = self.columns.get(idx)?.formula.as_deref()?;
        Some(self.rewrite(formula, target_row))
    }

    fn rewrite(&self, formula: &str, target_row: u32) -> String {
        if target_row == self.exemplar_row {
            return formula.to_string();
        }
        shift_row_refs(&self.row_ref, formula, target_row)
    }
}

/// Column letters directly followed by the exemplar row number and no further digit.
/// `A$5` keeps its absolute row and is not matched.
fn row_ref_pattern(row: u32) -> Regex {
    Regex::new(&format!(r"\b([A-Z]{{1,3}}){row}\b")).expect("row reference pattern is valid")
}

fn shift_row_refs(pattern: &Regex, formula: &str, target_row: u32) -> String {
    pattern
        .replace_all(formula, |caps: &regex::Captures| format!("{}{target_row}", &caps[1]))
        .into_owned()
}

/// Re-anchors every row-`exemplar_row` reference of `formula` to `target_row`.
pub fn rewrite_formula(formula: &str, exemplar_row: u32, target_row: u32) -> String {
    shift_row_refs(&row_ref_pattern(exemplar_row), formula, target_row)
}

/// First row at or below the exemplar whose label column contains the boundary label.
/// A "total" label above the exemplar row, such as a column header, is ignored.
pub fn find_boundary_row(sheet: &Worksheet, layout: &ArticleLayout) -> Option<u32> {
    let label = layout.boundary_label.to_lowercase();
    let last = sheet.get_highest_row();
    (layout.exemplar_row..=last).find(|&row| {
        text_at(sheet, layout.boundary_column.0, row).to_lowercase().contains(&label)
    })
}

/// Rejects a template that lacks either sheet or the boundary row.
/// Returns the boundary row of the article sheet.
pub fn check_template(book: &Spreadsheet, schema: &ReportSchema) -> Result<u32> {
    workbook::sheet(book, &schema.sign.sheet)?;
    let sheet = workbook::sheet(book, &schema.article.sheet)?;
    find_boundary_row(sheet, &schema.article).ok_or_else(|| {
        ReportError::structure(format!(
            "could not find the '{}' label row in column {} of '{}'",
            schema.article.boundary_label, schema.article.boundary_column, schema.article.sheet
        ))
    })
}

/// Rows generated in the article sheet.
#[derive(Debug, Clone)]
pub struct ExpandedRows {
    pub styles: StyleTemplate,
    pub first_row: u32,
    pub count: u32,
}

impl ExpandedRows {
    pub fn rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.first_row..self.first_row + self.count
    }

    /// Row directly below the generated block.
    pub fn subtotal_row(&self) -> u32 {
        self.first_row + self.count
    }
}

/// Replaces the placeholder rows of the article sheet with `count` styled blank rows.
pub fn expand_template(
    book: &mut Spreadsheet,
    schema: &ReportSchema,
    count: u32,
    progress: &mut dyn Progress,
) -> Result<ExpandedRows> {
    let boundary = check_template(book, schema)?;
    let layout = &schema.article;
    let first_row = layout.exemplar_row;
    let sheet = workbook::sheet_mut(book, &layout.sheet)?;

    let styles = StyleTemplate::capture(sheet, layout);
    debug!(
        boundary,
        formulas = ?styles.columns.iter().enumerate()
            .filter_map(|(i, c)| c.formula.as_ref().map(|f| format!("{}={f}", column_letters(i as u32 + 1))))
            .collect::<Vec<_>>(),
        "captured exemplar row"
    );

    if boundary > first_row {
        sheet.remove_row(&first_row, &(boundary - first_row));
    }
    if count > 0 {
        sheet.insert_new_row(&first_row, &count);
    }

    progress.message("Formatting and populating data rows...");
    for row in first_row..first_row + count {
        for (i, column) in styles.columns.iter().enumerate() {
            let cell = sheet.get_cell_mut((i as u32 + 1, row));
            cell.set_blank();
            cell.set_style(column.style.clone());
        }
    }

    info!(rows = count, removed = boundary.saturating_sub(first_row), "template expanded");
    Ok(ExpandedRows { styles, first_row, count })
}
