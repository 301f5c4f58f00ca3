//! Countsheet audit report generation.
//!
//! A run turns a countsheet and a master lookup table into a filled copy of the
//! report template. Five stages run in order and each one persists the output
//! workbook before the next one reopens it:
//!
//! 1. [`countsheet::load_countsheet`] keeps rows with a usable quantity.
//! 2. [`template::expand_template`] replicates the exemplar row once per record.
//! 3. [`calculate::write_article_report`] fills the rows, totals and subtotals.
//! 4. [`master::resolve_master`] back-fills lookup fields and the sign-off sheet.
//! 5. [`quarter::aggregate_quarters`] writes per-quarter totals. It is skipped
//!    when the master file lacks its key columns.

pub mod calculate;
pub mod cells;
pub mod config;
pub mod countsheet;
pub mod error;
pub mod master;
pub mod quarter;
pub mod template;
pub mod workbook;

use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::info;

pub use cells::CellValue;
pub use config::ReportSchema;
pub use error::{ReportError, Result};
pub use master::MasterOutcome;
pub use quarter::QuarterTotal;

/// Receives human-readable progress lines from a run.
pub trait Progress {
    fn message(&mut self, line: &str);
}

impl<F: FnMut(&str)> Progress for F {
    fn message(&mut self, line: &str) {
        self(line)
    }
}

/// Discards progress lines.
pub struct Silent;

impl Progress for Silent {
    fn message(&mut self, _line: &str) {}
}

#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub countsheet: PathBuf,
    pub template: PathBuf,
    pub master: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub schema: ReportSchema,
    /// Date stamped on the sign-off sheet.
    pub today: NaiveDate,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { schema: ReportSchema::default(), today: chrono::Local::now().date_naive() }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub data_rows: usize,
    pub skipped_rows: usize,
    pub subtotal_row: u32,
    pub master: MasterOutcome,
    pub quarters: Vec<QuarterTotal>,
}

/// Runs all five stages against the given files.
pub fn generate_report(paths: &ReportPaths, opts: &ReportOptions, progress: &mut dyn Progress) -> Result<RunSummary> {
    let schema = &opts.schema;

    let sheet = countsheet::load_countsheet(&paths.countsheet, &schema.source, progress)?;
    let article = calculate::write_article_report(&paths.template, &paths.output, &sheet.records, schema, progress)?;
    let master = master::resolve_master(&paths.output, &paths.master, &paths.output, schema, opts.today, progress)?;
    // a master file without key columns ends the run with the sign-off sheet untouched
    let quarters = match master {
        MasterOutcome::MissingColumns => {
            info!("quarter grouping skipped, master key columns missing");
            Vec::new()
        }
        _ => quarter::aggregate_quarters(&paths.output, &paths.output, schema, progress)?,
    };

    info!(
        output = %paths.output.display(),
        rows = article.data_rows,
        quarters = quarters.len(),
        "report generated"
    );
    progress.message(&format!("Report completed and saved to {}", paths.output.display()));
    Ok(RunSummary {
        data_rows: article.data_rows,
        skipped_rows: sheet.skipped,
        subtotal_row: article.subtotal_row,
        master,
        quarters,
    })
}
