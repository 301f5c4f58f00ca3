use crate::Progress;
use crate::cells::CellValue;
use crate::config::SourceFields;
use crate::error::{ReportError, Result};
use calamine::{Reader, open_workbook_auto};
use csv::ReaderBuilder;
use std::{
    collections::{HashMap, HashSet},
    fs::File,
    path::Path,
};
use tracing::{debug, info, warn};

static EMPTY: CellValue = CellValue::Empty;

/// One countsheet row keyed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    values: HashMap<String, CellValue>,
}

impl SourceRecord {
    pub fn new(values: HashMap<String, CellValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, header: &str) -> &CellValue {
        self.values.get(header).unwrap_or(&EMPTY)
    }

    /// At least one quantity field holds a usable, non-zero value.
    pub fn is_valid(&self, quantities: &[String; 3]) -> bool {
        quantities.iter().any(|q| self.get(q).is_valid_quantity())
    }

    fn is_blank(&self) -> bool {
        self.values.values().all(CellValue::is_empty)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Countsheet {
    pub headers: Vec<String>,
    /// Valid records in source order.
    pub records: Vec<SourceRecord>,
    /// Non-blank rows dropped by the validity check.
    pub skipped: usize,
}

struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

fn normalize_header(h: &str) -> String {
    h.trim().to_string()
}

/// Reads the first worksheet in workbook order, not the sheet that was active when saved.
fn load_excel(path: &Path) -> Result<RawTable> {
    let mut wb = open_workbook_auto(path).map_err(|e| ReportError::file_access(path, e))?;
    let name = wb
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::structure(format!("{} has no worksheet", path.display())))?;
    let range = wb.worksheet_range(&name).map_err(|e| ReportError::file_access(path, e))?;

    let mut rows_iter = range.rows();
    let headers = rows_iter
        .next()
        .map(|r| r.iter().map(|c| normalize_header(&CellValue::from_calamine(c).to_text())).collect())
        .unwrap_or_default();
    let rows = rows_iter.map(|r| r.iter().map(CellValue::from_calamine).collect()).collect();
    Ok(RawTable { headers, rows })
}

fn load_csv(path: &Path) -> Result<RawTable> {
    let file = File::open(path).map_err(|e| ReportError::file_access(path, e))?;
    let mut rdr = ReaderBuilder::new().flexible(true).has_headers(true).from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|e| ReportError::file_access(path, e))?
        .iter()
        .map(normalize_header)
        .collect();
    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(|e| ReportError::file_access(path, e))?;
        rows.push(rec.iter().map(CellValue::from_text).collect());
    }
    Ok(RawTable { headers, rows })
}

fn read_table(path: &Path) -> Result<RawTable> {
    if !path.is_file() {
        return Err(ReportError::file_access(path, "file not found"));
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "csv" => load_csv(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_excel(path),
        _ => load_excel(path).or_else(|_| load_csv(path)),
    }
}

/// Checks the header row against the required headers and reports duplicates.
/// Duplicated headers keep the value of their last column.
fn bind_headers(headers: &[String], fields: &SourceFields, progress: &mut dyn Progress) -> Result<()> {
    let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
    let missing: Vec<&str> = fields
        .required_headers
        .iter()
        .map(String::as_str)
        .filter(|h| !present.contains(h))
        .collect();
    if !missing.is_empty() {
        return Err(ReportError::structure(format!(
            "countsheet is missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let mut seen = HashSet::new();
    let mut flagged = HashSet::new();
    for h in headers.iter().filter(|h| !h.is_empty()) {
        if !seen.insert(h.as_str()) && flagged.insert(h.as_str()) {
            warn!(header = %h, "duplicate countsheet header");
            progress.message(&format!("Warning: duplicate column '{h}' in countsheet, the last one is used"));
        }
    }
    Ok(())
}

/// Reads the countsheet and keeps the rows with at least one usable quantity.
pub fn load_countsheet(path: &Path, fields: &SourceFields, progress: &mut dyn Progress) -> Result<Countsheet> {
    progress.message("Loading countsheet data...");
    let table = read_table(path)?;
    bind_headers(&table.headers, fields, progress)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in table.rows {
        let mut values = HashMap::new();
        for (i, cell) in row.into_iter().enumerate() {
            if let Some(h) = table.headers.get(i).filter(|h| !h.is_empty()) {
                values.insert(h.clone(), cell);
            }
        }
        let record = SourceRecord::new(values);
        if record.is_blank() {
            continue;
        }
        if record.is_valid(&fields.quantities) {
            records.push(record);
        } else {
            skipped += 1;
        }
    }

    info!(path = %path.display(), kept = records.len(), skipped, "countsheet loaded");
    debug!(headers = ?table.headers, "countsheet headers");
    progress.message(&format!("Found {} valid data rows", records.len()));
    Ok(Countsheet { headers: table.headers, records, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn quantities() -> [String; 3] {
        SourceFields::default().quantities
    }

    fn record(pairs: &[(&str, CellValue)]) -> SourceRecord {
        SourceRecord::new(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn valid_when_any_quantity_is_present() {
        let q = quantities();
        let r = record(&[
            ("Original QTY", CellValue::Number(0.0)),
            ("Original Damage", CellValue::Text("0".into())),
            ("Original Expired", CellValue::Number(4.0)),
        ]);
        assert!(r.is_valid(&q));
        let r = record(&[("Original QTY", CellValue::Text("0.0".into()))]);
        assert!(!r.is_valid(&q));
        assert!(!SourceRecord::default().is_valid(&q));
    }

    fn minimal_fields() -> SourceFields {
        SourceFields {
            required_headers: vec!["Original QTY".into(), "Item Rate".into()],
            ..SourceFields::default()
        }
    }

    #[test]
    fn csv_rows_are_filtered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("count.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "Item Name,Original QTY,Original Damage,Original Expired,Item Rate").unwrap();
        writeln!(f, "A,2,0,0,10").unwrap();
        writeln!(f, "B,0,0,0,10").unwrap();
        writeln!(f, ",,,,").unwrap();
        writeln!(f, "C,,,n/a,5").unwrap();
        drop(f);

        let mut lines = Vec::new();
        let mut progress = |m: &str| lines.push(m.to_string());
        let sheet = load_countsheet(&path, &minimal_fields(), &mut progress).unwrap();
        let names: Vec<String> = sheet.records.iter().map(|r| r.get("Item Name").to_text()).collect();
        assert_eq!(names, ["A", "C"]);
        assert_eq!(sheet.skipped, 1);
        assert_eq!(sheet.records[0].get("Item Rate"), &CellValue::Number(10.0));
        assert!(lines.iter().any(|l| l == "Found 2 valid data rows"));
    }

    #[test]
    fn missing_required_header_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("count.csv");
        std::fs::write(&path, "Item Name,Original QTY\nA,1\n").unwrap();
        let err = load_countsheet(&path, &minimal_fields(), &mut |_: &str| {}).unwrap_err();
        assert!(matches!(err, ReportError::Structure(ref m) if m.contains("Item Rate")));
    }

    #[test]
    fn duplicate_headers_are_flagged_and_last_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("count.csv");
        std::fs::write(&path, "Original QTY,Item Rate,Item Rate\n1,5,7\n").unwrap();
        let mut lines = Vec::new();
        let mut progress = |m: &str| lines.push(m.to_string());
        let sheet = load_countsheet(&path, &minimal_fields(), &mut progress).unwrap();
        assert_eq!(sheet.records[0].get("Item Rate"), &CellValue::Number(7.0));
        assert!(lines.iter().any(|l| l.contains("duplicate column 'Item Rate'")));
    }

    #[test]
    fn missing_file_is_a_file_access_error() {
        let err = load_countsheet(Path::new("/nonexistent/count.xlsx"), &minimal_fields(), &mut |_: &str| {})
            .unwrap_err();
        assert!(matches!(err, ReportError::FileAccess { .. }));
    }
}
