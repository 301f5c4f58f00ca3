//! Report layout and field bindings.
//!
//! Every fixed position the template relies on lives here, with defaults that
//! match the shipped template. A JSON file may override any subset of fields.

use crate::cells::{CellRef, Column};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// Where a mapped output column takes its value from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSource {
    /// 1-based position of the record in the generated block.
    SerialNumber,
    /// A fixed label written on every row.
    Constant { value: String },
    /// The countsheet value under this header.
    Field { header: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnBinding {
    /// 0-based output column.
    pub column: u32,
    pub source: FieldSource,
}

impl ColumnBinding {
    fn field(column: u32, header: &str) -> Self {
        ColumnBinding { column, source: FieldSource::Field { header: header.to_string() } }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuarterOrder {
    /// Plain string order of the labels.
    #[default]
    Lexical,
    /// Fiscal year first, then quarter.
    Fiscal,
}

/// Countsheet header names the calculator and loader depend on.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceFields {
    pub quantities: [String; 3],
    pub rate: String,
    /// Headers that must exist in the countsheet header row.
    pub required_headers: Vec<String>,
}

impl Default for SourceFields {
    fn default() -> Self {
        let required = [
            "Original QTY",
            "Original Damage",
            "Original Expired",
            "Item Rate",
            "Distributor code",
            "Distributor Name",
            "Item/SKU Code",
            "Item Name",
            "Manu Date",
            "Expiry Date",
            "Remarks",
            "Field 1",
            "Field 2",
            "Field 3",
            "Field 4",
        ];
        Self {
            quantities: [
                "Original QTY".to_string(),
                "Original Damage".to_string(),
                "Original Expired".to_string(),
            ],
            rate: "Item Rate".to_string(),
            required_headers: required.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Layout of the "Artical level format" sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArticleLayout {
    pub sheet: String,
    /// Row whose styles and formulas are replicated; generated rows start here.
    pub exemplar_row: u32,
    pub column_count: u32,
    /// Column scanned for the boundary label.
    pub boundary_column: Column,
    /// Case-insensitive substring marking the boundary row.
    pub boundary_label: String,
    pub columns: Vec<ColumnBinding>,
    pub total_qty: Column,
    /// INR value columns, one per quantity field.
    pub inr: [Column; 3],
    pub total_value: Column,
    /// Inclusive column range summed into the subtotal row.
    pub subtotal_first: Column,
    pub subtotal_last: Column,
    pub anchor_code: Column,
    pub distributor_name: Column,
    pub anchor_name: Column,
    pub region: Column,
    pub manufacturing_date: Column,
    pub audit_serial: CellRef,
}

impl Default for ArticleLayout {
    fn default() -> Self {
        let audit_team = ColumnBinding {
            column: 2,
            source: FieldSource::Constant { value: "Rutul Shah Co & LLp".to_string() },
        };
        Self {
            sheet: "Artical level format".to_string(),
            exemplar_row: 5,
            column_count: 27,
            boundary_column: Column(5),
            boundary_label: "total".to_string(),
            columns: vec![
                ColumnBinding { column: 0, source: FieldSource::SerialNumber },
                audit_team,
                ColumnBinding::field(3, "Distributor code"),
                ColumnBinding::field(5, "Distributor Name"),
                ColumnBinding::field(6, "Item/SKU Code"),
                ColumnBinding::field(7, "Item Name"),
                ColumnBinding::field(8, "Field 2"),
                ColumnBinding::field(9, "Field 3"),
                ColumnBinding::field(10, "Item Rate"),
                ColumnBinding::field(11, "Field 1"),
                ColumnBinding::field(12, "Field 4"),
                ColumnBinding::field(13, "Original QTY"),
                ColumnBinding::field(14, "Original Damage"),
                ColumnBinding::field(15, "Original Expired"),
                ColumnBinding::field(21, "Manu Date"),
                ColumnBinding::field(22, "Expiry Date"),
                ColumnBinding::field(25, "Remarks"),
            ],
            total_qty: Column(17),
            inr: [Column(18), Column(19), Column(20)],
            total_value: Column(21),
            subtotal_first: Column(14),
            subtotal_last: Column(21),
            anchor_code: Column(4),
            distributor_name: Column(6),
            anchor_name: Column(5),
            region: Column(2),
            manufacturing_date: Column(22),
            audit_serial: CellRef::new(2, 2),
        }
    }
}

/// One boundary-row total copied onto the sign-off sheet.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TotalCopy {
    pub from: Column,
    pub to: CellRef,
}

/// Layout of the "Sign Format." sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignLayout {
    pub sheet: String,
    pub serial: CellRef,
    pub anchor_code: CellRef,
    pub anchor_name: CellRef,
    pub distributor_city: CellRef,
    pub report_date: CellRef,
    pub totals: Vec<TotalCopy>,
    pub reported_value: CellRef,
    pub date_notes: Vec<CellRef>,
    /// First label cell of the quarter block; sums go in the row below.
    pub quarter_start: CellRef,
    pub quarter_slots: u32,
    pub quarter_order: QuarterOrder,
}

impl Default for SignLayout {
    fn default() -> Self {
        let copy = |from: u32, col: u32| TotalCopy { from: Column(from), to: CellRef::new(col, 12) };
        Self {
            sheet: "Sign Format.".to_string(),
            serial: CellRef::new(3, 4),
            anchor_code: CellRef::new(3, 6),
            anchor_name: CellRef::new(3, 7),
            distributor_city: CellRef::new(3, 8),
            report_date: CellRef::new(3, 9),
            totals: vec![copy(14, 2), copy(15, 3), copy(16, 4), copy(18, 6), copy(19, 7), copy(20, 8)],
            reported_value: CellRef::new(10, 12),
            date_notes: vec![CellRef::new(2, 20), CellRef::new(2, 22)],
            quarter_start: CellRef::new(3, 16),
            quarter_slots: 7,
            quarter_order: QuarterOrder::Lexical,
        }
    }
}

/// Master-file header names. Key headers are matched by case-insensitive substring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MasterFields {
    pub anchor_code_keys: Vec<String>,
    pub distributor_keys: Vec<String>,
    /// Matched exactly after trimming and lower-casing.
    pub audit_serial: String,
    pub anchor_name: String,
    pub region: String,
    pub code_display: String,
    pub db_name: String,
    pub city: String,
    pub reported_value: String,
}

impl Default for MasterFields {
    fn default() -> Self {
        Self {
            anchor_code_keys: vec!["anchor code".to_string()],
            distributor_keys: vec!["db name".to_string(), "distributor name".to_string()],
            audit_serial: "audit std serial no".to_string(),
            anchor_name: "Anchor Name".to_string(),
            region: "Region".to_string(),
            code_display: "Anchor Code/ DB Code".to_string(),
            db_name: "DB Name".to_string(),
            city: "Distributor City".to_string(),
            reported_value: "Reported Value".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportSchema {
    pub source: SourceFields,
    pub article: ArticleLayout,
    pub sign: SignLayout,
    pub master: MasterFields,
}

pub fn load_schema(path: &Path) -> Result<ReportSchema> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read schema: {}", path.display()))?;
    let schema: ReportSchema = serde_json::from_str(&text).context("schema JSON is invalid")?;
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "article": { "exemplar_row": 6, "boundary_column": "F" },
            "sign": { "quarter_start": "D20", "quarter_order": "fiscal" }
        }"#;
        let schema: ReportSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.article.exemplar_row, 6);
        assert_eq!(schema.article.boundary_column, Column(6));
        assert_eq!(schema.article.column_count, 27);
        assert_eq!(schema.sign.quarter_start, CellRef::new(4, 20));
        assert_eq!(schema.sign.quarter_order, QuarterOrder::Fiscal);
        assert_eq!(schema.source.rate, "Item Rate");
    }

    #[test]
    fn column_bindings_deserialize() {
        let json = r#"{ "article": { "columns": [
            { "column": 0, "source": { "kind": "serial_number" } },
            { "column": 2, "source": { "kind": "constant", "value": "Team A" } },
            { "column": 3, "source": { "kind": "field", "header": "Distributor code" } }
        ] } }"#;
        let schema: ReportSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.article.columns.len(), 3);
        assert_eq!(schema.article.columns[1].source, FieldSource::Constant { value: "Team A".into() });
    }

    #[test]
    fn bad_address_is_rejected() {
        let json = r#"{ "sign": { "serial": "4C" } }"#;
        assert!(serde_json::from_str::<ReportSchema>(json).is_err());
    }
}
