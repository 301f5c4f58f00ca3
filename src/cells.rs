//! Scalar cell values, A1 addresses and the coercion rules shared by all stages.

use calamine::{Data, DataType};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// A single spreadsheet scalar as read from an input file.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn from_calamine(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
                Some(dt) => CellValue::Date(dt),
                None => cell.as_f64().map(CellValue::Number).unwrap_or_default(),
            },
        }
    }

    /// Builds a value from untyped text (CSV input). Numeric-looking text becomes a number.
    pub fn from_text(s: &str) -> Self {
        let t = s.trim();
        if t.is_empty() {
            return CellValue::Empty;
        }
        match parse_number(t) {
            Some(n) => CellValue::Number(n),
            None => CellValue::Text(t.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Quantity validity: blank, "0", "0.0" and numeric zero are invalid.
    /// Anything else that is present counts, including text that is not a number.
    pub fn is_valid_quantity(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Text(s) => !matches!(s.trim(), "" | "0" | "0.0"),
            CellValue::Number(n) => *n != 0.0,
            CellValue::Bool(b) => *b,
            CellValue::Date(_) => true,
        }
    }

    /// Numeric view with the silent zero fallback used for totals.
    pub fn to_f64_or_zero(&self) -> f64 {
        match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => parse_number(s).unwrap_or(0.0),
            CellValue::Bool(true) => 1.0,
            _ => 0.0,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(dt) => dt.format("%Y-%m-%d").to_string(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Parses an amount written as text. Accepts thousands separators, a leading
/// currency sign and accounting-style parentheses for negatives.
pub fn parse_number(s: &str) -> Option<f64> {
    let mut t = s.trim().replace(',', "");
    let has_paren = t.starts_with('(') && t.ends_with(')');
    if has_paren {
        t = t.trim_matches(|c: char| c == '(' || c == ')').to_string();
    }
    let t = t.trim_start_matches(['₹', '$']).trim();
    if t.is_empty() {
        return None;
    }
    let v = t.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if has_paren { -v } else { v })
}

/// Converts a date-time into an Excel serial number (1900 date system).
pub fn excel_serial(dt: NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    (dt - epoch).num_seconds() as f64 / 86_400.0
}

/// True when an Excel number format code renders dates.
pub fn is_date_format(code: &str) -> bool {
    let mut plain = String::with_capacity(code.len());
    let mut in_quote = false;
    let mut in_bracket = false;
    for ch in code.chars() {
        match ch {
            '"' => in_quote = !in_quote,
            '[' if !in_quote => in_bracket = true,
            ']' if !in_quote => in_bracket = false,
            _ if in_quote || in_bracket => {}
            c => plain.push(c.to_ascii_lowercase()),
        }
    }
    plain.contains('d') || plain.contains('y')
}

/// 1-based column index to letters: 1 → "A", 27 → "AA".
pub fn column_letters(mut col: u32) -> String {
    let mut out = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        out.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Letters to a 1-based column index: "A" → 1, "AA" → 27.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        c.is_ascii_alphabetic()
            .then(|| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
    })
}

/// A worksheet column, deserialized from its letters ("N").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct Column(pub u32);

impl TryFrom<String> for Column {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        column_index(s.trim()).map(Column).ok_or_else(|| format!("invalid column '{s}'"))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&column_letters(self.0))
    }
}

/// A single cell address, 1-based, deserialized from A1 notation ("C16").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct CellRef {
    pub col: u32,
    pub row: u32,
}

impl CellRef {
    pub const fn new(col: u32, row: u32) -> Self {
        CellRef { col, row }
    }

    /// (column, row) pair in the order the workbook writer addresses cells.
    pub fn coords(self) -> (u32, u32) {
        (self.col, self.row)
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        let col = column_index(letters)?;
        let row = digits.parse::<u32>().ok().filter(|r| *r > 0)?;
        Some(CellRef { col, row })
    }
}

impl TryFrom<String> for CellRef {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        CellRef::parse(&s).ok_or_else(|| format!("invalid cell address '{s}'"))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}
