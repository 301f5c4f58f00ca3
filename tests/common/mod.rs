//! Fixture workbooks shaped like the real countsheet, master and template files.

#![allow(dead_code)]

use rust_xlsxwriter::{ExcelDateTime, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

pub const COUNT_HEADERS: [&str; 15] = [
    "Distributor code",
    "Distributor Name",
    "Item/SKU Code",
    "Item Name",
    "Field 1",
    "Field 2",
    "Field 3",
    "Field 4",
    "Item Rate",
    "Original QTY",
    "Original Damage",
    "Original Expired",
    "Manu Date",
    "Expiry Date",
    "Remarks",
];

/// Writes a quantity cell: `'` marks text, empty leaves the cell blank.
fn put_quantity(ws: &mut Worksheet, row: u32, col: u16, q: &str) -> Result<(), XlsxError> {
    if let Some(text) = q.strip_prefix('\'') {
        ws.write_string(row, col, text)?;
    } else if let Ok(n) = q.parse::<f64>() {
        ws.write_number(row, col, n)?;
    }
    Ok(())
}

/// Five rows: three valid, two with only zero quantities.
pub fn write_countsheet(path: &Path) -> Result<(), XlsxError> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    for (c, h) in COUNT_HEADERS.iter().enumerate() {
        ws.write_string(0, c as u16, *h)?;
    }

    let date_fmt = Format::new().set_num_format("yyyy-mm-dd");
    // sku, item, rate, qty, damage, expired, manufactured
    let rows = [
        ("SKU-1", "Soap 100g", 10.0, "2", "0", "1", "15/05/2024"),
        ("SKU-2", "Shampoo", 10.0, "0", "0", "0", "01/01/2024"),
        ("SKU-3", "Paste", 4.0, "0", "'5", "", "10/02/2024"),
        ("SKU-4", "Oil", 9.0, "'0", "0", "'0.0", "01/01/2024"),
        ("SKU-5", "Cream", 2.5, "1", "1", "1", "20/06/2024"),
    ];
    for (i, (sku, item, rate, qty, damage, expired, manu)) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        ws.write_number(r, 0, 123.0)?;
        ws.write_string(r, 1, "Acme Traders")?;
        ws.write_string(r, 2, *sku)?;
        ws.write_string(r, 3, *item)?;
        ws.write_number(r, 4, 18.0)?;
        ws.write_string(r, 5, "NPI")?;
        ws.write_number(r, 6, rate / 1.18)?;
        ws.write_number(r, 7, 12.0)?;
        ws.write_number(r, 8, *rate)?;
        put_quantity(ws, r, 9, qty)?;
        put_quantity(ws, r, 10, damage)?;
        put_quantity(ws, r, 11, expired)?;
        ws.write_string(r, 12, *manu)?;
        let expiry = ExcelDateTime::from_ymd(2024, 6, 20)?;
        ws.write_datetime_with_format(r, 13, &expiry, &date_fmt)?;
        if i == 0 {
            ws.write_string(r, 14, "torn pack")?;
        }
    }
    wb.save(path)
}

/// One valid row per date: a unit quantity at rate 10 and a native "Manu Date" cell.
pub fn write_dated_countsheet(path: &Path, dates: &[(i32, u8, u8)]) -> Result<(), XlsxError> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    for (c, h) in COUNT_HEADERS.iter().enumerate() {
        ws.write_string(0, c as u16, *h)?;
    }
    let date_fmt = Format::new().set_num_format("dd/mm/yyyy");
    for (i, &(y, m, d)) in dates.iter().enumerate() {
        let r = i as u32 + 1;
        ws.write_number(r, 0, 123.0)?;
        ws.write_string(r, 1, "Acme Traders")?;
        ws.write_string(r, 2, format!("SKU-{r}"))?;
        ws.write_number(r, 8, 10.0)?;
        ws.write_number(r, 9, 1.0)?;
        let manu = ExcelDateTime::from_ymd(y as u16, m, d)?;
        ws.write_datetime_with_format(r, 12, &manu, &date_fmt)?;
    }
    wb.save(path)
}

/// Template with a formatted exemplar row 5, two placeholder rows and a Total row at 8.
pub fn write_template(path: &Path, with_total: bool, with_sign_sheet: bool) -> Result<(), XlsxError> {
    let mut wb = Workbook::new();
    {
        let ws = wb.add_worksheet();
        ws.set_name("Artical level format")?;
        ws.write_string(0, 0, "Post Drainage Audit Report")?;
        ws.write_string(1, 0, "Audit Std Serial No")?;
        ws.write_string(3, 0, "Sr No")?;
        ws.write_string(3, 4, "Anchor Name")?;

        let boxed = Format::new().set_border(FormatBorder::Thin);
        let money = Format::new().set_num_format("#,##0.000").set_border(FormatBorder::Thin);
        let dated = Format::new().set_num_format("dd/mm/yyyy");
        for c in 0..27u16 {
            ws.write_blank(4, c, &boxed)?;
        }
        for c in 17..21u16 {
            ws.write_blank(4, c, &money)?;
        }
        ws.write_blank(4, 21, &dated)?;
        ws.write_formula_with_format(4, 16, "=N5+O5+P5", &boxed)?;
        ws.write_formula_with_format(4, 23, "=U5*0.18", &money)?;
        ws.write_formula(4, 24, "=W5-V5")?;
        ws.write_formula(4, 26, "=IF(U5>0,\"Y\",\"N\")")?;

        ws.write_string(5, 0, "placeholder")?;
        ws.write_number(5, 13, 99.0)?;
        ws.write_string(6, 0, "placeholder")?;
        ws.write_formula(6, 23, "=U7*0.18")?;

        if with_total {
            ws.write_string(7, 4, "Total")?;
            ws.write_formula(7, 13, "=SUM(N5:N7)")?;
        }
        ws.write_string(9, 0, "Notes: values include GST")?;
    }
    if with_sign_sheet {
        let ws = wb.add_worksheet();
        ws.set_name("Sign Format.")?;
        ws.write_string(3, 1, "Audit Serial No")?;
        ws.write_string(15, 1, "Quarter")?;
        ws.write_string(15, 4, "stale")?;
        ws.write_number(16, 4, 5.0)?;
        ws.write_string(19, 1, "Stock verified till date upto  ( ) at the distributor point")?;
        ws.write_string(21, 1, "Report signed on ()")?;
    }
    wb.save(path)
}

/// Master table; the second record matches the countsheet and a later duplicate has another region.
/// Without `with_anchor_code` no header contains "anchor code".
pub fn write_master(path: &Path, with_anchor_code: bool) -> Result<(), XlsxError> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    let (code_header, display_header) =
        if with_anchor_code { ("Anchor Code", "Anchor Code/ DB Code") } else { ("Code", "DB Code") };
    let headers = [
        "Sr",
        "Region",
        code_header,
        "Anchor Name",
        "DB Name",
        "Distributor City",
        "Audit Std Serial No",
        display_header,
        "Reported Value",
    ];
    for (c, h) in headers.iter().enumerate() {
        ws.write_string(0, c as u16, *h)?;
    }

    let rows = [
        ("East", "5", "Other Anchor", "Other Traders", "Kolkata", "AS-001", 10.0),
        ("North", "123.0", "Acme Anchor", "ACME TRADERS", "Pune", "AS-042", 1000.0),
        ("South", "123", "Acme Anchor", "Acme Traders", "Chennai", "AS-077", 2000.0),
    ];
    for (i, (region, code, anchor, db, city, serial, reported)) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        ws.write_number(r, 0, r as f64)?;
        ws.write_string(r, 1, *region)?;
        ws.write_string(r, 2, *code)?;
        ws.write_string(r, 3, *anchor)?;
        ws.write_string(r, 4, *db)?;
        ws.write_string(r, 5, *city)?;
        ws.write_string(r, 6, *serial)?;
        ws.write_string(r, 7, *code)?;
        ws.write_number(r, 8, *reported)?;
    }
    wb.save(path)
}
