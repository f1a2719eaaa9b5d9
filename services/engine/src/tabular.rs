//! Tabular Parser - delimited text and workbooks into header-keyed records
//!
//! Responsibilities:
//! - Parse comma-delimited text with a header row into one record per data row
//! - Decode byte streams as UTF-8 so stream and text input agree
//! - Read the first sheet of a spreadsheet workbook
//! - Dispatch a file path to the right reader by extension
//!
//! Row-level anomalies never abort a parse. They are collected as
//! `ParseDiagnostic`s next to the records and logged as warnings.

use crate::error::{EngineError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// One data row, keyed by header name.
pub type Record = HashMap<String, String>;

/// Kind of non-fatal anomaly found while parsing a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    TooFewFields,
    TooManyFields,
    Malformed,
}

/// A non-fatal anomaly, located by 1-indexed source line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostic {
    pub line: u64,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

/// Parsed table: header row, data records in source order, diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParsedTable {
    fn report(&self, origin: &str) {
        debug!(
            origin,
            rows = self.records.len(),
            columns = self.headers.len(),
            "parsed table"
        );
        for diagnostic in &self.diagnostics {
            warn!(origin, line = diagnostic.line, kind = ?diagnostic.kind, "{}", diagnostic.message);
        }
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Parse comma-delimited text whose first row is the header.
///
/// Header cells are kept verbatim. Blank lines (no delimiter, nothing but
/// whitespace) are skipped; a row of empty fields such as `,,` is still a
/// record. A row with fewer fields than headers yields a record without the
/// trailing keys; extra fields beyond the header are dropped. Both produce a
/// diagnostic.
pub fn parse_text(content: &str) -> Result<ParsedTable> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    let mut diagnostics = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(row_idx as u64 + 2);
                diagnostics.push(ParseDiagnostic {
                    line,
                    kind: DiagnosticKind::Malformed,
                    message: format!("CSV parse error: {}", e),
                });
                continue;
            }
        };

        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }

        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(row_idx as u64 + 2);

        if record.len() < headers.len() {
            diagnostics.push(ParseDiagnostic {
                line,
                kind: DiagnosticKind::TooFewFields,
                message: format!(
                    "Expected {} fields, found {}",
                    headers.len(),
                    record.len()
                ),
            });
        } else if record.len() > headers.len() {
            diagnostics.push(ParseDiagnostic {
                line,
                kind: DiagnosticKind::TooManyFields,
                message: format!(
                    "Expected {} fields, found {} (extra fields dropped)",
                    headers.len(),
                    record.len()
                ),
            });
        }

        records.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect(),
        );
    }

    let table = ParsedTable {
        headers,
        records,
        diagnostics,
    };
    table.report("text");
    Ok(table)
}

/// Parse a byte stream holding CSV content.
///
/// Bytes are decoded as UTF-8 (BOM stripped, invalid sequences replaced),
/// then handed to `parse_text`.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<ParsedTable> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let (content, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
    if had_errors {
        warn!("input contained invalid UTF-8 sequences; replaced with U+FFFD");
    }
    parse_text(&content)
}

// =============================================================================
// WORKBOOKS
// =============================================================================

/// Render a workbook cell the way it would appear in a CSV export.
///
/// Date cells become ISO dates (`2024-01-05`), with the time appended only
/// when it is not midnight.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(datetime) if datetime.num_seconds_from_midnight() == 0 => {
                datetime.format("%Y-%m-%d").to_string()
            }
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse the first sheet of a workbook (xls, xlsx, xlsm, xlsb, ods).
///
/// The first row is the header, kept verbatim. Fully blank rows are skipped.
pub fn parse_workbook(path: &Path) -> Result<ParsedTable> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(EngineError::EmptyWorkbook)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => Vec::new(),
    };

    let records = rows
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|cells| headers.iter().cloned().zip(cells).collect::<Record>())
        .collect();

    let table = ParsedTable {
        headers,
        records,
        diagnostics: Vec::new(),
    };
    table.report(&sheet_name);
    Ok(table)
}

// =============================================================================
// FILE LOADER
// =============================================================================

const WORKBOOK_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "xlsb", "ods"];

/// Load a table from disk, choosing the reader from the file extension.
pub fn load_table(path: &Path) -> Result<ParsedTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => parse_reader(File::open(path)?),
        ext if WORKBOOK_EXTENSIONS.contains(&ext) => parse_workbook(path),
        _ => Err(EngineError::UnsupportedFormat(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};
    use std::io::Write;

    // -------------------------------------------------------------------------
    // BASIC PARSING
    // -------------------------------------------------------------------------

    #[test]
    fn test_header_keys_and_row_order() {
        let csv = "Customer_ID,City\nC1,תל אביב\nC2,חיפה\n";
        let table = parse_text(csv).unwrap();

        assert_eq!(table.headers, vec!["Customer_ID", "City"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["Customer_ID"], "C1");
        assert_eq!(table.records[0]["City"], "תל אביב");
        assert_eq!(table.records[1]["Customer_ID"], "C2");
        assert!(table.diagnostics.is_empty());
    }

    #[test]
    fn test_values_are_not_trimmed() {
        let csv = "Customer_ID,City\n  C1  ,חיפה\n";
        let table = parse_text(csv).unwrap();
        assert_eq!(table.records[0]["Customer_ID"], "  C1  ");
    }

    #[test]
    fn test_quoted_fields() {
        let csv = "Product_ID,Product_Name\nP1,\"Cable, 2m\"\n";
        let table = parse_text(csv).unwrap();
        assert_eq!(table.records[0]["Product_Name"], "Cable, 2m");
    }

    #[test]
    fn test_crlf_line_endings() {
        let csv = "Order_ID,Status\r\nO1,הושלם\r\nO2,בוטל\r\n";
        let table = parse_text(csv).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[1]["Status"], "בוטל");
    }

    #[test]
    fn test_header_cells_kept_verbatim() {
        let csv = " Order_ID,Status \nO1,הושלם\n";
        let table = parse_text(csv).unwrap();
        assert_eq!(table.headers, vec![" Order_ID", "Status "]);
        assert!(!table.records[0].contains_key("Order_ID"));
        assert_eq!(table.records[0]["Status "], "הושלם");
    }

    #[test]
    fn test_bom_is_stripped_from_header() {
        let csv = "\u{feff}Order_ID,Status\nO1,הושלם\n";
        let table = parse_text(csv).unwrap();
        assert_eq!(table.headers[0], "Order_ID");
        assert!(table.records[0].contains_key("Order_ID"));
    }

    // -------------------------------------------------------------------------
    // BLANK AND EMPTY INPUT
    // -------------------------------------------------------------------------

    #[test]
    fn test_blank_lines_skipped() {
        let csv = "Order_ID,Status\n\nO1,הושלם\n   \n\nO2,בוטל\n";
        let table = parse_text(csv).unwrap();
        assert_eq!(table.records.len(), 2);
        assert!(table.diagnostics.is_empty());
    }

    #[test]
    fn test_row_of_empty_fields_is_a_record() {
        let csv = "Order_ID,Status\n,\nO1,x\n";
        let table = parse_text(csv).unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["Order_ID"], "");
        assert_eq!(table.records[0]["Status"], "");
        assert_eq!(table.records[1]["Order_ID"], "O1");
        assert!(table.diagnostics.is_empty());
    }

    #[test]
    fn test_header_only() {
        let table = parse_text("Order_ID,Status\n").unwrap();
        assert_eq!(table.headers.len(), 2);
        assert!(table.records.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let table = parse_text("").unwrap();
        assert!(table.headers.is_empty());
        assert!(table.records.is_empty());
    }

    // -------------------------------------------------------------------------
    // MALFORMED ROWS
    // -------------------------------------------------------------------------

    #[test]
    fn test_short_row_is_kept_with_diagnostic() {
        let csv = "A,B,C\n1,2,3\n4,5\n";
        let table = parse_text(csv).unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[1].len(), 2);
        assert!(!table.records[1].contains_key("C"));
        assert_eq!(table.diagnostics.len(), 1);
        assert_eq!(table.diagnostics[0].kind, DiagnosticKind::TooFewFields);
        assert_eq!(table.diagnostics[0].line, 3);
    }

    #[test]
    fn test_long_row_drops_extra_fields() {
        let csv = "A,B\n1,2,3\n";
        let table = parse_text(csv).unwrap();

        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].len(), 2);
        assert_eq!(table.records[0]["B"], "2");
        assert_eq!(table.diagnostics[0].kind, DiagnosticKind::TooManyFields);
        assert_eq!(table.diagnostics[0].to_string(), "Line 2: Expected 2 fields, found 3 (extra fields dropped)");
    }

    // -------------------------------------------------------------------------
    // STREAM INPUT
    // -------------------------------------------------------------------------

    #[test]
    fn test_reader_matches_text() {
        let csv = "Order_ID,City\nO1,ירושלים\n\nO2,חיפה\n";
        let from_text = parse_text(csv).unwrap();
        let from_reader = parse_reader(csv.as_bytes()).unwrap();
        assert_eq!(from_text, from_reader);
    }

    #[test]
    fn test_reader_strips_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("Order_ID\nO1\n".as_bytes());
        let table = parse_reader(bytes.as_slice()).unwrap();
        assert_eq!(table.headers, vec!["Order_ID"]);
    }

    #[test]
    fn test_reader_replaces_invalid_utf8() {
        let bytes: &[u8] = b"Order_ID,City\nO1,\xFF\n";
        let table = parse_reader(bytes).unwrap();
        assert_eq!(table.records[0]["City"], "\u{FFFD}");
    }

    // -------------------------------------------------------------------------
    // WORKBOOK CELLS
    // -------------------------------------------------------------------------

    #[test]
    fn test_cell_text_rendering() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("P1".into())), "P1");
        assert_eq!(cell_text(&Data::Int(3)), "3");
        assert_eq!(cell_text(&Data::Float(100.0)), "100");
        assert_eq!(cell_text(&Data::Float(0.15)), "0.15");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
    }

    #[test]
    fn test_cell_text_dates() {
        let date = |value| Data::DateTime(ExcelDateTime::new(value, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_text(&date(45296.0)), "2024-01-05");
        assert_eq!(cell_text(&date(45296.5)), "2024-01-05 12:00:00");
        assert_eq!(cell_text(&Data::DateTimeIso("2024-01-05".into())), "2024-01-05");

        let duration = Data::DateTime(ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(cell_text(&duration), "1.5");
    }

    // -------------------------------------------------------------------------
    // FILE LOADER
    // -------------------------------------------------------------------------

    #[test]
    fn test_load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.CSV");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "Product_ID,Unit_Price").unwrap();
        writeln!(file, "P1,100").unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0]["Unit_Price"], "100");
    }

    #[test]
    fn test_load_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        File::create(&path).unwrap();

        let err = load_table(&path).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_table(Path::new("/nonexistent/orders.csv")).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }

    fn write_orders_workbook(path: &Path) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let date = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd");
        let worksheet = workbook.add_worksheet();

        worksheet.write_string(0, 0, "Order_ID").unwrap();
        worksheet.write_string(0, 1, "Quantity").unwrap();
        worksheet.write_string(0, 2, "Order_Date").unwrap();

        worksheet.write_string(1, 0, "O1").unwrap();
        worksheet.write_number(1, 1, 100.0).unwrap();
        worksheet.write_number_with_format(1, 2, 45296.0, &date).unwrap();

        // row 2 left empty
        worksheet.write_string(3, 0, "O2").unwrap();
        worksheet.write_number(3, 1, 2.5).unwrap();
        worksheet.write_number_with_format(3, 2, 45297.0, &date).unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn test_load_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.XLSX");
        write_orders_workbook(&path);

        let table = load_table(&path).unwrap();
        assert_eq!(table.headers, vec!["Order_ID", "Quantity", "Order_Date"]);
        assert_eq!(table.records.len(), 2);
        assert!(table.diagnostics.is_empty());

        assert_eq!(table.records[0]["Order_ID"], "O1");
        assert_eq!(table.records[0]["Quantity"], "100");
        assert_eq!(table.records[0]["Order_Date"], "2024-01-05");
        assert_eq!(table.records[1]["Order_ID"], "O2");
        assert_eq!(table.records[1]["Quantity"], "2.5");
        assert_eq!(table.records[1]["Order_Date"], "2024-01-06");
    }

    #[test]
    fn test_workbook_matches_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("orders.xlsx");
        write_orders_workbook(&xlsx);
        let csv = dir.path().join("orders.csv");
        std::fs::write(&csv, "Order_ID,Quantity,Order_Date\nO1,100,2024-01-05\nO2,2.5,2024-01-06\n").unwrap();

        assert_eq!(load_table(&xlsx).unwrap(), load_table(&csv).unwrap());
    }

    #[test]
    fn test_load_corrupt_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let err = load_table(&path).unwrap_err();
        assert!(matches!(err, EngineError::Workbook(_)));
    }
}
