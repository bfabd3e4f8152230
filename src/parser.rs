//! Tabular parser: uploaded files → ordered header-keyed rows.
//!
//! Handles delimited text (.csv/.tsv) via the csv crate and spreadsheet
//! workbooks (.xlsx/.xls/.xlsm/.ods) via calamine. Malformed individual
//! rows never abort a parse — they are captured as row errors and parsing
//! continues. Only whole-file structural failures (unreadable file, zero
//! sheets, missing header row) are hard errors.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, info, warn};

use crate::error::{PipelineError, RowError};
use crate::types::{CellValue, RawRow};

/// Default ceiling on data rows read from one upload.
pub const DEFAULT_MAX_ROWS: usize = 10_000;

/// Source format, detected from the file extension when `Auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Auto,
    /// .csv, .tsv, .txt
    Delimited,
    /// .xlsx, .xls, .xlsm, .ods
    Workbook,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub format: FormatHint,
    /// Reading stops once this many data rows have been taken.
    pub max_rows: usize,
    /// Field delimiter for delimited text. `None` picks by extension
    /// (tab for .tsv, comma otherwise).
    pub delimiter: Option<u8>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            format: FormatHint::Auto,
            max_rows: DEFAULT_MAX_ROWS,
            delimiter: None,
        }
    }
}

/// Everything one parse pass produces.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    /// Header texts in original column order, trimmed. Blank header cells
    /// get positional placeholder names.
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Data rows seen (valid + errored), excluding fully blank rows.
    pub total_rows: usize,
    pub errors: Vec<RowError>,
    pub warnings: Vec<String>,
}

/// Detect the source format from a file extension.
pub fn detect_format(path: &Path) -> FormatHint {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xlsx" | "xls" | "xlsm" | "ods" => FormatHint::Workbook,
        _ => FormatHint::Delimited,
    }
}

/// Parse an uploaded file into headers and rows.
///
/// The file is opened, read fully, and released before this returns,
/// whether or not parsing succeeds.
pub fn parse(path: &Path, options: &ParseOptions) -> Result<ParseOutput, PipelineError> {
    let format = match options.format {
        FormatHint::Auto => detect_format(path),
        explicit => explicit,
    };

    let output = match format {
        FormatHint::Workbook => parse_workbook(path, options)?,
        _ => {
            let file = File::open(path).map_err(|e| PipelineError::Unreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let delimiter = options.delimiter.unwrap_or_else(|| {
                match path.extension().and_then(|e| e.to_str()) {
                    Some("tsv") => b'\t',
                    _ => b',',
                }
            });
            parse_delimited_reader(file, delimiter, options.max_rows)?
        }
    };

    info!(
        "parsed {}: {} columns, {} rows, {} row errors",
        path.display(),
        output.headers.len(),
        output.total_rows,
        output.errors.len()
    );
    Ok(output)
}

/// Parse delimited text from any reader (in-memory uploads skip the temp
/// file and call this directly).
pub fn parse_delimited_reader<R: Read>(
    reader: R,
    delimiter: u8,
    max_rows: usize,
) -> Result<ParseOutput, PipelineError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = match csv_reader.byte_headers() {
        Ok(h) if !h.is_empty() => label_headers(
            h.iter()
                .map(|b| String::from_utf8_lossy(b).trim().to_string())
                .collect(),
        ),
        Ok(_) => return Err(PipelineError::EmptySource("no header row".into())),
        Err(e) => {
            return Err(PipelineError::EmptySource(format!(
                "could not read header row: {}",
                e
            )))
        }
    };
    let (headers, mut warnings) = headers;

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut total_rows = 0usize;
    let mut row_number = 0usize; // 1-based data row, assigned below
    let mut truncated = false;

    for result in csv_reader.byte_records() {
        row_number += 1;
        if total_rows >= max_rows {
            truncated = true;
            break;
        }

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                total_rows += 1;
                errors.push(RowError::new(row_number, format!("Unparseable row: {}", e)));
                continue;
            }
        };

        let values: Vec<String> = record
            .iter()
            .map(|b| String::from_utf8_lossy(b).to_string())
            .collect();

        // Blank lines are common at the tail of exported sheets; skip
        // without counting them. They still occupy their row number so
        // later error references stay stable.
        if values.iter().all(|v| v.trim().is_empty()) {
            debug!("skipping blank row {}", row_number);
            continue;
        }

        total_rows += 1;

        if values.len() > headers.len() {
            errors.push(RowError::new(
                row_number,
                format!(
                    "Row has {} values but the sheet has {} columns",
                    values.len(),
                    headers.len()
                ),
            ));
            continue;
        }

        // Short rows pad with empty cells.
        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let value = values.get(i).map(|s| s.trim()).unwrap_or("");
                let cell = if value.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(value.to_string())
                };
                (h.clone(), cell)
            })
            .collect();
        rows.push(RawRow::new(row_number, cells));
    }

    if truncated {
        warn!("row ceiling hit at {} rows, truncating", max_rows);
        warnings.push(format!(
            "Row limit reached: only the first {} data rows were processed",
            max_rows
        ));
    }

    Ok(ParseOutput {
        headers,
        rows,
        total_rows,
        errors,
        warnings,
    })
}

/// Parse the first populated sheet of a workbook.
fn parse_workbook(path: &Path, options: &ParseOptions) -> Result<ParseOutput, PipelineError> {
    use calamine::{open_workbook_auto, Reader};

    let mut workbook = open_workbook_auto(path).map_err(|e| PipelineError::Unreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(PipelineError::EmptySource("workbook has no sheets".into()));
    }

    let mut warnings = Vec::new();
    if sheet_names.len() > 1 {
        warnings.push(format!(
            "Workbook has {} sheets; only \"{}\" was imported",
            sheet_names.len(),
            sheet_names[0]
        ));
    }

    let range = workbook
        .worksheet_range(&sheet_names[0])
        .map_err(|e| PipelineError::Unreadable {
            path: path.display().to_string(),
            message: format!("sheet \"{}\": {}", sheet_names[0], e),
        })?;

    let mut sheet_rows = range.rows();
    let header_row = sheet_rows
        .next()
        .ok_or_else(|| PipelineError::EmptySource("first sheet has no header row".into()))?;
    let (headers, mut header_warnings) = label_headers(
        header_row
            .iter()
            .map(|c| cell_to_value(c).as_text())
            .collect(),
    );
    warnings.append(&mut header_warnings);

    let mut rows = Vec::new();
    let mut total_rows = 0usize;
    let mut row_number = 0usize;
    let mut truncated = false;

    for row in sheet_rows {
        row_number += 1;
        if total_rows >= options.max_rows {
            truncated = true;
            break;
        }

        let values: Vec<CellValue> = row.iter().map(cell_to_value).collect();
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        total_rows += 1;

        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), values.get(i).cloned().unwrap_or(CellValue::Empty)))
            .collect();
        rows.push(RawRow::new(row_number, cells));
    }

    if truncated {
        warn!("row ceiling hit at {} rows, truncating", options.max_rows);
        warnings.push(format!(
            "Row limit reached: only the first {} data rows were processed",
            options.max_rows
        ));
    }

    Ok(ParseOutput {
        headers,
        rows,
        total_rows,
        errors: Vec::new(),
        warnings,
    })
}

fn cell_to_value(cell: &calamine::Data) -> CellValue {
    use calamine::Data;
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.trim().to_string())
            }
        }
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Boolean(*b),
        // Formula errors carry no usable value
        Data::Error(_) => CellValue::Empty,
        Data::DateTime(dt) => CellValue::Text(format!("{}", dt)),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Replace blank header cells with positional names so every column stays
/// addressable in the pass-through bag.
fn label_headers(raw: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut warnings = Vec::new();
    let headers: Vec<String> = raw
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            if h.is_empty() {
                let placeholder = format!("column_{}", i + 1);
                warnings.push(format!(
                    "Column {} has no header; imported as \"{}\"",
                    i + 1,
                    placeholder
                ));
                placeholder
            } else {
                h
            }
        })
        .collect();
    (headers, warnings)
}
