//! Spreadsheet loading for the sales dashboard.
//!
//! Reads Excel workbooks or delimited text exported from a spreadsheet,
//! checks that the required columns exist and turns each row into a
//! [`Record`] with derived year and month. Bad cells never abort a load; only
//! a missing column does.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use sales_core::data_processors::{AmountParser, DateCoercer};
use sales_core::models::{Dataset, Record};
use sales_core::{Result, SalesError};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Columns every spreadsheet must carry, in reporting order.
pub const REQUIRED_COLUMNS: [&str; 4] = ["Date", "Product", "Sales", "Quantity"];

// ── Public types ──────────────────────────────────────────────────────────────

/// Row-level bookkeeping from one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Data rows seen after the header.
    pub rows_read: usize,
    /// Rows turned into records.
    pub rows_loaded: usize,
    /// Malformed or entirely blank rows that were dropped.
    pub rows_skipped: usize,
    /// Loaded rows whose date could not be parsed.
    pub unparsed_dates: usize,
    /// Sales or quantity cells that were blank or non-numeric (counted as 0).
    pub unparsed_amounts: usize,
}

/// A freshly loaded dataset plus what happened while loading it.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub dataset: Dataset,
    pub stats: LoadStats,
}

/// How a file is read, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Delimited(u8),
    Workbook,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the spreadsheet at `path`.
///
/// `.xlsx`, `.xlsm`, `.xlsb`, `.xls` and `.ods` workbooks are read from their
/// first sheet. `.csv` files are comma separated, `.tsv` / `.tab` files tab
/// separated. Any other extension is rejected before the file is opened.
pub fn load_dataset(path: &Path) -> Result<LoadOutcome> {
    let format = source_format(path)?;

    let file = File::open(path).map_err(|source| SalesError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let outcome = match format {
        SourceFormat::Delimited(delimiter) => load_from_reader(file, delimiter)?,
        SourceFormat::Workbook => {
            drop(file);
            load_from_workbook(path)?
        }
    };

    info!(
        "Loaded {} of {} rows from {} ({} skipped, {} undated)",
        outcome.stats.rows_loaded,
        outcome.stats.rows_read,
        path.display(),
        outcome.stats.rows_skipped,
        outcome.stats.unparsed_dates,
    );

    Ok(outcome)
}

/// Parse delimited text from `reader` into a [`Dataset`].
///
/// Cells are decoded leniently: bytes that are not valid UTF-8 (a cp1252
/// export, say) become U+FFFD and the row is kept.
pub fn load_from_reader<R: Read>(reader: R, delimiter: u8) -> Result<LoadOutcome> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SalesError::EmptyInput);
    }

    let mut rows = RowCollector::new(ColumnMap::resolve(&headers)?);

    for (idx, result) in csv_reader.byte_records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        match result {
            Ok(record) => {
                let cells: Vec<Cow<'_, str>> =
                    record.iter().map(String::from_utf8_lossy).collect();
                rows.push(line, &cells);
            }
            Err(e) => rows.skip_malformed(line, &e),
        }
    }

    Ok(rows.finish())
}

/// Read the first sheet of the workbook at `path` into a [`Dataset`].
///
/// The first row of the sheet is the header row. Date cells stored as
/// spreadsheet dates or plain numbers go through the serial-day conversion.
pub fn load_from_workbook(path: &Path) -> Result<LoadOutcome> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(SalesError::EmptyInput),
    };

    let mut sheet_rows = range.rows();
    let Some(header_cells) = sheet_rows.next() else {
        return Err(SalesError::EmptyInput);
    };
    let headers: Vec<String> = header_cells.iter().map(cell_text).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SalesError::EmptyInput);
    }

    let mut rows = RowCollector::new(ColumnMap::resolve(&headers)?);
    for (idx, cells) in sheet_rows.enumerate() {
        let cells: Vec<String> = cells.iter().map(cell_text).collect();
        rows.push(idx + 2, &cells);
    }

    Ok(rows.finish())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Pick the reader from the file extension.
fn source_format(path: &Path) -> Result<SourceFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("csv") => Ok(SourceFormat::Delimited(b',')),
        Some("tsv") | Some("tab") => Ok(SourceFormat::Delimited(b'\t')),
        Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
            Ok(SourceFormat::Workbook)
        }
        _ => Err(SalesError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Text form of a workbook cell, as the row parser expects it.
///
/// Spreadsheet dates become their serial day number so they share the
/// serial-date path with plain numeric date cells.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        other => {
            debug!("Unreadable workbook cell: {:?}", other);
            String::new()
        }
    }
}

/// Accumulates records and stats while rows stream in.
struct RowCollector {
    columns: ColumnMap,
    records: Vec<Record>,
    stats: LoadStats,
}

impl RowCollector {
    fn new(columns: ColumnMap) -> Self {
        Self {
            columns,
            records: Vec::new(),
            stats: LoadStats::default(),
        }
    }

    fn push<S: AsRef<str>>(&mut self, line: usize, cells: &[S]) {
        self.stats.rows_read += 1;
        match self.columns.parse_row(cells, &mut self.stats) {
            Some(record) => self.records.push(record),
            None => {
                debug!("Skipping blank row at line {}", line);
                self.stats.rows_skipped += 1;
            }
        }
    }

    fn skip_malformed(&mut self, line: usize, err: &csv::Error) {
        warn!("Skipping malformed row at line {}: {}", line, err);
        self.stats.rows_read += 1;
        self.stats.rows_skipped += 1;
    }

    fn finish(mut self) -> LoadOutcome {
        self.stats.rows_loaded = self.records.len();

        debug!(
            "{} read, {} loaded, {} skipped, {} unparsed dates, {} unparsed amounts",
            self.stats.rows_read,
            self.stats.rows_loaded,
            self.stats.rows_skipped,
            self.stats.unparsed_dates,
            self.stats.unparsed_amounts,
        );

        LoadOutcome {
            dataset: Dataset::new(self.records),
            stats: self.stats,
        }
    }
}

/// Positions of the required columns within a row.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    date: usize,
    product: usize,
    sales: usize,
    quantity: usize,
}

impl ColumnMap {
    /// Locate every required column, or report all that are missing.
    fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            index
                .entry(normalize_header_name(name.as_ref()))
                .or_insert(idx);
        }

        let lookup = |name: &str| index.get(&name.to_ascii_lowercase()).copied();

        let positions: Vec<Option<usize>> = REQUIRED_COLUMNS.iter().map(|c| lookup(c)).collect();

        match *positions.as_slice() {
            [Some(date), Some(product), Some(sales), Some(quantity)] => Ok(Self {
                date,
                product,
                sales,
                quantity,
            }),
            _ => Err(SalesError::MissingColumns(
                REQUIRED_COLUMNS
                    .iter()
                    .zip(&positions)
                    .filter(|(_, pos)| pos.is_none())
                    .map(|(name, _)| name.to_string())
                    .collect(),
            )),
        }
    }

    /// Build a record from `row`; `None` when every required cell is blank.
    fn parse_row<S: AsRef<str>>(&self, row: &[S], stats: &mut LoadStats) -> Option<Record> {
        let cell = |idx: usize| row.get(idx).map(|c| c.as_ref().trim()).unwrap_or("");

        let (date_raw, product, sales_raw, quantity_raw) = (
            cell(self.date),
            cell(self.product),
            cell(self.sales),
            cell(self.quantity),
        );

        if date_raw.is_empty()
            && product.is_empty()
            && sales_raw.is_empty()
            && quantity_raw.is_empty()
        {
            return None;
        }

        let date = DateCoercer::parse(date_raw);
        if date.is_none() {
            stats.unparsed_dates += 1;
        }

        let mut amount = |raw: &str| {
            AmountParser::parse(raw).unwrap_or_else(|| {
                stats.unparsed_amounts += 1;
                0.0
            })
        };
        let sales = amount(sales_raw);
        let quantity = amount(quantity_raw);

        Some(Record::new(date, product, sales, quantity))
    }
}

/// Trim, strip a UTF-8 BOM and lowercase a header cell.
fn normalize_header_name(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .trim()
        .to_ascii_lowercase()
}
