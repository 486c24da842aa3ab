//! Upload parsing: CSV and XLSX bytes into a [`RawTable`].
//!
//! The format is chosen by file extension. The first row of the file is the
//! header row. Cells are returned as raw strings; typing happens later in
//! the profiler.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use analyst_copilot_core::RawTable;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 64 * 1024 * 1024;
/// Maximum cells read from a worksheet.
const XLSX_MAX_CELLS: usize = 2_000_000;
/// Excel's own column limit (XFD).
const XLSX_MAX_COLUMNS: usize = 16_384;

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const STYLES: &str = "xl/styles.xml";
const WORKSHEET_PREFIX: &str = "xl/worksheets/sheet";

/// Upload parsing error. Every variant renders as a message fit for the user.
#[derive(Debug)]
pub enum TableError {
    UnsupportedFileFormat(String),
    Csv(String),
    Xlsx(String),
    TooLarge { size: usize, max: usize },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::UnsupportedFileFormat(name) => write!(
                f,
                "Unsupported file type '{}'. Please upload CSV or Excel (.xlsx) files.",
                name
            ),
            TableError::Csv(e) => write!(f, "Unable to read the uploaded CSV file: {}", e),
            TableError::Xlsx(e) => write!(f, "Unable to read the uploaded Excel file: {}", e),
            TableError::TooLarge { size, max } => write!(
                f,
                "Uploaded file is too large ({} bytes, limit is {} bytes)",
                size, max
            ),
        }
    }
}

impl std::error::Error for TableError {}

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    pub fn from_filename(filename: &str) -> Result<Self, TableError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(TableFormat::Csv),
            Some("xlsx") => Ok(TableFormat::Xlsx),
            _ => Err(TableError::UnsupportedFileFormat(filename.to_string())),
        }
    }
}

/// Reduce a client-supplied file name to a safe base name.
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`; other characters become
/// `_`. Returns `None` when nothing usable is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.trim_matches('_').is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Parse an uploaded file into a raw table.
pub fn parse_table(bytes: &[u8], filename: &str) -> Result<RawTable, TableError> {
    let table = match TableFormat::from_filename(filename)? {
        TableFormat::Csv => parse_csv(bytes)?,
        TableFormat::Xlsx => parse_xlsx(bytes)?,
    };
    tracing::debug!(
        filename,
        columns = table.headers.len(),
        rows = table.rows.len(),
        "parsed upload"
    );
    Ok(table)
}

/// Like [`parse_table`], rejecting inputs over `max_bytes` first.
pub fn parse_table_bounded(bytes: &[u8], filename: &str, max_bytes: usize) -> Result<RawTable, TableError> {
    if bytes.len() > max_bytes {
        return Err(TableError::TooLarge {
            size: bytes.len(),
            max: max_bytes,
        });
    }
    parse_table(bytes, filename)
}

/// Read a table from disk, choosing the format from the path's extension.
pub fn read_table_file(path: &Path) -> anyhow::Result<RawTable> {
    use anyhow::Context;

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_table(&bytes, &name).with_context(|| format!("Failed to parse {}", path.display()))
}

// ============ Headers ============

/// Fill blank header cells and make duplicates unique (`name`, `name.1`, ...).
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = match h.trim() {
                "" => format!("column_{}", i + 1),
                name => name.to_string(),
            };
            let n = seen.entry(base.clone()).or_insert(0);
            let name = if *n == 0 {
                base
            } else {
                format!("{}.{}", base, n)
            };
            *n += 1;
            name
        })
        .collect()
}

// ============ CSV ============

fn parse_csv(bytes: &[u8]) -> Result<RawTable, TableError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TableError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(TableError::Csv("the file has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| TableError::Csv(e.to_string()))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(RawTable::new(normalize_headers(headers), rows))
}

// ============ XLSX ============

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn read_zip_entry_bounded(archive: &mut Archive<'_>, name: &str, max_bytes: u64) -> Result<Vec<u8>, TableError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| TableError::Xlsx(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| TableError::Xlsx(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(TableError::Xlsx(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn parse_xlsx(bytes: &[u8]) -> Result<RawTable, TableError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| TableError::Xlsx(e.to_string()))?;

    let shared_strings = if archive.file_names().any(|n| n == SHARED_STRINGS) {
        let xml = read_zip_entry_bounded(&mut archive, SHARED_STRINGS, MAX_XML_ENTRY_BYTES)?;
        read_shared_strings(&xml)?
    } else {
        Vec::new()
    };

    let date_styles = if archive.file_names().any(|n| n == STYLES) {
        let xml = read_zip_entry_bounded(&mut archive, STYLES, MAX_XML_ENTRY_BYTES)?;
        read_date_styles(&xml)?
    } else {
        Vec::new()
    };

    let sheet = first_worksheet_name(&archive)
        .ok_or_else(|| TableError::Xlsx("workbook has no worksheets".to_string()))?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, &sheet, MAX_XML_ENTRY_BYTES)?;
    let grid = read_sheet_cells(&sheet_xml, &shared_strings, &date_styles)?;

    // Trailing columns that are empty in every row are dropped.
    let width = grid
        .values()
        .filter_map(|cells| {
            cells
                .iter()
                .rev()
                .find(|(_, value)| !value.is_empty())
                .map(|(col, _)| *col)
        })
        .max()
        .map_or(0, |max_col| max_col + 1);
    if width.saturating_mul(grid.len()) > XLSX_MAX_CELLS {
        return Err(TableError::Xlsx(format!(
            "worksheet spans {} rows by {} columns, more than {} cells",
            grid.len(),
            width,
            XLSX_MAX_CELLS
        )));
    }

    let mut rows = grid.into_values().map(|cells| {
        let mut row = vec![String::new(); width];
        for (col, value) in cells.into_iter().filter(|(col, _)| *col < width) {
            row[col] = value;
        }
        row
    });

    let headers = rows
        .next()
        .filter(|h| h.iter().any(|c| !c.trim().is_empty()))
        .ok_or_else(|| TableError::Xlsx("the first worksheet has no header row".to_string()))?;

    Ok(RawTable::new(normalize_headers(headers), rows.collect()))
}

fn first_worksheet_name(archive: &Archive<'_>) -> Option<String> {
    archive
        .file_names()
        .filter(|n| n.starts_with(WORKSHEET_PREFIX) && n.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches(WORKSHEET_PREFIX)
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(|s| s.to_string())
}

fn attribute(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Each `<si>` may hold one `<t>` or several rich-text runs; runs are concatenated.
fn read_shared_strings(xml: &[u8]) -> Result<Vec<String>, TableError> {
    use quick_xml::events::Event;

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = current.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.extend(current.take()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(TableError::Xlsx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Built-in number formats that show a calendar date (with or without a time).
const BUILTIN_DATE_FORMATS: &[u32] = &[14, 15, 16, 17, 22];

/// Whether a custom number format code displays a date.
///
/// Quoted literals, `[...]` sections and escaped characters are ignored;
/// what is left must contain a year or day token. Time-only formats
/// (`h:mm`, `mm:ss`) do not count.
fn is_date_format_code(code: &str) -> bool {
    let mut chars = code.chars();
    let mut in_quotes = false;
    let mut in_brackets = false;
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            _ if in_brackets => {}
            '\\' | '_' | '*' => {
                chars.next();
            }
            'y' | 'Y' | 'd' | 'D' => return true,
            _ => {}
        }
    }
    false
}

/// Read `xl/styles.xml` and return, per `cellXfs` index, whether the style
/// formats numbers as dates.
fn read_date_styles(xml: &[u8]) -> Result<Vec<bool>, TableError> {
    use quick_xml::events::Event;

    let mut custom_dates: BTreeMap<u32, bool> = BTreeMap::new();
    let mut styles = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"numFmt" => {
                    let id = attribute(&e, b"numFmtId").and_then(|id| id.parse::<u32>().ok());
                    let code = attribute(&e, b"formatCode").unwrap_or_default();
                    if let Some(id) = id {
                        custom_dates.insert(id, is_date_format_code(&code));
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let id = attribute(&e, b"numFmtId")
                        .and_then(|id| id.parse::<u32>().ok())
                        .unwrap_or(0);
                    let is_date = custom_dates
                        .get(&id)
                        .copied()
                        .unwrap_or_else(|| BUILTIN_DATE_FORMATS.contains(&id));
                    styles.push(is_date);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(TableError::Xlsx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(styles)
}

/// Convert an Excel serial date (1900 system) to ISO text.
///
/// Whole serials become `%Y-%m-%d`; serials with a time part become
/// `%Y-%m-%d %H:%M:%S`. Returns `None` outside years 1900 to 9999.
fn serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    let at = epoch.checked_add_signed(chrono::TimeDelta::try_seconds(seconds)?)?;
    if seconds % 86_400 == 0 {
        Some(at.format("%Y-%m-%d").to_string())
    } else {
        Some(at.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

/// Split an A1-style reference into zero-based (row, column).
fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
        if col > XLSX_MAX_COLUMNS {
            return None;
        }
    }
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

/// Cell being read inside a `<c>` element.
struct PendingCell {
    row: usize,
    col: usize,
    kind: Option<String>,
    style: Option<usize>,
    value: String,
}

impl PendingCell {
    fn resolve(self, shared_strings: &[String], date_styles: &[bool]) -> String {
        match self.kind.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i).cloned())
                .unwrap_or_default(),
            Some("b") => match self.value.trim() {
                "1" => "TRUE".to_string(),
                "0" => "FALSE".to_string(),
                other => other.to_string(),
            },
            None | Some("n") => {
                let is_date = self
                    .style
                    .and_then(|s| date_styles.get(s))
                    .copied()
                    .unwrap_or(false);
                if !is_date {
                    return self.value;
                }
                self.value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(serial_to_iso)
                    .unwrap_or(self.value)
            }
            _ => self.value,
        }
    }
}

fn open_cell(e: &quick_xml::events::BytesStart<'_>, row: &mut Option<usize>, next_col: &mut usize) -> PendingCell {
    let (r, c) = attribute(e, b"r")
        .and_then(|r| parse_cell_ref(&r))
        .unwrap_or((row.unwrap_or(0), *next_col));
    *row = Some(r);
    *next_col = c + 1;
    PendingCell {
        row: r,
        col: c,
        kind: attribute(e, b"t"),
        style: attribute(e, b"s").and_then(|s| s.parse().ok()),
        value: String::new(),
    }
}

/// Read every cell of a worksheet into row -> column -> value.
///
/// Rows without any `<c>` element are absent from the result. Cells
/// without an `r` reference take the next column of the current row.
/// Empty `<c/>` elements count toward the cell limit.
fn read_sheet_cells(
    xml: &[u8],
    shared_strings: &[String],
    date_styles: &[bool],
) -> Result<BTreeMap<usize, BTreeMap<usize, String>>, TableError> {
    use quick_xml::events::Event;

    let mut grid: BTreeMap<usize, BTreeMap<usize, String>> = BTreeMap::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut row: Option<usize> = None;
    let mut next_col = 0usize;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut cell_count = 0usize;

    loop {
        if cell_count >= XLSX_MAX_CELLS {
            return Err(TableError::Xlsx(format!(
                "worksheet has more than {} cells",
                XLSX_MAX_CELLS
            )));
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(
                        attribute(&e, b"r")
                            .and_then(|r| r.parse::<usize>().ok())
                            .and_then(|r| r.checked_sub(1))
                            .unwrap_or_else(|| row.map_or(0, |r| r + 1)),
                    );
                    next_col = 0;
                }
                b"c" => cell = Some(open_cell(&e, &mut row, &mut next_col)),
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"c" => {
                let pending = open_cell(&e, &mut row, &mut next_col);
                grid.entry(pending.row).or_default();
                cell_count += 1;
            }
            Ok(Event::Text(te)) if in_value => {
                if let Some(pending) = cell.as_mut() {
                    pending.value.push_str(&te.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        let (r, c) = (pending.row, pending.col);
                        let value = pending.resolve(shared_strings, date_styles);
                        grid.entry(r).or_default().insert(c, value);
                        cell_count += 1;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(TableError::Xlsx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(grid)
}
