//! Tabular sources for training data
//!
//! A source is a workbook of named sheets; each sheet is a header row followed
//! by data rows. The engine only consumes [`Sheet`]s through the
//! [`TableSource`] trait. The shipped implementation reads CSV exports:
//! a file is a single sheet, a directory is a workbook whose `*.csv` files are
//! its sheets.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Build a cell from raw CSV text; blank text becomes `Empty`
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Stringified value, `None` for empty cells
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(n.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::from_raw(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// A named sheet: first row is the header
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn header(&self) -> &[Cell] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// Anything that can produce sheets of rows
pub trait TableSource {
    /// Human-readable identifier for logging
    fn describe(&self) -> String;

    /// Read every sheet
    fn sheets(&self) -> Result<Vec<Sheet>>;
}

/// CSV file or directory of CSV files on disk
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet files of this source in scan order
    fn sheet_files(&self) -> Result<Vec<PathBuf>> {
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }
        if !self.path.is_dir() {
            return Err(Error::Source(format!(
                "Source not found: {}",
                self.path.display()
            )));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&self.path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_sheet_file(p))
            .collect();
        files.sort();
        Ok(files)
    }
}

impl TableSource for CsvSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn sheets(&self) -> Result<Vec<Sheet>> {
        let mut sheets = Vec::new();
        for file in self.sheet_files()? {
            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let delimiter = sniff_delimiter(&file)?;
            let rows = read_rows(File::open(&file)?, delimiter)?;
            debug!("Read sheet '{}' with {} rows", name, rows.len());
            sheets.push(Sheet::new(name, rows));
        }
        Ok(sheets)
    }
}

/// Sheets held in memory (tests, callers that already have rows)
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    sheets: Vec<Sheet>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, sheets: Vec<Sheet>) -> Self {
        Self {
            name: name.into(),
            sheets,
        }
    }
}

impl TableSource for MemorySource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn sheets(&self) -> Result<Vec<Sheet>> {
        Ok(self.sheets.clone())
    }
}

fn is_sheet_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("csv") | Some("tsv")
    )
}

/// Pick the delimiter from the header line
fn sniff_delimiter(path: &Path) -> Result<u8> {
    if path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tsv"))
    {
        return Ok(b'\t');
    }

    let mut first_line = Vec::new();
    BufReader::new(File::open(path)?).read_until(b'\n', &mut first_line)?;
    Ok(delimiter_for_header(&String::from_utf8_lossy(&first_line)))
}

/// Semicolon-separated exports are common for Dutch banks
pub fn delimiter_for_header(header: &str) -> u8 {
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Read all rows (header included) from CSV data.
///
/// Fields are decoded as UTF-8 with invalid bytes replaced, so a Latin-1
/// export only loses the offending characters, not the row.
pub fn read_rows<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Vec<Cell>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut lossy = 0usize;
    for result in rdr.byte_records() {
        let record = result?;
        let row = record
            .iter()
            .map(|field| match std::str::from_utf8(field) {
                Ok(text) => Cell::from_raw(text),
                Err(_) => {
                    lossy += 1;
                    Cell::from_raw(&String::from_utf8_lossy(field))
                }
            })
            .collect();
        rows.push(row);
    }
    if lossy > 0 {
        warn!("Replaced invalid UTF-8 in {} fields", lossy);
    }
    Ok(rows)
}

/// Modification time of a source.
///
/// For a directory this is the newest of the directory itself and its sheet
/// files, so adding, removing or editing a sheet all advance it.
pub fn modified(path: &Path) -> Result<SystemTime> {
    let meta = fs::metadata(path)?;
    let mut latest = meta.modified()?;
    if meta.is_dir() {
        for entry in fs::read_dir(path)? {
            let entry_path = entry?.path();
            if entry_path.is_file() && is_sheet_file(&entry_path) {
                let mtime = fs::metadata(&entry_path)?.modified()?;
                if mtime > latest {
                    latest = mtime;
                }
            }
        }
    }
    Ok(latest)
}
