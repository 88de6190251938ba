use calamine::{Data, Reader, Xlsx};
use std::fmt;
use std::io::Cursor;

use super::ImportError;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed textual form; blank cells give an empty string.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) => f.write_str(text),
            Cell::Int(value) => write!(f, "{value}"),
            Cell::Float(value) => write!(f, "{value}"),
            Cell::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(text) => text_cell(text),
            Data::Int(value) => Cell::Int(*value),
            Data::Float(value) => Cell::Float(*value),
            Data::Bool(value) => Cell::Bool(*value),
            Data::DateTime(value) => Cell::Float(value.as_f64()),
            Data::DateTimeIso(text) | Data::DurationIso(text) => text_cell(text),
            Data::Error(err) => Cell::Text(err.to_string()),
        }
    }
}

fn text_cell(text: &str) -> Cell {
    if text.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(text.to_string())
    }
}

/// Header row plus data rows of an uploaded spreadsheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Picks the reader from the file extension, falling back to sniffing
    /// the zip signature of `.xlsx` files.
    pub fn from_upload(filename: Option<&str>, bytes: Vec<u8>) -> Result<Self, ImportError> {
        let extension = filename
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("xlsx") => Self::from_xlsx(bytes),
            Some("csv") => Self::from_csv(&bytes),
            _ if bytes.starts_with(ZIP_MAGIC) => Self::from_xlsx(bytes),
            _ => Self::from_csv(&bytes),
        }
    }

    /// Reads the first worksheet of an `.xlsx` workbook.
    pub fn from_xlsx(bytes: Vec<u8>) -> Result<Self, ImportError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|err| ImportError::UnreadableFile(err.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::UnreadableFile("workbook has no worksheets".into()))?
            .map_err(|err| ImportError::UnreadableFile(err.to_string()))?;

        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|header| header.iter().map(|cell| Cell::from(cell).text()).collect())
            .unwrap_or_default();
        let rows = rows
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();
        Ok(Self { headers, rows })
    }

    pub fn from_csv(bytes: &[u8]) -> Result<Self, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|err| ImportError::UnreadableFile(err.to_string()))?
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| ImportError::UnreadableFile(err.to_string()))?;
            rows.push(record.iter().map(text_cell).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }
}
