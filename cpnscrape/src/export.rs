//! Tabular export of collected records.
//!
//! Column names follow the spreadsheets the NOC already works from:
//! `MTX-A` is the polled node and `MTX-B` the far-end site.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{ExportError, Result};
use crate::parse::{FlapEvent, LinkRecord};

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Number(u64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<Cell> for Value {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Text(text) => Value::String(text),
            Cell::Number(n) => Value::from(n),
        }
    }
}

/// A record that can be written as a table row.
pub trait Tabular {
    /// Column headers, in order.
    const COLUMNS: &'static [&'static str];

    /// Cells of this record, one per column.
    fn cells(&self) -> Vec<Cell>;
}

impl Tabular for FlapEvent {
    const COLUMNS: &'static [&'static str] = &[
        "MTX-A",
        "Interface",
        "Flapping Start",
        "Flapping End",
        "Number of Flaps",
        "Status",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.node.clone()),
            Cell::Text(self.interface.clone()),
            Cell::Text(self.first_seen.to_string()),
            Cell::Text(self.last_seen.to_string()),
            Cell::Number(u64::from(self.flaps())),
            Cell::Text(self.status.to_string()),
        ]
    }
}

impl Tabular for LinkRecord {
    const COLUMNS: &'static [&'static str] =
        &["MTX-A", "MTX-B", "interface", "rate", "LR Number", "status"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.node.clone()),
            Cell::Text(self.peer.clone()),
            Cell::Text(self.interface.clone()),
            Cell::Text(self.rate.to_string()),
            Cell::Number(self.circuit_id),
            Cell::Text(self.status.to_string()),
        ]
    }
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        extension.parse()
    }
}

impl FromStr for Format {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string()).into()),
        }
    }
}

/// Write records as CSV with a header row.
pub fn write_csv<T: Tabular, W: Write>(mut writer: W, records: &[T]) -> Result<()> {
    let header: Vec<String> = T::COLUMNS.iter().map(|c| csv_field(c)).collect();
    write_csv_line(&mut writer, &header)?;

    for record in records {
        let row: Vec<String> = record
            .cells()
            .iter()
            .map(|cell| csv_field(&cell.to_string()))
            .collect();
        write_csv_line(&mut writer, &row)?;
    }

    writer.flush().map_err(ExportError::Io)?;
    Ok(())
}

fn write_csv_line<W: Write>(writer: &mut W, fields: &[String]) -> Result<()> {
    writer
        .write_all(fields.join(",").as_bytes())
        .and_then(|_| writer.write_all(b"\r\n"))
        .map_err(ExportError::Io)?;
    Ok(())
}

/// Quote a field if it holds a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write records as a JSON array of objects keyed by column name.
pub fn write_json<T: Tabular, W: Write>(mut writer: W, records: &[T]) -> Result<()> {
    let rows: Vec<Value> = records
        .iter()
        .map(|record| {
            let object: Map<String, Value> = T::COLUMNS
                .iter()
                .map(|c| c.to_string())
                .zip(record.cells().into_iter().map(Value::from))
                .collect();
            Value::Object(object)
        })
        .collect();

    serde_json::to_writer_pretty(&mut writer, &rows).map_err(ExportError::Json)?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(ExportError::Io)?;
    Ok(())
}

/// Write records in `format`.
pub fn write_table<T: Tabular, W: Write>(format: Format, writer: W, records: &[T]) -> Result<()> {
    match format {
        Format::Csv => write_csv(writer, records),
        Format::Json => write_json(writer, records),
    }
}

/// Create (or truncate) `path` and write records to it.
pub fn export<T: Tabular>(path: &Path, format: Format, records: &[T]) -> Result<()> {
    let file = File::create(path).map_err(ExportError::Io)?;
    write_table(format, BufWriter::new(file), records)
}
