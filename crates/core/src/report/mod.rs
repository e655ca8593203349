//! The two line-oriented exchange formats of a survey.
//!
//! The scan report (`{name} {guid} {type} {hash}` per line) is the contract
//! between a scan and everything downstream; the handler report is the final
//! human-readable product of correlation. Both formats are owned entirely by
//! this module so no other code ever assembles or splits the lines itself.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::{MatchedModule, ModuleHandlers};

pub mod correlate;

pub use correlate::{collect_handler_names, CorrelateError, Correlator, MissingPolicy};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to access report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed scan report line {line}: '{text}'")]
    Malformed { line: usize, text: String },
}

/// One scan-report line as read back for correlation.
///
/// Fields are the raw space-split strings, never re-parsed into stronger
/// types: correlation derives file names from these exact bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub name: String,
    pub guid: String,
    pub type_label: Option<String>,
}

/// Render one scan-report line (no trailing newline).
///
/// Fields are positional and space-separated. A name containing a space will
/// shift later fields on read-back; that is the documented legacy behavior,
/// not something this layer repairs.
pub fn format_scan_line(record: &MatchedModule) -> String {
    format!(
        "{} {} {} {}",
        record.name, record.guid, record.type_label, record.hash
    )
}

/// Split the leading fields of one scan-report line.
///
/// Lines with fewer than two fields are malformed; the type label is kept
/// when present and any further fields (hash included) are ignored here.
pub fn parse_scan_line(line: &str, line_no: usize) -> Result<ScanEntry, ReportError> {
    let mut fields = line.split(' ');
    match (fields.next(), fields.next()) {
        (Some(name), Some(guid)) => Ok(ScanEntry {
            name: name.to_string(),
            guid: guid.to_string(),
            type_label: fields.next().map(str::to_string),
        }),
        _ => Err(ReportError::Malformed {
            line: line_no,
            text: line.to_string(),
        }),
    }
}

pub fn write_scan_report(path: &Path, records: &[MatchedModule]) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{}", format_scan_line(record)).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}

pub fn read_scan_report(path: &Path) -> Result<Vec<ScanEntry>, ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        entries.push(parse_scan_line(&line, idx + 1)?);
    }
    Ok(entries)
}

/// Render one handler-report block: a `{name}  {guid}` header (two spaces),
/// then one handler name per line. Blocks follow each other without blank
/// separators.
pub fn format_handler_block(entry: &ModuleHandlers) -> String {
    let mut block = format!("{}  {}\n", entry.name, entry.guid);
    for handler in &entry.handlers {
        block.push_str(handler);
        block.push('\n');
    }
    block
}

pub fn write_handler_report(path: &Path, entries: &[ModuleHandlers]) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    for entry in entries {
        writer
            .write_all(format_handler_block(entry).as_bytes())
            .map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}
