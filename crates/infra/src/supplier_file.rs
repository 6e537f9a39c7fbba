//! Loader for the flat supplier records file.
//!
//! One supplier per line, four delimited fields:
//!
//! ```text
//! id,name,contactInfo,address
//! S1,Fresh Farms,555-0100,1 Orchard Rd
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use retailops_suppliers::{ContactInfo, RegisterSupplier, SupplierId};

const FIELD_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum SupplierFileError {
    #[error("failed to read supplier records: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// One parsed supplier line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierRecord {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
}

impl SupplierRecord {
    pub fn into_command(self, occurred_at: DateTime<Utc>) -> RegisterSupplier {
        RegisterSupplier {
            supplier_id: self.supplier_id,
            name: self.name,
            contact: self.contact,
            occurred_at,
        }
    }
}

/// Parse a single record line. Fields are trimmed.
pub fn parse_supplier_line(line: &str, delimiter: char) -> Result<SupplierRecord, String> {
    let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(format!(
            "expected {FIELD_COUNT} fields separated by {delimiter:?}, found {}",
            fields.len()
        ));
    }

    let supplier_id = SupplierId::parse(fields[0]).map_err(|e| e.to_string())?;
    Ok(SupplierRecord {
        supplier_id,
        name: fields[1].to_string(),
        contact: ContactInfo {
            contact: fields[2].to_string(),
            address: fields[3].to_string(),
        },
    })
}

/// Parse every record in `content`, reporting the first malformed line.
pub fn parse_supplier_records(
    content: &str,
    delimiter: char,
) -> Result<Vec<SupplierRecord>, SupplierFileError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(idx, line)| {
            parse_supplier_line(line, delimiter).map_err(|reason| SupplierFileError::Malformed {
                line: idx + 1,
                reason,
            })
        })
        .collect()
}

/// Read and parse a supplier records file.
pub fn load_suppliers(
    path: impl AsRef<Path>,
    delimiter: char,
) -> Result<Vec<SupplierRecord>, SupplierFileError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let records = parse_supplier_records(&content, delimiter)?;
    tracing::info!(path = %path.display(), count = records.len(), "loaded supplier records");
    Ok(records)
}
