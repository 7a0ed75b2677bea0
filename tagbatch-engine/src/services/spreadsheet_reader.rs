//! Record source: the first worksheet of an XLSX/XLS/ODS workbook
//!
//! Columns are addressed by spreadsheet letters (`A`, `K`, `EG`). Leading
//! blank rows are skipped; when the sheet has a header, the first non-empty
//! row of the key column is treated as the header and data starts below it.

use crate::config::TagTable;
use crate::models::{RawRecords, RecordStore};
use calamine::{open_workbook_auto, Data, Range, Reader};
use indexmap::IndexMap;
use std::path::Path;
use tagbatch_common::config::SpreadsheetConfig;
use tagbatch_common::{Error, Result};
use tracing::{debug, info, warn};

/// Reads raw key → fields rows from a data source
pub trait SpreadsheetReader {
    fn read(&self, path: &Path) -> Result<RawRecords>;
}

/// Zero-based column index of a spreadsheet column name
///
/// `A` → 0, `Z` → 25, `AA` → 26, `EG` → 136.
pub fn column_index(letters: &str) -> Result<u32> {
    let letters = letters.trim();
    if letters.is_empty() {
        return Err(Error::Config("Empty column name".to_string()));
    }

    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::Config(format!("Invalid column name: {}", letters)));
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .ok_or_else(|| Error::Config(format!("Column name out of range: {}", letters)))?;
    }
    Ok(index - 1)
}

/// Resolved column layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    key_column: u32,
    /// Field name → column; `None` for fields the sheet does not carry
    fields: IndexMap<String, Option<u32>>,
}

impl ColumnMap {
    /// Resolve the configured layout
    ///
    /// Every tag-table field gets an entry so records carry the full field
    /// set; mapped fields outside the table are kept after them.
    pub fn new(config: &SpreadsheetConfig, tag_table: &TagTable) -> Result<Self> {
        let key_column = column_index(&config.key_column)?;

        let mut fields = IndexMap::new();
        for mapping in tag_table.iter() {
            fields.insert(mapping.field.clone(), None);
        }
        for (field, letters) in &config.columns {
            fields.insert(field.clone(), Some(column_index(letters)?));
        }

        for (field, column) in &fields {
            if column.is_none() {
                debug!(field = %field, "Field has no spreadsheet column");
            }
        }

        Ok(Self { key_column, fields })
    }

    pub fn key_column(&self) -> u32 {
        self.key_column
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<u32>)> {
        self.fields.iter().map(|(f, c)| (f.as_str(), *c))
    }
}

/// Workbook reader backed by calamine
#[derive(Debug, Clone)]
pub struct XlsxReader {
    columns: ColumnMap,
    has_header: bool,
}

impl XlsxReader {
    pub fn new(columns: ColumnMap, has_header: bool) -> Self {
        Self {
            columns,
            has_header,
        }
    }

    pub fn from_config(config: &SpreadsheetConfig, tag_table: &TagTable) -> Result<Self> {
        Ok(Self::new(ColumnMap::new(config, tag_table)?, config.has_header))
    }

    /// Extract records from an already loaded sheet
    pub fn records_from_range(&self, range: &Range<Data>) -> RawRecords {
        let mut records = RawRecords::new();

        let (Some((start_row, start_col)), Some((end_row, _))) = (range.start(), range.end())
        else {
            return records;
        };

        // First row with content in the first used column
        let Some(first_row) = (start_row..=end_row).find(|row| {
            cell_text(range.get_value((*row, start_col))).is_some()
        }) else {
            return records;
        };
        let data_start = if self.has_header { first_row + 1 } else { first_row };

        for row in data_start..=end_row {
            let Some(key) = cell_text(range.get_value((row, self.columns.key_column))) else {
                continue;
            };

            let fields: IndexMap<String, Option<String>> = self
                .columns
                .fields()
                .map(|(field, column)| {
                    let value = column.and_then(|c| cell_text(range.get_value((row, c))));
                    (field.to_string(), value)
                })
                .collect();

            if records.insert(key.clone(), fields).is_some() {
                warn!(key = %key, row = row + 1, "Duplicate key in sheet, later row wins");
            }
        }

        records
    }
}

impl SpreadsheetReader for XlsxReader {
    fn read(&self, path: &Path) -> Result<RawRecords> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| Error::Load(format!("Open {} failed: {}", path.display(), e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::Load(format!("{} has no worksheets", path.display())))?
            .map_err(|e| Error::Load(format!("Read {} failed: {}", path.display(), e)))?;

        let records = self.records_from_range(&range);
        info!(path = %path.display(), rows = records.len(), "Loaded spreadsheet");
        Ok(records)
    }
}

/// Read a data source and build the record store
pub fn load_record_store(reader: &dyn SpreadsheetReader, path: &Path) -> Result<RecordStore> {
    let raw = reader.read(path)?;
    let store = RecordStore::from_raw(raw);
    if store.is_empty() {
        warn!(path = %path.display(), "Spreadsheet contains no usable records");
    }
    Ok(store)
}

/// Cell text, `None` for empty or blank cells
///
/// Whole numbers lose their fractional part so numeric keys read as `1234`,
/// not `1234.0`.
fn cell_text(cell: Option<&Data>) -> Option<String> {
    let text = match cell? {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Error(e) => {
            debug!(error = ?e, "Skipping error cell");
            return None;
        }
        other => other.to_string(),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
