//! Typed views over feed entries
//!
//! An [`Entry`] is generic Atom; these types read the spreadsheet-specific
//! parts of it (dimensions, cells, list columns, batch outcomes).

use std::collections::BTreeMap;

use ahash::AHashMap;
use chrono::{DateTime, FixedOffset};

use crate::address::CellAddress;
use crate::error::{Error, Result};
use crate::feed::{Author, Entry};
use crate::links::LinkTable;
use crate::xml::{BATCH_NS, GSX_NS, GS_NS};

/// Cell values keyed by row, then column (both 1-based)
pub type CellGrid = BTreeMap<u32, BTreeMap<u32, String>>;

/// A spreadsheet as listed in the spreadsheets feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetInfo {
    pub id: String,
    pub title: String,
    pub updated: Option<DateTime<FixedOffset>>,
    pub author: Option<Author>,
    pub links: LinkTable,
}

impl SpreadsheetInfo {
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        Ok(Self {
            id: entry.meta.id.clone().ok_or(Error::MissingField("id"))?,
            title: entry.meta.title.clone().ok_or(Error::MissingField("title"))?,
            updated: entry.meta.updated,
            author: entry.meta.author.clone(),
            links: entry.links.clone(),
        })
    }
}

/// A worksheet entry with its dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetInfo {
    pub id: String,
    pub title: String,
    pub updated: Option<DateTime<FixedOffset>>,
    /// `gs:rowCount` as reported, header row included
    pub reported_rows: u32,
    /// `gs:colCount`
    pub columns: u32,
    pub links: LinkTable,
}

impl WorksheetInfo {
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        let element = entry.element();
        Ok(Self {
            id: entry.meta.id.clone().ok_or(Error::MissingField("id"))?,
            title: entry.meta.title.clone().ok_or(Error::MissingField("title"))?,
            updated: entry.meta.updated,
            reported_rows: parse_number(element.child_text(GS_NS, "rowCount"), "gs:rowCount")?,
            columns: parse_number(element.child_text(GS_NS, "colCount"), "gs:colCount")?,
            links: entry.links.clone(),
        })
    }

    /// Rows holding data; the reported count always includes the header row
    pub fn data_rows(&self) -> u32 {
        self.reported_rows.saturating_sub(1)
    }
}

/// One entry of a cells feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEntry {
    pub address: CellAddress,
    /// What was typed into the cell (formula text for formulas)
    pub input_value: String,
    /// The displayed value
    pub content: String,
}

impl CellEntry {
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        let cell = entry
            .element()
            .child(GS_NS, "cell")
            .ok_or(Error::MissingField("gs:cell"))?;

        let row = parse_number(cell.attr("row"), "gs:cell@row")?;
        let col = parse_number(cell.attr("col"), "gs:cell@col")?;

        Ok(Self {
            address: CellAddress::new(row, col)?,
            input_value: cell.attr("inputValue").unwrap_or_default().to_string(),
            content: entry.content.clone().unwrap_or_default(),
        })
    }
}

/// One entry of a list feed: a data row keyed by column tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    /// `(column tag, value)` in document order
    pub values: Vec<(String, String)>,
    pub links: LinkTable,
}

impl ListRow {
    pub fn from_entry(entry: &Entry) -> Self {
        let values = entry
            .element()
            .children_in(GSX_NS)
            .map(|c| (c.name.clone(), c.text.clone()))
            .collect();

        Self {
            values,
            links: entry.links.clone(),
        }
    }

    /// Value of a column, looked up by tag
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, value)| value.as_str())
    }
}

/// Per-entry outcome reported in a batch response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// The `batch:id` we sent (an A1 address for cell updates)
    pub id: Option<String>,
    pub code: u16,
    pub reason: Option<String>,
}

impl BatchResult {
    /// Read `batch:id` / `batch:status`; `None` when the entry carries no status
    pub fn from_entry(entry: &Entry) -> Result<Option<Self>> {
        let element = entry.element();
        let Some(status) = element.child(BATCH_NS, "status") else {
            return Ok(None);
        };

        Ok(Some(Self {
            id: element.child_text(BATCH_NS, "id").map(str::to_string),
            code: parse_number(status.attr("code"), "batch:status@code")?,
            reason: status.attr("reason").map(str::to_string),
        }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Header-row mapping between column names and column numbers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    by_index: BTreeMap<u32, String>,
    by_name: AHashMap<String, u32>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the cells of the header row
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = &'a CellEntry>) -> Self {
        let mut map = Self::new();
        for cell in cells {
            if cell.address.row == 1 {
                map.insert(cell.address.col, &cell.input_value);
            }
        }
        map
    }

    pub fn insert(&mut self, col: u32, name: &str) {
        self.by_name.insert(name.to_lowercase(), col);
        self.by_index.insert(col, name.to_string());
    }

    /// Column number for a name (case-insensitive)
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Column name as written in the header row
    pub fn name_of(&self, col: u32) -> Option<&str> {
        self.by_index.get(&col).map(String::as_str)
    }

    /// Columns in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.by_index.iter().map(|(col, name)| (*col, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

/// Column name to value mapping for one list-feed row
///
/// Names are matched case-insensitively: inserting `"AGE"` after `"Age"`
/// replaces the earlier value. Insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRecord {
    fields: Vec<(String, String)>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&column))
        {
            Some(field) => *field = (column, value),
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RowRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RowRecord::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

/// The list-feed element name the service derives from a column name
///
/// Lower-cased, keeping only ASCII alphanumerics, `.` and `-`.
pub fn list_column_tag(name: &str) -> Result<String> {
    let tag: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    // XML names cannot start with a digit, '.' or '-'
    match tag.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => Ok(tag),
        _ => Err(Error::InvalidColumnName(name.to_string())),
    }
}

fn parse_number<T: std::str::FromStr>(text: Option<&str>, field: &'static str) -> Result<T> {
    let text = text.ok_or(Error::MissingField(field))?;
    text.trim()
        .parse()
        .map_err(|_| Error::Parse(format!("invalid {}: {:?}", field, text)))
}
