use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::value::CellValue;

static EMPTY_CELL: CellValue = CellValue::Empty;

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

/// Canonical membership fields, declared in record order.
///
/// The display form is the store column name, so audit lines and store
/// queries use the same spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Number,
    First,
    Last,
    Sex,
    Address,
    City,
    Prov,
    Birthdate,
    Expiry,
    Email,
    Postcode,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Number,
        Field::First,
        Field::Last,
        Field::Sex,
        Field::Address,
        Field::City,
        Field::Prov,
        Field::Birthdate,
        Field::Expiry,
        Field::Email,
        Field::Postcode,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::Number => "NUMBER",
            Self::First => "FIRST",
            Self::Last => "LAST",
            Self::Sex => "SEX",
            Self::Address => "ADDRESS",
            Self::City => "CITY",
            Self::Prov => "PROV",
            Self::Birthdate => "BIRTHDATE",
            Self::Expiry => "EXPIRY",
            Self::Email => "Email",
            Self::Postcode => "POSTCODE",
        }
    }

    /// Map a store column name back to a field (case-insensitive).
    pub fn from_column(name: &str) -> Option<Field> {
        Self::ALL
            .into_iter()
            .find(|f| f.column().eq_ignore_ascii_case(name.trim()))
    }

    pub fn is_date(self) -> bool {
        matches!(self, Self::Birthdate | Self::Expiry)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Source rows
// ---------------------------------------------------------------------------

/// One raw spreadsheet row: header -> cell, in column order.
#[derive(Debug, Clone, Default)]
pub struct SourceRow {
    cells: Vec<(String, CellValue)>,
}

impl SourceRow {
    /// Zip headers with values. Short rows are padded with empty text.
    pub fn new(headers: &[String], values: Vec<CellValue>) -> Self {
        let mut values = values.into_iter();
        let cells = headers
            .iter()
            .map(|h| (h.clone(), values.next().unwrap_or_else(|| CellValue::text(""))))
            .collect();
        Self { cells }
    }

    /// Cell under `header`; a missing column reads as `Empty`.
    pub fn get(&self, header: &str) -> &CellValue {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v)
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, CellValue)> for SourceRow {
    fn from_iter<I: IntoIterator<Item = (S, CellValue)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(h, v)| (h.into(), v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical + stored records
// ---------------------------------------------------------------------------

/// A normalized row, keyed by its numeric member identifier.
#[derive(Debug, Clone, Default)]
pub struct CanonicalRecord {
    /// `None` when the identifier cell could not be parsed.
    pub id: Option<f64>,
    values: BTreeMap<Field, CellValue>,
}

impl CanonicalRecord {
    pub fn new(id: Option<f64>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(Field::Number, id.map(CellValue::Number).unwrap_or_default());
        Self { id, values }
    }

    pub fn set(&mut self, field: Field, value: CellValue) {
        if field == Field::Number {
            self.id = match value {
                CellValue::Number(n) => Some(n),
                _ => None,
            };
        }
        self.values.insert(field, value);
    }

    pub fn get(&self, field: Field) -> &CellValue {
        self.values.get(&field).unwrap_or(&EMPTY_CELL)
    }

    /// Fields in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &CellValue)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }
}

/// A record fetched from the store, addressed by canonical field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredRecord {
    values: HashMap<Field, CellValue>,
}

impl StoredRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, value: CellValue) {
        self.values.insert(field, value);
    }

    /// Columns the store did not return read as `Empty`.
    pub fn get(&self, field: Field) -> &CellValue {
        self.values.get(&field).unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(Field, CellValue)> for StoredRecord {
    fn from_iter<I: IntoIterator<Item = (Field, CellValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<&CanonicalRecord> for StoredRecord {
    fn from(record: &CanonicalRecord) -> Self {
        record.iter().map(|(f, v)| (f, v.clone())).collect()
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub rows_read: usize,
    pub updates: usize,
    pub additions: usize,
}
