//! Field-level equality policy: does a stored value need updating?

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::PolicyConfig;
use crate::model::{CanonicalRecord, Field, StoredRecord};
use crate::value::{midnight, CellValue};

#[derive(Debug, Clone)]
pub struct FieldEqualityPolicy {
    sentinel_low: NaiveDateTime,
    sentinel_high: NaiveDateTime,
}

impl FieldEqualityPolicy {
    pub fn new(sentinel_low: NaiveDate, sentinel_high: NaiveDate) -> Self {
        Self {
            sentinel_low: midnight(sentinel_low),
            sentinel_high: midnight(sentinel_high),
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.sentinel_low, config.sentinel_high)
    }

    /// Decide whether `stored` must be replaced by `source` for `field`.
    pub fn needs_update(&self, field: Field, stored: &CellValue, source: &CellValue) -> bool {
        let stored = comparable(stored);
        let source = comparable(source);

        if stored.is_empty() && source.is_empty() {
            return false;
        }

        match field {
            Field::Expiry => {
                // An empty export value never overwrites a real date
                if source.is_empty() {
                    return false;
                }
                if self.both_placeholders(&stored, &source) {
                    return false;
                }
            }
            Field::Email if source.is_empty() => return false,
            _ => {}
        }

        stored != source
    }

    /// Fields of `record` whose stored value differs, in canonical order.
    pub fn unequal_fields(&self, stored: &StoredRecord, record: &CanonicalRecord) -> Vec<Field> {
        record
            .iter()
            .filter(|(field, source)| self.needs_update(*field, stored.get(*field), source))
            .map(|(field, _)| field)
            .collect()
    }

    /// Both dates sit on the same side of the sentinel band.
    fn both_placeholders(&self, stored: &CellValue, source: &CellValue) -> bool {
        match (stored.as_datetime(), source.as_datetime()) {
            (Some(a), Some(b)) => {
                (a < self.sentinel_low && b < self.sentinel_low)
                    || (a > self.sentinel_high && b > self.sentinel_high)
            }
            _ => false,
        }
    }
}

impl Default for FieldEqualityPolicy {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
    }
}

/// Trim text and fold blank text into `Empty`.
fn comparable(value: &CellValue) -> Cow<'_, CellValue> {
    match value {
        CellValue::Text(s) if s.trim().is_empty() => Cow::Owned(CellValue::Empty),
        CellValue::Text(s) if s.trim().len() != s.len() => Cow::Owned(CellValue::text(s.trim())),
        _ => Cow::Borrowed(value),
    }
}
