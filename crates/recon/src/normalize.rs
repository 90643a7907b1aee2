//! Spreadsheet row -> canonical record.

use crate::config::{ColumnMapping, RegionRule, SyncConfig};
use crate::model::{CanonicalRecord, Field, SourceRow};
use crate::value::CellValue;

/// Built-in province/territory table. Order matters: first match wins.
const CANADIAN_REGIONS: [(&str, &str); 15] = [
    ("ALB", "AB"),
    ("BRI", "BC"),
    ("MAN", "MB"),
    ("BRU", "NB"),
    ("FOU", "NL"),
    ("WES", "NT"),
    ("SCO", "NS"),
    ("NUN", "NU"),
    ("ONT", "ON"),
    ("PRI", "PE"),
    ("QU", "QC"),
    ("SAS", "SK"),
    ("YUK", "YT"),
    ("US", "US"),
    ("FO", "FO"),
];

// ---------------------------------------------------------------------------
// Region rules
// ---------------------------------------------------------------------------

/// Ordered (substring, code) table evaluated top to bottom.
#[derive(Debug, Clone)]
pub struct RegionRules {
    /// Patterns stored upper-cased.
    rules: Vec<RegionRule>,
}

impl RegionRules {
    pub fn new(rules: impl IntoIterator<Item = RegionRule>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|r| RegionRule::new(r.pattern.to_uppercase(), r.code))
                .collect(),
        }
    }

    pub fn canadian() -> Self {
        Self::new(CANADIAN_REGIONS.iter().map(|(p, c)| RegionRule::new(*p, *c)))
    }

    /// Map a raw region cell to its code.
    ///
    /// `Empty` stays `Empty`, non-text becomes `""`, and text that matches
    /// no rule is returned unchanged.
    pub fn resolve(&self, value: &CellValue) -> CellValue {
        let text = match value {
            CellValue::Empty => return CellValue::Empty,
            CellValue::Text(s) => s,
            _ => return CellValue::text(""),
        };
        let upper = text.to_uppercase();
        self.rules
            .iter()
            .find(|r| upper.contains(&r.pattern))
            .map(|r| CellValue::text(r.code.clone()))
            .unwrap_or_else(|| value.clone())
    }
}

impl Default for RegionRules {
    fn default() -> Self {
        Self::canadian()
    }
}

// ---------------------------------------------------------------------------
// Field coercions
// ---------------------------------------------------------------------------

/// Trimmed text; `Empty` becomes `""`.
pub fn free_text(value: &CellValue) -> CellValue {
    CellValue::text(value.to_string().trim())
}

/// Identifier as a float, or `None` when the cell cannot be read as one.
pub fn member_id(value: &CellValue) -> Option<f64> {
    let n = match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// `Male` -> `M`, `Female` -> `F`, anything else -> `""`.
pub fn sex_code(value: &CellValue) -> CellValue {
    let code = match free_text(value).as_text() {
        Some("Male") => "M",
        Some("Female") => "F",
        _ => "",
    };
    CellValue::text(code)
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

pub struct RecordNormalizer {
    columns: ColumnMapping,
    regions: RegionRules,
}

impl RecordNormalizer {
    pub fn new(columns: ColumnMapping, regions: RegionRules) -> Self {
        Self { columns, regions }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        let regions = match &config.region_rules {
            Some(rules) => RegionRules::new(rules.iter().cloned()),
            None => RegionRules::canadian(),
        };
        Self::new(config.source.columns.clone(), regions)
    }

    pub fn normalize(&self, row: &SourceRow) -> CanonicalRecord {
        let col = &self.columns;
        let id_cell = row.get(&col.id);
        let id = member_id(id_cell);
        if id.is_none() && !id_cell.is_empty() {
            log::warn!("unparsable member id {:?}; row will not be matched", id_cell.to_string());
        }

        let mut rec = CanonicalRecord::new(id);
        rec.set(Field::First, free_text(row.get(&col.first_name)));
        rec.set(Field::Last, free_text(row.get(&col.last_name)));
        rec.set(Field::Sex, sex_code(row.get(&col.gender)));
        rec.set(Field::Address, free_text(row.get(&col.address)));
        rec.set(Field::City, free_text(row.get(&col.town)));
        rec.set(Field::Prov, self.regions.resolve(row.get(&col.region)));
        // Dates are typed by the source reader
        rec.set(Field::Birthdate, row.get(&col.birth_date).clone());
        rec.set(Field::Expiry, row.get(&col.expiry).clone());
        rec.set(Field::Email, free_text(row.get(&col.email)));
        rec.set(Field::Postcode, free_text(row.get(&col.postcode)));
        rec
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(ColumnMapping::default(), RegionRules::canadian())
    }
}
