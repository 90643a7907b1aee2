use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Identifiers below this are ignored entirely.
    pub min_member_id: f64,
    /// Emit a progress line every N rows read.
    pub progress_every: usize,
    /// Where changed-record lines are written.
    pub audit_log: PathBuf,
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub policy: PolicyConfig,
    /// Replaces the built-in province table when present.
    pub region_rules: Option<Vec<RegionRule>>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_member_id: 100_000.0,
            progress_every: 10_000,
            audit_log: PathBuf::from("membersync.changes.txt"),
            source: SourceConfig::default(),
            store: StoreConfig::default(),
            policy: PolicyConfig::default(),
            region_rules: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Worksheet holding the export (ignored for CSV files).
    pub sheet: String,
    pub columns: ColumnMapping,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sheet: "Data".into(),
            columns: ColumnMapping::default(),
        }
    }
}

/// Spreadsheet header for each canonical field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMapping {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub address: String,
    pub town: String,
    pub region: String,
    pub birth_date: String,
    pub expiry: String,
    pub email: String,
    pub postcode: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: "MID".into(),
            first_name: "First Name".into(),
            last_name: "Last Name".into(),
            gender: "Gender".into(),
            address: "Address Line 1".into(),
            town: "Town".into(),
            region: "County".into(),
            birth_date: "Date of Birth".into(),
            expiry: "Membership Expiry".into(),
            email: "Email Address".into(),
            postcode: "Postcode".into(),
        }
    }
}

impl ColumnMapping {
    fn headers(&self) -> [(&'static str, &str); 11] {
        [
            ("id", self.id.as_str()),
            ("first_name", self.first_name.as_str()),
            ("last_name", self.last_name.as_str()),
            ("gender", self.gender.as_str()),
            ("address", self.address.as_str()),
            ("town", self.town.as_str()),
            ("region", self.region.as_str()),
            ("birth_date", self.birth_date.as_str()),
            ("expiry", self.expiry.as_str()),
            ("email", self.email.as_str()),
            ("postcode", self.postcode.as_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub table: String,
    /// Column holding the member identifier.
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: "Membership Information".into(),
            key: "NUMBER".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy + region rules
// ---------------------------------------------------------------------------

/// Expiry dates before `sentinel_low` or after `sentinel_high` are
/// placeholders, not real dates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub sentinel_low: NaiveDate,
    pub sentinel_high: NaiveDate,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            sentinel_low: NaiveDate::from_ymd_opt(1961, 12, 31).unwrap_or(NaiveDate::MIN),
            sentinel_high: NaiveDate::from_ymd_opt(2080, 1, 1).unwrap_or(NaiveDate::MAX),
        }
    }
}

/// Case-insensitive substring -> canonical region code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionRule {
    pub pattern: String,
    pub code: String,
}

impl RegionRule {
    pub fn new(pattern: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            code: code.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !self.min_member_id.is_finite() || self.min_member_id < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "min_member_id must be a non-negative number, got {}",
                self.min_member_id
            )));
        }

        if self.progress_every == 0 {
            return Err(ReconError::ConfigValidation(
                "progress_every must be at least 1".into(),
            ));
        }

        if self.audit_log.as_os_str().is_empty() {
            return Err(ReconError::ConfigValidation("audit_log must not be empty".into()));
        }

        if self.source.sheet.trim().is_empty() {
            return Err(ReconError::ConfigValidation("source.sheet must not be empty".into()));
        }

        for (name, header) in self.source.columns.headers() {
            if header.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source.columns.{name} must not be empty"
                )));
            }
        }

        // Table and key are quoted identifiers in SQL
        for (name, ident) in [("store.table", self.store.table.as_str()), ("store.key", self.store.key.as_str())] {
            if ident.trim().is_empty() || ident.contains('"') {
                return Err(ReconError::ConfigValidation(format!(
                    "{name} must be a non-empty identifier without double quotes"
                )));
            }
        }

        if self.policy.sentinel_low >= self.policy.sentinel_high {
            return Err(ReconError::ConfigValidation(format!(
                "policy.sentinel_low ({}) must be before policy.sentinel_high ({})",
                self.policy.sentinel_low, self.policy.sentinel_high
            )));
        }

        if let Some(rules) = &self.region_rules {
            for (i, rule) in rules.iter().enumerate() {
                if rule.pattern.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "region_rules[{i}]: pattern must not be empty"
                    )));
                }
            }
        }

        Ok(())
    }
}
