// SQLite-backed membership store

use std::path::PathBuf;

use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OpenFlags};

use membersync_recon::config::StoreConfig;
use membersync_recon::error::ReconError;
use membersync_recon::model::{CanonicalRecord, Field, StoredRecord};
use membersync_recon::store::KeyedStore;
use membersync_recon::value::{format_number, parse_datetime, CellValue};

/// Membership table in an existing SQLite database.
///
/// The connection is opened on first use and held until the store is
/// dropped. The database file is never created.
pub struct SqliteStore {
    path: PathBuf,
    credential: Option<String>,
    table: String,
    key: String,
    conn: Option<Connection>,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>, credential: Option<String>, config: &StoreConfig) -> Self {
        Self {
            path: path.into(),
            credential,
            table: config.table.clone(),
            key: config.key.clone(),
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn connect(&self) -> Result<Connection, ReconError> {
        log::debug!("connecting to {}", self.path.display());
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags).map_err(|e| {
            ReconError::Store(format!("cannot open {}: {e}", self.path.display()))
        })?;
        if let Some(credential) = &self.credential {
            // Only SQLCipher builds act on this
            conn.pragma_update(None, "key", credential).map_err(store_err)?;
        }
        Ok(conn)
    }

    fn connection(&mut self) -> Result<&Connection, ReconError> {
        if self.conn.is_none() {
            self.conn = Some(self.connect()?);
        }
        self.conn
            .as_ref()
            .ok_or_else(|| ReconError::Store("connection unavailable".into()))
    }

    fn column_for(&self, field: Field) -> &str {
        match field {
            Field::Number => &self.key,
            other => other.column(),
        }
    }
}

impl KeyedStore for SqliteStore {
    fn lookup_by_id(&mut self, id: f64) -> Result<Option<StoredRecord>, ReconError> {
        let sql = format!("SELECT * FROM \"{}\" WHERE \"{}\" = ?1", self.table, self.key);
        let key = self.key.clone();
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(&sql).map_err(store_err)?;

        // Columns that are not canonical fields are ignored
        let fields: Vec<Option<Field>> = stmt
            .column_names()
            .iter()
            .map(|name| field_for_column(&key, name))
            .collect();

        let mut rows = stmt.query(params![id]).map_err(store_err)?;
        let Some(row) = rows.next().map_err(store_err)? else {
            return Ok(None);
        };

        let mut record = StoredRecord::new();
        for (idx, field) in fields.iter().enumerate() {
            if let Some(field) = field {
                let value = row.get_ref(idx).map_err(store_err)?;
                record.insert(*field, cell_from_sql(*field, value));
            }
        }
        Ok(Some(record))
    }

    fn insert_by_id(&mut self, id: f64, record: &CanonicalRecord) -> Result<(), ReconError> {
        let mut columns: Vec<String> = vec![self.key.clone()];
        let mut values: Vec<Value> = vec![sql_value(&CellValue::Number(id))];
        for (field, value) in record.iter().filter(|(f, _)| *f != Field::Number) {
            columns.push(field.column().to_string());
            values.push(sql_value(value));
        }

        let quoted: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.table,
            quoted.join(", "),
            placeholders.join(", ")
        );

        let conn = self.connection()?;
        conn.execute(&sql, params_from_iter(values)).map_err(store_err)?;
        Ok(())
    }

    fn update_by_id(
        &mut self,
        id: f64,
        record: &CanonicalRecord,
        changed: &[Field],
    ) -> Result<(), ReconError> {
        if changed.is_empty() {
            return Ok(());
        }

        let assignments: Vec<String> = changed
            .iter()
            .enumerate()
            .map(|(i, field)| format!("\"{}\" = ?{}", self.column_for(*field), i + 1))
            .collect();
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ?{}",
            self.table,
            assignments.join(", "),
            self.key,
            changed.len() + 1
        );
        let mut values: Vec<Value> = changed.iter().map(|f| sql_value(record.get(*f))).collect();
        values.push(Value::Real(id));

        let conn = self.connection()?;
        let updated = conn.execute(&sql, params_from_iter(values)).map_err(store_err)?;
        if updated == 0 {
            return Err(ReconError::Store(format!("no member {}", format_number(id))));
        }
        Ok(())
    }
}

/// The configured key column carries the member number.
fn field_for_column(key: &str, name: &str) -> Option<Field> {
    if name.trim().eq_ignore_ascii_case(key) {
        return Some(Field::Number);
    }
    Field::from_column(name).filter(|f| *f != Field::Number)
}

fn store_err(e: rusqlite::Error) -> ReconError {
    ReconError::Store(e.to_string())
}

/// Date columns hold ISO text; everything else maps by storage class.
fn cell_from_sql(field: Field, value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Empty,
        ValueRef::Integer(i) => CellValue::Number(i as f64),
        ValueRef::Real(f) => CellValue::Number(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if field.is_date() {
                if let Some(dt) = parse_datetime(&text) {
                    return CellValue::DateTime(dt);
                }
            }
            CellValue::text(text)
        }
    }
}

fn sql_value(value: &CellValue) -> Value {
    match value {
        CellValue::Empty => Value::Null,
        CellValue::Text(s) => Value::Text(s.clone()),
        CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Value::Integer(*n as i64),
        CellValue::Number(n) => Value::Real(*n),
        CellValue::Bool(b) => Value::Integer(i64::from(*b)),
        CellValue::DateTime(_) => Value::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membersync_recon::policy::FieldEqualityPolicy;
    use std::path::Path;
    use tempfile::tempdir;

    const SCHEMA: &str = r#"
        CREATE TABLE "Membership Information" (
            NUMBER INTEGER PRIMARY KEY,
            FIRST TEXT, LAST TEXT, SEX TEXT, ADDRESS TEXT, CITY TEXT, PROV TEXT,
            BIRTHDATE TEXT, EXPIRY TEXT, Email TEXT, POSTCODE TEXT, RATING INTEGER
        );
        INSERT INTO "Membership Information" (NUMBER, FIRST, LAST, CITY, EXPIRY, Email, RATING)
        VALUES (100001, 'Ann', 'Lee', 'Ottawa', '2026-09-30', NULL, 1850);
    "#;

    fn database(dir: &Path) -> PathBuf {
        let path = dir.join("members.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        path
    }

    fn store(path: &Path) -> SqliteStore {
        SqliteStore::new(path, None, &StoreConfig::default())
    }

    #[test]
    fn test_lookup_maps_columns_to_fields() {
        let dir = tempdir().unwrap();
        let mut store = store(&database(dir.path()));

        let record = store.lookup_by_id(100001.0).unwrap().unwrap();
        assert_eq!(record.get(Field::Number), &CellValue::Number(100001.0));
        assert_eq!(record.get(Field::First), &CellValue::text("Ann"));
        assert_eq!(record.get(Field::Expiry), &CellValue::date(2026, 9, 30));
        assert_eq!(record.get(Field::Email), &CellValue::Empty);
        // NUMBER..POSTCODE; RATING is not a field
        assert_eq!(record.len(), 11);
    }

    #[test]
    fn test_absent_member_is_none() {
        let dir = tempdir().unwrap();
        let mut store = store(&database(dir.path()));
        assert!(store.lookup_by_id(100002.0).unwrap().is_none());
    }

    #[test]
    fn test_connection_is_lazy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let mut store = store(&path);
        assert!(!store.is_connected());
        assert!(!path.exists());

        let err = store.lookup_by_id(100001.0).unwrap_err();
        assert_eq!(err.kind(), "StoreConnectivityFault");
        // Never created
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_table_is_store_fault() {
        let dir = tempdir().unwrap();
        let path = database(dir.path());
        let config = StoreConfig {
            table: "Members".into(),
            key: "NUMBER".into(),
        };
        let mut store = SqliteStore::new(&path, None, &config);
        let err = store.lookup_by_id(100001.0).unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_insert_then_update_changed_fields() {
        let dir = tempdir().unwrap();
        let mut store = store(&database(dir.path()));

        let mut record = CanonicalRecord::new(Some(100002.0));
        record.set(Field::First, CellValue::text("Bob"));
        record.set(Field::City, CellValue::text("Hull"));
        record.set(Field::Birthdate, CellValue::date(1980, 5, 1));
        store.insert_by_id(100002.0, &record).unwrap();
        assert!(store.is_connected());

        let stored = store.lookup_by_id(100002.0).unwrap().unwrap();
        assert_eq!(stored.get(Field::Birthdate), &CellValue::date(1980, 5, 1));

        record.set(Field::First, CellValue::text("Robert"));
        record.set(Field::City, CellValue::text("Gatineau"));
        store.update_by_id(100002.0, &record, &[Field::First]).unwrap();

        let stored = store.lookup_by_id(100002.0).unwrap().unwrap();
        assert_eq!(stored.get(Field::First), &CellValue::text("Robert"));
        assert_eq!(stored.get(Field::City), &CellValue::text("Hull"));

        assert!(store.update_by_id(100009.0, &record, &[Field::First]).is_err());
        assert!(store.insert_by_id(100002.0, &record).is_err());
    }

    #[test]
    fn test_custom_key_column_carries_member_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("members.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"CREATE TABLE "Membership Information" (ID INTEGER PRIMARY KEY, FIRST TEXT);
               INSERT INTO "Membership Information" VALUES (100001, 'Ann');"#,
        )
        .unwrap();
        drop(conn);

        let config = StoreConfig {
            table: "Membership Information".into(),
            key: "ID".into(),
        };
        let mut store = SqliteStore::new(&path, None, &config);

        let stored = store.lookup_by_id(100001.0).unwrap().unwrap();
        assert_eq!(stored.get(Field::Number), &CellValue::Number(100001.0));

        let mut record = CanonicalRecord::new(Some(100001.0));
        record.set(Field::First, CellValue::text("Ann"));
        let policy = FieldEqualityPolicy::default();
        assert!(policy.unequal_fields(&stored, &record).is_empty());

        let mut added = CanonicalRecord::new(Some(100002.0));
        added.set(Field::First, CellValue::text("Bob"));
        store.insert_by_id(100002.0, &added).unwrap();
        added.set(Field::First, CellValue::text("Robert"));
        store.update_by_id(100002.0, &added, &[Field::First]).unwrap();

        let stored = store.lookup_by_id(100002.0).unwrap().unwrap();
        assert_eq!(stored.get(Field::Number), &CellValue::Number(100002.0));
        assert_eq!(stored.get(Field::First), &CellValue::text("Robert"));
    }

    #[test]
    fn test_credential_is_accepted_by_plain_sqlite() {
        let dir = tempdir().unwrap();
        let path = database(dir.path());
        let mut store = SqliteStore::new(&path, Some("secret".into()), &StoreConfig::default());
        assert!(store.lookup_by_id(100001.0).unwrap().is_some());
    }
}
