use std::collections::HashMap;

use crate::error::ReconError;
use crate::model::{CanonicalRecord, Field, StoredRecord};

/// Records already held in the membership store, keyed by member id.
pub trait KeyedStore {
    fn lookup_by_id(&mut self, id: f64) -> Result<Option<StoredRecord>, ReconError>;

    /// Add a record for a new member. Not called by the reconciliation flow.
    fn insert_by_id(&mut self, id: f64, record: &CanonicalRecord) -> Result<(), ReconError>;

    /// Overwrite `changed` fields of an existing member. Not called by the
    /// reconciliation flow.
    fn update_by_id(
        &mut self,
        id: f64,
        record: &CanonicalRecord,
        changed: &[Field],
    ) -> Result<(), ReconError>;
}

impl<T: KeyedStore + ?Sized> KeyedStore for &mut T {
    fn lookup_by_id(&mut self, id: f64) -> Result<Option<StoredRecord>, ReconError> {
        (**self).lookup_by_id(id)
    }

    fn insert_by_id(&mut self, id: f64, record: &CanonicalRecord) -> Result<(), ReconError> {
        (**self).insert_by_id(id, record)
    }

    fn update_by_id(
        &mut self,
        id: f64,
        record: &CanonicalRecord,
        changed: &[Field],
    ) -> Result<(), ReconError> {
        (**self).update_by_id(id, record, changed)
    }
}

/// `f64` ids are keyed by their bit pattern; ids are always finite.
fn key(id: f64) -> u64 {
    id.to_bits()
}

/// HashMap-backed store that counts lookups.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<u64, StoredRecord>,
    lookups: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, id: f64, record: StoredRecord) -> Self {
        self.records.insert(key(id), record);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl KeyedStore for MemoryStore {
    fn lookup_by_id(&mut self, id: f64) -> Result<Option<StoredRecord>, ReconError> {
        self.lookups += 1;
        Ok(self.records.get(&key(id)).cloned())
    }

    fn insert_by_id(&mut self, id: f64, record: &CanonicalRecord) -> Result<(), ReconError> {
        if self.records.contains_key(&key(id)) {
            return Err(ReconError::Store(format!("member {id} already exists")));
        }
        self.records.insert(key(id), StoredRecord::from(record));
        Ok(())
    }

    fn update_by_id(
        &mut self,
        id: f64,
        record: &CanonicalRecord,
        changed: &[Field],
    ) -> Result<(), ReconError> {
        let stored = self
            .records
            .get_mut(&key(id))
            .ok_or_else(|| ReconError::Store(format!("no member {id}")))?;
        for field in changed {
            stored.insert(*field, record.get(*field).clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;

    #[test]
    fn lookup_counts_and_misses() {
        let mut store = MemoryStore::new().with_record(
            100001.0,
            vec![(Field::First, CellValue::text("Ann"))].into_iter().collect(),
        );
        assert!(store.lookup_by_id(100002.0).unwrap().is_none());
        let rec = store.lookup_by_id(100001.0).unwrap().unwrap();
        assert_eq!(rec.get(Field::First), &CellValue::text("Ann"));
        assert_eq!(store.lookups(), 2);
    }

    #[test]
    fn insert_then_update_changed_fields_only() {
        let mut store = MemoryStore::new();
        let mut rec = CanonicalRecord::new(Some(100001.0));
        rec.set(Field::First, CellValue::text("Ann"));
        rec.set(Field::City, CellValue::text("Ottawa"));
        store.insert_by_id(100001.0, &rec).unwrap();
        assert!(store.insert_by_id(100001.0, &rec).is_err());

        rec.set(Field::First, CellValue::text("Anne"));
        rec.set(Field::City, CellValue::text("Hull"));
        store.update_by_id(100001.0, &rec, &[Field::First]).unwrap();

        let stored = store.lookup_by_id(100001.0).unwrap().unwrap();
        assert_eq!(stored.get(Field::First), &CellValue::text("Anne"));
        assert_eq!(stored.get(Field::City), &CellValue::text("Ottawa"));
        assert!(store.update_by_id(5.0, &rec, &[Field::First]).is_err());
    }
}
