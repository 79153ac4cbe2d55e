use crate::error::RecordError;
use crate::model::{Record, Value};
use ahash::AHashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Record persistence used by the built-in actions and by implementations.
pub trait RecordService: Send + Sync {
    /// Persists `record`, assigning an id when it has none.
    fn save(&self, record: &mut Record) -> Result<(), RecordError>;

    /// Fetches records of one type by id. An empty `fields` list loads every field.
    /// Ids that do not exist are left out of the result.
    fn fetch(
        &self,
        type_name: &str,
        ids: &[String],
        fields: &[String],
    ) -> Result<Vec<Record>, RecordError>;
}

/// Loads a single record, failing when it does not exist.
pub fn fetch_one(
    service: &dyn RecordService,
    type_name: &str,
    id: &str,
    fields: &[String],
) -> Result<Record, RecordError> {
    service
        .fetch(type_name, &[id.to_string()], fields)?
        .into_iter()
        .next()
        .ok_or_else(|| RecordError::NotFound {
            type_name: type_name.to_string(),
            id: id.to_string(),
        })
}

/// An in-process record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<AHashMap<(String, String), Record>>,
    next_id: AtomicU64,
    saves: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record as-is, returning its id.
    pub fn insert(&self, mut record: Record) -> Result<String, RecordError> {
        self.save(&mut record)?;
        record.id.ok_or_else(|| RecordError::MissingId(record.type_name.clone()))
    }

    pub fn get(&self, type_name: &str, id: &str) -> Option<Record> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .get(&(type_name.to_string(), id.to_string()))
            .cloned()
    }

    /// Number of save calls served so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    /// Expands a bare reference stored in a field into the referenced record.
    fn expand(records: &AHashMap<(String, String), Record>, value: &Value) -> Value {
        match value {
            Value::Record(reference) if reference.fields.is_empty() => reference
                .id
                .as_ref()
                .and_then(|id| records.get(&(reference.type_name.clone(), id.clone())))
                .cloned()
                .map(Value::Record)
                .unwrap_or_else(|| value.clone()),
            other => other.clone(),
        }
    }
}

impl RecordService for MemoryRecordStore {
    fn save(&self, record: &mut Record) -> Result<(), RecordError> {
        let id = match &record.id {
            Some(id) => id.clone(),
            None => {
                let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                let id = format!("{}-{}", record.type_name.to_lowercase(), n);
                record.id = Some(id.clone());
                id
            }
        };

        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let stored = records
            .entry((record.type_name.clone(), id))
            .or_insert_with(|| Record {
                type_name: record.type_name.clone(),
                id: record.id.clone(),
                fields: Default::default(),
            });
        for (name, value) in &record.fields {
            stored.fields.insert(name.clone(), value.clone());
        }
        *record = stored.clone();
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn fetch(
        &self,
        type_name: &str,
        ids: &[String],
        fields: &[String],
    ) -> Result<Vec<Record>, RecordError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let fetched = ids
            .iter()
            .filter_map(|id| records.get(&(type_name.to_string(), id.clone())))
            .map(|stored| {
                if fields.is_empty() {
                    return stored.clone();
                }
                let mut partial = Record {
                    type_name: stored.type_name.clone(),
                    id: stored.id.clone(),
                    fields: Default::default(),
                };
                for field in fields {
                    if let Some(value) = stored.fields.get(field) {
                        partial
                            .fields
                            .insert(field.clone(), Self::expand(&records, value));
                    }
                }
                partial
            })
            .collect();
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_assigns_ids_and_merges_fields() {
        let store = MemoryRecordStore::new();
        let mut record = Record::new("Invoice").with_field("amount", Value::Number(10.0));
        store.save(&mut record).unwrap();
        let id = record.id.clone().unwrap();

        let mut update = Record::reference("Invoice", id.clone())
            .with_field("status", Value::Text("paid".into()));
        store.save(&mut update).unwrap();

        let stored = store.get("Invoice", &id).unwrap();
        assert_eq!(stored.field("amount"), Some(Value::Number(10.0)));
        assert_eq!(stored.field("status"), Some(Value::Text("paid".into())));
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn fetch_restricts_fields_and_expands_references() {
        let store = MemoryRecordStore::new();
        let customer = store
            .insert(Record::new("Customer").with_field("name", Value::Text("ACME".into())))
            .unwrap();
        let invoice = store
            .insert(
                Record::new("Invoice")
                    .with_field("amount", Value::Number(5.0))
                    .with_field("customer", Value::Record(Record::reference("Customer", customer))),
            )
            .unwrap();

        let fetched = fetch_one(&store, "Invoice", &invoice, &["customer".to_string()]).unwrap();
        assert!(!fetched.is_loaded("amount"));
        let customer = fetched.field("customer").unwrap();
        assert_eq!(
            customer.as_record().and_then(|c| c.field("name")),
            Some(Value::Text("ACME".into()))
        );

        assert!(matches!(
            fetch_one(&store, "Invoice", "missing", &[]),
            Err(RecordError::NotFound { .. })
        ));
    }
}
