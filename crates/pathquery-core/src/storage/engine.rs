//! Storage engine implementation.

use super::{Record, StorageConfig};
use crate::error::Error;
use pathquery_proto::Value;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::collections::BTreeMap;
use tracing::trace;

/// Tree name prefix for row data, one tree per entity type.
const DATA_PREFIX: &str = "data:";

/// Tree name prefix for identity indexes (identity key -> sequence).
const INDEX_PREFIX: &str = "index:";

/// The storage engine wrapping sled.
///
/// Rows are keyed by a database-wide sequence number assigned on first
/// insert, so a scan returns rows in insertion order. Rewriting a row keeps
/// its sequence.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        Ok(Self { db })
    }

    /// Check if the database was recovered from a previous crash.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Insert or replace the row of `entity_type` with identity `id`.
    ///
    /// The row and its identity index entry are written in one transaction.
    /// Returns the row's sequence number.
    pub fn put(
        &self,
        entity_type: &str,
        id: &Value,
        fields: &BTreeMap<String, Value>,
    ) -> Result<u64, Error> {
        let id_key = Self::identity_key(id)?;
        let record = Record::from_fields(fields)?.to_bytes()?;
        let index = self.index_tree(entity_type)?;
        let data = self.data_tree(entity_type)?;
        let fresh = match index.get(&id_key)? {
            Some(_) => None,
            None => Some(self.db.generate_id()?),
        };

        let result: Result<u64, TransactionError<Error>> =
            (&index, &data).transaction(|(index_tx, data_tx)| {
                let seq = match (index_tx.get(&id_key)?, fresh) {
                    (Some(bytes), _) => {
                        Self::decode_seq(&bytes).map_err(ConflictableTransactionError::Abort)?
                    }
                    (None, Some(seq)) => seq,
                    (None, None) => {
                        return Err(ConflictableTransactionError::Abort(Error::InvalidData(
                            "row removed during write".into(),
                        )))
                    }
                };
                let seq_key = seq.to_be_bytes();
                data_tx.insert(&seq_key[..], record.as_slice())?;
                index_tx.insert(id_key.as_slice(), &seq_key[..])?;
                Ok(seq)
            });
        let seq = Self::finish(result)?;

        trace!(entity_type, seq, "stored row");
        Ok(seq)
    }

    /// Get a row by identity.
    pub fn get(
        &self,
        entity_type: &str,
        id: &Value,
    ) -> Result<Option<BTreeMap<String, Value>>, Error> {
        let id_key = Self::identity_key(id)?;
        let seq = match self.index_tree(entity_type)?.get(id_key)? {
            Some(bytes) => Self::decode_seq(&bytes)?,
            None => return Ok(None),
        };

        match self.data_tree(entity_type)?.get(seq.to_be_bytes())? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?.fields()?)),
            None => Ok(None),
        }
    }

    /// Remove a row by identity. Returns whether a row existed.
    pub fn remove(&self, entity_type: &str, id: &Value) -> Result<bool, Error> {
        let id_key = Self::identity_key(id)?;
        let index = self.index_tree(entity_type)?;
        let data = self.data_tree(entity_type)?;

        let result: Result<bool, TransactionError<Error>> =
            (&index, &data).transaction(|(index_tx, data_tx)| {
                let Some(bytes) = index_tx.remove(id_key.as_slice())? else {
                    return Ok(false);
                };
                let seq = Self::decode_seq(&bytes).map_err(ConflictableTransactionError::Abort)?;
                data_tx.remove(&seq.to_be_bytes()[..])?;
                Ok(true)
            });
        Self::finish(result)
    }

    /// Scan all rows of an entity type in insertion order.
    pub fn scan(
        &self,
        entity_type: &str,
    ) -> Result<impl Iterator<Item = Result<BTreeMap<String, Value>, Error>>, Error> {
        let tree = self.data_tree(entity_type)?;
        Ok(tree.iter().map(|result| {
            let (_, bytes) = result?;
            Record::from_bytes(&bytes)?.fields()
        }))
    }

    /// Number of rows of an entity type.
    pub fn count(&self, entity_type: &str) -> Result<usize, Error> {
        Ok(self.data_tree(entity_type)?.len())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the underlying sled database (for opening new trees).
    pub fn db(&self) -> &Db {
        &self.db
    }

    fn data_tree(&self, entity_type: &str) -> Result<Tree, Error> {
        Ok(self.db.open_tree(format!("{}{}", DATA_PREFIX, entity_type))?)
    }

    fn index_tree(&self, entity_type: &str) -> Result<Tree, Error> {
        Ok(self.db.open_tree(format!("{}{}", INDEX_PREFIX, entity_type))?)
    }

    /// Index key for an identity; integer widths map to the same key.
    fn identity_key(id: &Value) -> Result<Vec<u8>, Error> {
        match id.key() {
            Some(key) => Ok(format!("{:?}", key).into_bytes()),
            None => Err(Error::InvalidData("identity must not be null".into())),
        }
    }

    fn finish<T>(result: Result<T, TransactionError<Error>>) -> Result<T, Error> {
        match result {
            Ok(value) => Ok(value),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    fn decode_seq(bytes: &[u8]) -> Result<u64, Error> {
        let buf: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::InvalidData("corrupt row sequence".into()))?;
        Ok(u64::from_be_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, name: &str) -> BTreeMap<String, Value> {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), Value::Int64(id));
        fields.insert("name".to_string(), Value::from(name));
        fields
    }

    #[test]
    fn test_put_get_remove() {
        let engine = StorageEngine::open(StorageConfig::temporary()).unwrap();

        engine.put("Employee", &Value::Int64(1), &row(1, "Nam")).unwrap();
        let fetched = engine.get("Employee", &Value::Int32(1)).unwrap().unwrap();
        assert_eq!(fetched.get("name"), Some(&Value::from("Nam")));

        assert!(engine.get("Phone", &Value::Int64(1)).unwrap().is_none());

        assert!(engine.remove("Employee", &Value::Int64(1)).unwrap());
        assert!(!engine.remove("Employee", &Value::Int64(1)).unwrap());
        assert!(engine.get("Employee", &Value::Int64(1)).unwrap().is_none());
    }

    #[test]
    fn test_scan_keeps_insertion_order() {
        let engine = StorageEngine::open(StorageConfig::temporary()).unwrap();

        engine.put("Employee", &Value::Int64(3), &row(3, "Hang")).unwrap();
        engine.put("Employee", &Value::Int64(1), &row(1, "Nam")).unwrap();
        engine.put("Employee", &Value::Int64(2), &row(2, "Minh")).unwrap();
        // Rewrites keep their original position.
        engine.put("Employee", &Value::Int64(3), &row(3, "Hang2")).unwrap();

        let names: Vec<Value> = engine
            .scan("Employee")
            .unwrap()
            .map(|r| r.unwrap().remove("name").unwrap())
            .collect();
        assert_eq!(
            names,
            vec![Value::from("Hang2"), Value::from("Nam"), Value::from("Minh")]
        );
        assert_eq!(engine.count("Employee").unwrap(), 3);
    }

    #[test]
    fn test_null_identity_rejected() {
        let engine = StorageEngine::open(StorageConfig::temporary()).unwrap();
        let result = engine.put("Employee", &Value::Null, &BTreeMap::new());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_failed_put_writes_nothing() {
        let engine = StorageEngine::open(StorageConfig::temporary()).unwrap();
        let id_key = StorageEngine::identity_key(&Value::Int64(1)).unwrap();
        engine
            .db()
            .open_tree("index:Employee")
            .unwrap()
            .insert(id_key, &b"bad"[..])
            .unwrap();

        let result = engine.put("Employee", &Value::Int64(1), &row(1, "Nam"));
        assert!(matches!(result, Err(Error::InvalidData(_))));
        assert_eq!(engine.count("Employee").unwrap(), 0);
    }

    #[test]
    fn test_remove_clears_index() {
        let engine = StorageEngine::open(StorageConfig::temporary()).unwrap();
        engine.put("Employee", &Value::Int64(1), &row(1, "Nam")).unwrap();
        assert!(engine.remove("Employee", &Value::Int64(1)).unwrap());
        assert_eq!(engine.count("Employee").unwrap(), 0);

        // A fresh insert gets a new position at the end.
        engine.put("Employee", &Value::Int64(2), &row(2, "Minh")).unwrap();
        engine.put("Employee", &Value::Int64(1), &row(1, "Nam")).unwrap();
        let names: Vec<Value> = engine
            .scan("Employee")
            .unwrap()
            .map(|r| r.unwrap().remove("name").unwrap())
            .collect();
        assert_eq!(names, vec![Value::from("Minh"), Value::from("Nam")]);
    }

    #[test]
    fn test_reopen_persists_rows() {
        let dir = tempfile::tempdir().unwrap();

        {
            let engine = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
            engine.put("Employee", &Value::Int64(1), &row(1, "Nam")).unwrap();
            engine.flush().unwrap();
        }

        let engine = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
        assert!(engine.get("Employee", &Value::Int64(1)).unwrap().is_some());
    }
}
