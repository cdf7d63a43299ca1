//! Record type for stored rows.

use crate::error::Error;
use pathquery_proto::Value;
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// A stored row with metadata.
///
/// The envelope is framed with rkyv; `data` holds the row's field map as
/// JSON, since [`Value`] nests arrays and documents.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Record {
    /// Serialized field map.
    pub data: Vec<u8>,

    /// Write timestamp in microseconds since Unix epoch.
    pub written_at: u64,
}

impl Record {
    /// Create a new record with the current timestamp.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            written_at: current_timestamp(),
        }
    }

    /// Encode a field map into a record.
    pub fn from_fields(fields: &BTreeMap<String, Value>) -> Result<Self, Error> {
        let data = serde_json::to_vec(fields).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self::new(data))
    }

    /// Decode the field map.
    pub fn fields(&self) -> Result<BTreeMap<String, Value>, Error> {
        serde_json::from_slice(&self.data).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
