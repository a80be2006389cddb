//! Binary attachments addressed by their own URI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// URI prefix of stored blobs
pub const BLOB_URI_TYPE: &str = "blob-sql";

/// Binary attachment, optionally owned by a parent node
///
/// Orphan blobs (no `parent_uri`) are permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub id: Option<i64>,
    pub uri: String,
    pub parent_uri: Option<String>,
    pub mimetype: String,
    pub filename: String,
    pub size: u64,
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Blob {
    pub fn new(uri: String) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            uri,
            parent_uri: None,
            mimetype: String::new(),
            filename: String::new(),
            size: 0,
            data: None,
            created: now,
            modified: now,
        }
    }

    /// Stored bytes, `None` for a blob that was never written
    pub fn read(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Replace the stored bytes
    pub fn write(&mut self, data: Vec<u8>) {
        self.size = data.len() as u64;
        self.data = Some(data);
        self.modified = Utc::now();
    }

    pub fn info(&self) -> Value {
        json!({
            "__uri__": self.uri,
            "__parent__": self.parent_uri,
            "filename": self.filename,
            "mimetype": self.mimetype,
            "size": self.size,
        })
    }
}
