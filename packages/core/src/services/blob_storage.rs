//! Blob Storage
//!
//! Binary attachments stored next to the content tree. Blobs get their own
//! `blob-sql:` URIs and may be owned by a parent node.

use crate::db::NodeStore;
use crate::models::{Blob, Node, BLOB_URI_TYPE};
use crate::registry::UuidGenerator;
use crate::services::error::CmsError;
use chrono::Utc;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Descriptive attributes of an uploaded blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobMetadata {
    pub filename: String,
    pub mimetype: String,
}

impl BlobMetadata {
    pub fn new(filename: impl Into<String>, mimetype: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            mimetype: mimetype.into(),
        }
    }
}

/// Stores and retrieves blobs
#[derive(Clone)]
pub struct BlobStorage {
    store: Arc<dyn NodeStore>,
    uri_generator: UuidGenerator,
}

impl BlobStorage {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self {
            store,
            uri_generator: UuidGenerator::new(BLOB_URI_TYPE),
        }
    }

    /// Store the contents of `reader` as a new blob
    pub async fn add<R>(
        &self,
        reader: &mut R,
        parent: Option<&Node>,
        metadata: BlobMetadata,
    ) -> Result<Blob, CmsError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;

        let mut blob = self.new_blob(parent);
        blob.filename = metadata.filename;
        blob.mimetype = metadata.mimetype;
        blob.write(data);

        let blob = self.store.insert_blob(blob).await?;
        tracing::info!("Stored blob {} ({} bytes)", blob.uri, blob.size);
        Ok(blob)
    }

    /// Store an empty blob; `read()` returns `None` until it is written
    pub async fn create(&self, parent: Option<&Node>) -> Result<Blob, CmsError> {
        Ok(self.store.insert_blob(self.new_blob(parent)).await?)
    }

    pub async fn query(&self, uri: &str) -> Result<Option<Blob>, CmsError> {
        Ok(self.store.get_blob(uri).await?)
    }

    /// First blob owned by a node
    pub async fn get_by_parent(&self, parent_uri: &str) -> Result<Option<Blob>, CmsError> {
        Ok(self.store.get_blob_by_parent(parent_uri).await?)
    }

    /// Replace the data of a stored blob
    pub async fn replace(&self, uri: &str, data: Vec<u8>) -> Result<Blob, CmsError> {
        let mut blob = self
            .query(uri)
            .await?
            .ok_or_else(|| CmsError::not_found(uri))?;
        blob.write(data);
        self.store.update_blob(&blob).await?;
        Ok(blob)
    }

    /// Replace the filename and mimetype of a stored blob
    pub async fn update_metadata(&self, uri: &str, metadata: BlobMetadata) -> Result<Blob, CmsError> {
        let mut blob = self
            .query(uri)
            .await?
            .ok_or_else(|| CmsError::not_found(uri))?;
        blob.filename = metadata.filename;
        blob.mimetype = metadata.mimetype;
        blob.modified = Utc::now();
        self.store.update_blob(&blob).await?;
        Ok(blob)
    }

    pub async fn remove(&self, uri: &str) -> Result<bool, CmsError> {
        Ok(self.store.delete_blob(uri).await?)
    }

    fn new_blob(&self, parent: Option<&Node>) -> Blob {
        let mut blob = Blob::new(self.uri_generator.generate());
        blob.parent_uri = parent.map(|node| node.uri.clone());
        blob
    }
}
