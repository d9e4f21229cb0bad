//! Persistence boundary for client records.
//!
//! The service and pagination code are written once against [`ClientStore`];
//! the two physical realizations are a key-value table with secondary indexes
//! ([`MemoryStore`]) and a relational table with unique constraints
//! ([`PostgresStore`]). Both return the same error taxonomy; only the cursor
//! representation differs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ClientFields, ClientRecord};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// The two per-user unique fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    ClientName,
}

impl UniqueField {
    /// Wire name, as it appears in payloads and conflict responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::ClientName => "clientName",
        }
    }

    /// Name used in human-readable conflict messages.
    pub fn human_name(&self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::ClientName => "client name",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A backend unique constraint rejected the write.
    #[error("duplicate {}", field.as_str())]
    Duplicate { field: UniqueField },

    /// The target record does not exist for this user.
    #[error("record not found")]
    NotFound,

    /// The cursor decoded cleanly but was produced by the other backend.
    #[error("cursor not usable with this backend")]
    BadCursor,

    #[error("database failure")]
    Database(#[from] sqlx::Error),

    /// Backend returned something we could not interpret.
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// Continuation token contents. A sum over the two backend-native encodings;
/// callers only ever see the base64 form produced by [`crate::pagination`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cursor {
    /// Last-seen composite key, key-value backend.
    LastKey { client_id: String },
    /// Row offset, relational backend.
    Offset { offset: u64 },
}

/// One page of query results. `next` is absent on the final page.
#[derive(Debug, Clone)]
pub struct Page {
    pub records: Vec<ClientRecord>,
    pub next: Option<Cursor>,
}

/// Capability surface over the backing store.
///
/// `conditional_update` must never insert: an absent target is `NotFound`.
/// `put` and `conditional_update` are the authoritative uniqueness guarantee;
/// [`ClientStore::find_duplicate`] is the advisory pre-check that lets the
/// service answer with a friendly conflict before attempting the write.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Inserts a new record. Fails with [`StoreError::Duplicate`] when a
    /// unique constraint rejects it.
    async fn put(&self, record: ClientRecord) -> Result<ClientRecord, StoreError>;

    /// Fetches by composite key. `None` covers both true absence and a
    /// record owned by a different user.
    async fn get(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<ClientRecord>, StoreError>;

    /// Lists one page of the user's records in ascending `client_id` order.
    /// Resuming from the returned cursor yields no duplicates and no gaps
    /// under a static data set.
    async fn query(
        &self,
        user_id: &str,
        cursor: Option<&Cursor>,
        page_size: u32,
    ) -> Result<Page, StoreError>;

    /// Applies a partial patch to an existing record, refreshing
    /// `updated_at`. Fails with [`StoreError::NotFound`] if the record does
    /// not already exist.
    async fn conditional_update(
        &self,
        user_id: &str,
        client_id: &str,
        patch: &ClientFields,
        updated_at: DateTime<Utc>,
    ) -> Result<ClientRecord, StoreError>;

    /// Advisory duplicate check against the secondary lookup path for
    /// `field`. A match on `exclude_client_id` does not count.
    async fn find_duplicate(
        &self,
        user_id: &str,
        field: UniqueField,
        value: &str,
        exclude_client_id: Option<&str>,
    ) -> Result<bool, StoreError>;
}
