//! Key-value realization of [`ClientStore`].
//!
//! One ordered table per user keyed by `client_id`, with two secondary
//! indexes standing in for the email and name lookup paths. All mutation
//! happens under a single write lock, which makes the insert and update
//! paths conditional: the uniqueness decision and the write are one atomic
//! step, so the advisory pre-check can never be the only line of defense.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ClientStore, Cursor, Page, StoreError, UniqueField};
use crate::models::{ClientFields, ClientRecord};

#[derive(Default)]
struct UserTable {
    /// Records ordered by `client_id`, the stable pagination key.
    records: BTreeMap<String, ClientRecord>,
    /// email -> client_id
    email_index: HashMap<String, String>,
    /// client_name -> client_id
    name_index: HashMap<String, String>,
}

impl UserTable {
    fn index_of(&self, field: UniqueField) -> &HashMap<String, String> {
        match field {
            UniqueField::Email => &self.email_index,
            UniqueField::ClientName => &self.name_index,
        }
    }

    /// Duplicate check against one secondary index, with the update-path
    /// exclusion of the record being written.
    fn has_duplicate(&self, field: UniqueField, value: &str, exclude: Option<&str>) -> bool {
        match self.index_of(field).get(value) {
            Some(owner) => exclude != Some(owner.as_str()),
            None => false,
        }
    }

    fn reindex(&mut self, old: Option<&ClientRecord>, new: &ClientRecord) {
        if let Some(old) = old {
            self.name_index.remove(&old.client_name);
            if let Some(email) = &old.email {
                self.email_index.remove(email);
            }
        }
        self.name_index
            .insert(new.client_name.clone(), new.client_id.clone());
        if let Some(email) = &new.email {
            self.email_index
                .insert(email.clone(), new.client_id.clone());
        }
    }
}

/// In-process key-value store, one table of records per owning user.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, UserTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn put(&self, record: ClientRecord) -> Result<ClientRecord, StoreError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(record.user_id.clone()).or_default();

        if let Some(email) = &record.email {
            if table.has_duplicate(UniqueField::Email, email, None) {
                return Err(StoreError::Duplicate {
                    field: UniqueField::Email,
                });
            }
        }
        if table.has_duplicate(UniqueField::ClientName, &record.client_name, None) {
            return Err(StoreError::Duplicate {
                field: UniqueField::ClientName,
            });
        }

        table.reindex(None, &record);
        table.records.insert(record.client_id.clone(), record.clone());
        debug!(client_id = %record.client_id, "stored client record");
        Ok(record)
    }

    async fn get(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<ClientRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(user_id)
            .and_then(|table| table.records.get(client_id))
            .cloned())
    }

    async fn query(
        &self,
        user_id: &str,
        cursor: Option<&Cursor>,
        page_size: u32,
    ) -> Result<Page, StoreError> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(user_id) else {
            return Ok(Page {
                records: Vec::new(),
                next: None,
            });
        };

        let start = match cursor {
            None => Bound::Unbounded,
            Some(Cursor::LastKey { client_id }) => Bound::Excluded(client_id.clone()),
            Some(Cursor::Offset { .. }) => return Err(StoreError::BadCursor),
        };

        let page_size = page_size as usize;
        let mut records: Vec<ClientRecord> = table
            .records
            .range((start, Bound::Unbounded))
            .take(page_size + 1)
            .map(|(_, record)| record.clone())
            .collect();

        let next = if records.len() > page_size {
            records.truncate(page_size);
            records.last().map(|last| Cursor::LastKey {
                client_id: last.client_id.clone(),
            })
        } else {
            None
        };

        Ok(Page { records, next })
    }

    async fn conditional_update(
        &self,
        user_id: &str,
        client_id: &str,
        patch: &ClientFields,
        updated_at: DateTime<Utc>,
    ) -> Result<ClientRecord, StoreError> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(user_id).ok_or(StoreError::NotFound)?;

        let old = table
            .records
            .get(client_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        // Constraint enforcement happens here, under the write lock; the
        // service's earlier pre-check is advisory only.
        if let Some(name) = &patch.client_name {
            if table.has_duplicate(UniqueField::ClientName, name, Some(client_id)) {
                return Err(StoreError::Duplicate {
                    field: UniqueField::ClientName,
                });
            }
        }
        if let Some(email) = &patch.email {
            if table.has_duplicate(UniqueField::Email, email, Some(client_id)) {
                return Err(StoreError::Duplicate {
                    field: UniqueField::Email,
                });
            }
        }

        let mut updated = old.clone();
        updated.apply(patch, updated_at);
        table.reindex(Some(&old), &updated);
        table
            .records
            .insert(updated.client_id.clone(), updated.clone());
        Ok(updated)
    }

    async fn find_duplicate(
        &self,
        user_id: &str,
        field: UniqueField,
        value: &str,
        exclude_client_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(user_id)
            .is_some_and(|table| table.has_duplicate(field, value, exclude_client_id)))
    }
}
