//! The client service: composes validation, the duplicate guard, storage and
//! pagination into the four public operations.
//!
//! Each call is request-scoped and stateless; the only shared state is the
//! store handle. The duplicate pre-checks are advisory (friendly 409 before
//! the write); the store's own constraints are the real guarantee, so a
//! racing pair of creates still cannot both land.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{ClientFields, ClientRecord};
use crate::pagination::{self, MAX_LIMIT, PageRequest};
use crate::store::{ClientStore, Cursor, StoreError, UniqueField};
use crate::validation::{self, Mode};

/// One page of a listing, with the continuation token already encoded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPage {
    pub clients: Vec<ClientRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Every record a user owns, gathered by walking all pages.
#[derive(Debug, Clone, Serialize)]
pub struct ClientListing {
    pub clients: Vec<ClientRecord>,
    pub count: usize,
}

/// Resolves the authenticated caller identity handed over by the transport's
/// authorizer. The identity is an opaque string; we never derive it
/// ourselves. An override (local development) takes precedence over the
/// claim.
pub fn require_user<'a>(
    claim: Option<&'a str>,
    override_user: Option<&'a str>,
) -> Result<&'a str, ApiError> {
    override_user
        .or(claim)
        .filter(|user| !user.is_empty())
        .ok_or(ApiError::Unauthorized)
}

pub struct ClientService<S> {
    store: S,
}

impl<S: ClientStore> ClientService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a record from a raw payload. Validation failures short-circuit
    /// before any store access; a duplicate short-circuits before the put.
    pub async fn create(&self, user_id: &str, payload: &Value) -> Result<ClientRecord, ApiError> {
        let fields = validation::validate(payload, Mode::Create).map_err(ApiError::Validation)?;
        let client_name = fields
            .client_name
            .clone()
            .ok_or_else(|| ApiError::single_field("clientName", "is required"))?;

        self.guard_duplicates(user_id, Some(client_name.as_str()), fields.email.as_deref(), None)
            .await?;

        let now = Utc::now();
        let record = ClientRecord {
            client_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            client_name,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            vat_number: fields.vat_number,
            currency_preference: fields.currency_preference.unwrap_or_else(|| "USD".to_string()),
            created_at: now,
            updated_at: now,
        };

        debug!(client_id = %record.client_id, "creating client");
        // The store's constraint is authoritative; a race that slipped past
        // the pre-check surfaces here as the same conflict.
        Ok(self.store.put(record).await?)
    }

    /// Fetches one record by id. A record owned by someone else reads the
    /// same as one that does not exist.
    pub async fn get_by_id(
        &self,
        user_id: &str,
        client_id: Option<&str>,
    ) -> Result<ClientRecord, ApiError> {
        let client_id = require_client_id(client_id)?;
        self.store
            .get(user_id, client_id)
            .await?
            .ok_or_else(|| not_found(client_id))
    }

    /// Lists one page of the user's records.
    pub async fn list(
        &self,
        user_id: &str,
        limit: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<ClientPage, ApiError> {
        let request = PageRequest::parse(limit, cursor)?;
        let page = self
            .store
            .query(user_id, request.cursor.as_ref(), request.limit)
            .await?;
        let next_cursor = page
            .next
            .as_ref()
            .map(pagination::encode_cursor)
            .transpose()
            .map_err(ApiError::Storage)?;
        Ok(ClientPage {
            clients: page.records,
            next_cursor,
        })
    }

    /// Gathers every record the user owns by walking pages to exhaustion.
    /// The store is never asked for an unbounded result set.
    pub async fn list_all(&self, user_id: &str) -> Result<ClientListing, ApiError> {
        let mut clients = Vec::new();
        let mut cursor: Option<Cursor> = None;
        loop {
            let page = self.store.query(user_id, cursor.as_ref(), MAX_LIMIT).await?;
            clients.extend(page.records);
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        let count = clients.len();
        Ok(ClientListing { clients, count })
    }

    /// Applies a partial patch to an existing record. A missing target is
    /// not-found, never a silent insert.
    pub async fn update(
        &self,
        user_id: &str,
        client_id: Option<&str>,
        payload: &Value,
    ) -> Result<ClientRecord, ApiError> {
        let client_id = require_client_id(client_id)?;
        let patch = validation::validate(payload, Mode::Update).map_err(ApiError::Validation)?;

        self.guard_duplicates(
            user_id,
            patch.client_name.as_deref(),
            patch.email.as_deref(),
            Some(client_id),
        )
        .await?;

        debug!(client_id = %client_id, "updating client");
        self.apply_update(user_id, client_id, &patch).await
    }

    async fn apply_update(
        &self,
        user_id: &str,
        client_id: &str,
        patch: &ClientFields,
    ) -> Result<ClientRecord, ApiError> {
        self.store
            .conditional_update(user_id, client_id, patch, Utc::now())
            .await
            .map_err(|err| match err {
                StoreError::NotFound => not_found(client_id),
                other => other.into(),
            })
    }

    /// Advisory duplicate pre-check. The two lookups are independent, so
    /// they fan out concurrently and join before we proceed. Email is
    /// reported first when both collide.
    async fn guard_duplicates(
        &self,
        user_id: &str,
        client_name: Option<&str>,
        email: Option<&str>,
        exclude_client_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let email_check = async {
            match email {
                Some(value) => {
                    self.store
                        .find_duplicate(user_id, UniqueField::Email, value, exclude_client_id)
                        .await
                }
                None => Ok(false),
            }
        };
        let name_check = async {
            match client_name {
                Some(value) => {
                    self.store
                        .find_duplicate(user_id, UniqueField::ClientName, value, exclude_client_id)
                        .await
                }
                None => Ok(false),
            }
        };

        let (email_taken, name_taken) = tokio::try_join!(email_check, name_check)?;
        if email_taken {
            warn!(user_id, "duplicate email rejected");
            return Err(ApiError::conflict(UniqueField::Email));
        }
        if name_taken {
            warn!(user_id, "duplicate client name rejected");
            return Err(ApiError::conflict(UniqueField::ClientName));
        }
        Ok(())
    }
}

fn require_client_id(client_id: Option<&str>) -> Result<&str, ApiError> {
    client_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::single_field("clientId", "is required"))
}

fn not_found(client_id: &str) -> ApiError {
    ApiError::NotFound(format!("client with id {client_id} not found"))
}
