//! Relational realization of [`ClientStore`] over Postgres.
//!
//! Uniqueness is owned by the schema: `clients_user_name_key` and the
//! partial index `clients_user_email_key` (see `migrations/`). Writes map a
//! unique-violation back into [`StoreError::Duplicate`], so the service sees
//! the same taxonomy as with the key-value backend. The pagination cursor is
//! a plain row offset.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::{ClientStore, Cursor, Page, StoreError, UniqueField};
use crate::models::{ClientFields, ClientRecord};

const NAME_CONSTRAINT: &str = "clients_user_name_key";
const EMAIL_CONSTRAINT: &str = "clients_user_email_key";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects a small pool, as in the rest of our tooling.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translates a unique-constraint violation into the duplicate taxonomy;
/// everything else stays a database failure.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some("23505") {
            let field = match db_err.constraint() {
                Some(EMAIL_CONSTRAINT) => UniqueField::Email,
                Some(NAME_CONSTRAINT) => UniqueField::ClientName,
                // Unknown constraint on this table still means a duplicate;
                // name is the only remaining unique column.
                _ => UniqueField::ClientName,
            };
            return StoreError::Duplicate { field };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl ClientStore for PostgresStore {
    async fn put(&self, record: ClientRecord) -> Result<ClientRecord, StoreError> {
        let stored = sqlx::query_as::<_, ClientRecord>(
            r#"
            INSERT INTO clients
                (client_id, user_id, client_name, email, phone, address,
                 vat_number, currency_preference, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&record.client_id)
        .bind(&record.user_id)
        .bind(&record.client_name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.address)
        .bind(&record.vat_number)
        .bind(&record.currency_preference)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        debug!(client_id = %stored.client_id, "stored client record");
        Ok(stored)
    }

    async fn get(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Option<ClientRecord>, StoreError> {
        let record = sqlx::query_as::<_, ClientRecord>(
            "SELECT * FROM clients WHERE user_id = $1 AND client_id = $2",
        )
        .bind(user_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn query(
        &self,
        user_id: &str,
        cursor: Option<&Cursor>,
        page_size: u32,
    ) -> Result<Page, StoreError> {
        let offset = match cursor {
            None => 0,
            Some(Cursor::Offset { offset }) => *offset,
            Some(Cursor::LastKey { .. }) => return Err(StoreError::BadCursor),
        };

        // One extra row tells us whether another page exists.
        let mut records = sqlx::query_as::<_, ClientRecord>(
            r#"
            SELECT * FROM clients
            WHERE user_id = $1
            ORDER BY client_id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(i64::from(page_size) + 1)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        let page_size = page_size as usize;
        let next = if records.len() > page_size {
            records.truncate(page_size);
            Some(Cursor::Offset {
                offset: offset + page_size as u64,
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
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE clients SET updated_at = ");
        builder.push_bind(updated_at);
        if let Some(name) = &patch.client_name {
            builder.push(", client_name = ").push_bind(name);
        }
        if let Some(email) = &patch.email {
            builder.push(", email = ").push_bind(email);
        }
        if let Some(phone) = &patch.phone {
            builder.push(", phone = ").push_bind(phone);
        }
        if let Some(address) = &patch.address {
            builder.push(", address = ").push_bind(address);
        }
        if let Some(vat) = &patch.vat_number {
            builder.push(", vat_number = ").push_bind(vat);
        }
        if let Some(currency) = &patch.currency_preference {
            builder.push(", currency_preference = ").push_bind(currency);
        }
        builder.push(" WHERE user_id = ").push_bind(user_id);
        builder.push(" AND client_id = ").push_bind(client_id);
        builder.push(" RETURNING *");

        let updated = builder
            .build_query_as::<ClientRecord>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;

        updated.ok_or(StoreError::NotFound)
    }

    async fn find_duplicate(
        &self,
        user_id: &str,
        field: UniqueField,
        value: &str,
        exclude_client_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let column = match field {
            UniqueField::Email => "email",
            UniqueField::ClientName => "client_name",
        };
        let sql = format!(
            "SELECT EXISTS(
                 SELECT 1 FROM clients
                 WHERE user_id = $1 AND {column} = $2
                   AND ($3::text IS NULL OR client_id <> $3)
             )"
        );

        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(user_id)
            .bind(value)
            .bind(exclude_client_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
