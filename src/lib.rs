//! Per-user client directory service.
//!
//! The core pipeline: payload validation, per-user uniqueness enforcement,
//! a backend-agnostic storage adapter, and cursor-based pagination, composed
//! by [`ClientService`]. Transport, middleware and identity verification are
//! external collaborators; they feed an opaque `userId` and a parsed JSON
//! body in, and map [`ApiError`] onto responses on the way out.

pub mod config;
pub mod error;
pub mod models;
pub mod pagination;
pub mod service;
pub mod store;
pub mod validation;

pub use config::{Config, StorageBackend};
pub use error::{ApiError, FieldError};
pub use models::{ClientFields, ClientRecord};
pub use service::{ClientListing, ClientPage, ClientService, require_user};
pub use store::{ClientStore, Cursor, MemoryStore, Page, PostgresStore, StoreError, UniqueField};
