use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A client record as stored and returned to callers.
///
/// Wire names follow the public API shape (`clientId`, `VATNumber`, ...);
/// column names follow the relational schema via the snake_case field idents.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub client_id: String,
    pub user_id: String,
    pub client_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "VATNumber", skip_serializing_if = "Option::is_none")]
    pub vat_number: Option<String>,
    pub currency_preference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientRecord {
    /// Applies a partial patch, leaving absent fields untouched and
    /// refreshing `updated_at`. `client_id`, `user_id` and `created_at`
    /// are not reachable from a patch.
    pub fn apply(&mut self, patch: &ClientFields, updated_at: DateTime<Utc>) {
        if let Some(name) = &patch.client_name {
            self.client_name = name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(address) = &patch.address {
            self.address = Some(address.clone());
        }
        if let Some(vat) = &patch.vat_number {
            self.vat_number = Some(vat.clone());
        }
        if let Some(currency) = &patch.currency_preference {
            self.currency_preference = currency.clone();
        }
        self.updated_at = updated_at;
    }
}

/// The caller-editable subset of a client record, as produced by the
/// validator. In create mode `client_name` is guaranteed present; in update
/// mode every field is optional and `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientFields {
    pub client_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub vat_number: Option<String>,
    pub currency_preference: Option<String>,
}

impl ClientFields {
    /// True when the patch carries nothing to write.
    pub fn is_empty(&self) -> bool {
        self.client_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.vat_number.is_none()
            && self.currency_preference.is_none()
    }
}
