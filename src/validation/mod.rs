//! Payload validation for client records.
//!
//! Operates on an already-parsed JSON body (body parsing is the transport's
//! job) and collects every field error in a single pass, so a caller gets the
//! full picture in one round trip.

use serde_json::Value;

use crate::error::FieldError;
use crate::models::ClientFields;

/// Whether a payload is a full create body or a partial update patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// Fields the service assigns itself; their presence in any payload is an
/// error rather than something to silently drop.
const SERVICE_OWNED: [&str; 4] = ["clientId", "userId", "createdAt", "updatedAt"];

const MAX_NAME: usize = 100;
const MAX_EMAIL: usize = 100;
const MIN_PHONE: usize = 10;
const MAX_PHONE: usize = 30;
const MAX_ADDRESS: usize = 255;
const MAX_VAT: usize = 100;

/// Checks a raw payload against the client schema.
///
/// Create mode requires `clientName`; update mode treats every field as
/// optional but validates whatever is present with the same rules, and
/// rejects a patch that carries nothing to write. Empty-string `email` and
/// `phone` are coerced to absent.
pub fn validate(payload: &Value, mode: Mode) -> Result<ClientFields, Vec<FieldError>> {
    let Some(object) = payload.as_object() else {
        return Err(vec![FieldError::new("body", "must be a JSON object")]);
    };

    let mut errors = Vec::new();
    let mut fields = ClientFields::default();

    for name in SERVICE_OWNED {
        if object.contains_key(name) {
            errors.push(FieldError::new(name, "is read-only"));
        }
    }

    match string_field(object, "clientName", &mut errors) {
        Some(name) if name.is_empty() => {
            errors.push(FieldError::new("clientName", "must not be empty"));
        }
        Some(name) if name.chars().count() > MAX_NAME => {
            errors.push(FieldError::new(
                "clientName",
                "must be at most 100 characters",
            ));
        }
        Some(name) => fields.client_name = Some(name),
        None => {
            // A wrong-typed name already produced a type error above.
            let wrong_type = matches!(object.get("clientName"), Some(v) if !v.is_null());
            if mode == Mode::Create && !wrong_type {
                errors.push(FieldError::new("clientName", "is required"));
            }
        }
    }

    if let Some(email) = string_field(object, "email", &mut errors) {
        // Empty string means "no email", never a stored value.
        if !email.is_empty() {
            if email.chars().count() > MAX_EMAIL {
                errors.push(FieldError::new("email", "must be at most 100 characters"));
            } else if !is_valid_email(&email) {
                errors.push(FieldError::new("email", "must be a valid email address"));
            } else {
                fields.email = Some(email);
            }
        }
    }

    if let Some(phone) = string_field(object, "phone", &mut errors) {
        if !phone.is_empty() {
            let len = phone.chars().count();
            if !(MIN_PHONE..=MAX_PHONE).contains(&len) {
                errors.push(FieldError::new(
                    "phone",
                    "must be between 10 and 30 characters",
                ));
            } else {
                fields.phone = Some(phone);
            }
        }
    }

    if let Some(address) = string_field(object, "address", &mut errors) {
        if address.chars().count() > MAX_ADDRESS {
            errors.push(FieldError::new(
                "address",
                "must be at most 255 characters",
            ));
        } else {
            fields.address = Some(address);
        }
    }

    if let Some(vat) = string_field(object, "VATNumber", &mut errors) {
        if vat.chars().count() > MAX_VAT {
            errors.push(FieldError::new(
                "VATNumber",
                "must be at most 100 characters",
            ));
        } else {
            fields.vat_number = Some(vat);
        }
    }

    if let Some(currency) = string_field(object, "currencyPreference", &mut errors) {
        if currency.is_empty() {
            errors.push(FieldError::new("currencyPreference", "must not be empty"));
        } else {
            fields.currency_preference = Some(currency);
        }
    }

    if mode == Mode::Create && fields.currency_preference.is_none() {
        fields.currency_preference = Some("USD".to_string());
    }

    if mode == Mode::Update && errors.is_empty() && fields.is_empty() {
        errors.push(FieldError::new("body", "no updatable fields provided"));
    }

    if errors.is_empty() { Ok(fields) } else { Err(errors) }
}

/// Pulls a string-typed field out of the object, recording a type error for
/// non-string, non-null values. Absent and `null` both read as absent.
fn string_field(
    object: &serde_json::Map<String, Value>,
    name: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match object.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new(name, "must be a string"));
            None
        }
    }
}

/// Loose syntactic email check: one `@`, non-empty local part, and a domain
/// with at least one dot and no leading/trailing dot.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_accepts_a_full_payload() {
        let payload = json!({
            "clientName": "Acme",
            "email": "billing@acme.io",
            "phone": "0123456789",
            "address": "1 Main St",
            "VATNumber": "GB123456789",
        });
        let fields = validate(&payload, Mode::Create).unwrap();
        assert_eq!(fields.client_name.as_deref(), Some("Acme"));
        assert_eq!(fields.email.as_deref(), Some("billing@acme.io"));
        assert_eq!(fields.currency_preference.as_deref(), Some("USD"));
    }

    #[test]
    fn create_requires_client_name() {
        let errors = validate(&json!({"email": "a@x.com"}), Mode::Create).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "clientName");
        assert_eq!(errors[0].message, "is required");

        // Explicit null reads as absent.
        let errors = validate(&json!({"clientName": null}), Mode::Create).unwrap_err();
        assert_eq!(errors[0].field, "clientName");
    }

    #[test]
    fn errors_accumulate_across_fields() {
        let payload = json!({
            "clientName": "",
            "email": "not-an-email",
            "phone": "123",
        });
        let errors = validate(&payload, Mode::Create).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["clientName", "email", "phone"]);
    }

    #[test]
    fn service_owned_fields_are_rejected() {
        let payload = json!({
            "clientName": "Acme",
            "clientId": "abc",
            "userId": "u1",
        });
        let errors = validate(&payload, Mode::Create).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"clientId"));
        assert!(fields.contains(&"userId"));
    }

    #[test]
    fn empty_email_and_phone_coerce_to_absent() {
        let payload = json!({"clientName": "Acme", "email": "", "phone": ""});
        let fields = validate(&payload, Mode::Create).unwrap();
        assert_eq!(fields.email, None);
        assert_eq!(fields.phone, None);
    }

    #[test]
    fn update_allows_partial_patch() {
        let fields = validate(&json!({"phone": "0123456789"}), Mode::Update).unwrap();
        assert_eq!(fields.phone.as_deref(), Some("0123456789"));
        assert_eq!(fields.client_name, None);
        // No implicit currency default on update.
        assert_eq!(fields.currency_preference, None);
    }

    #[test]
    fn update_rejects_an_empty_patch() {
        let errors = validate(&json!({}), Mode::Update).unwrap_err();
        assert_eq!(errors[0].field, "body");
    }

    #[test]
    fn update_still_validates_present_fields() {
        let errors = validate(&json!({"phone": "123456789"}), Mode::Update).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "phone");
    }

    #[test]
    fn non_string_values_are_type_errors() {
        let payload = json!({"clientName": 42, "email": ["x"]});
        let errors = validate(&payload, Mode::Create).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["clientName", "email"]);
    }

    #[test]
    fn non_object_body_is_a_single_error() {
        let errors = validate(&json!("hello"), Mode::Create).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "body");
    }

    #[test]
    fn email_syntax_is_checked_loosely() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.co"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@.com"));
    }
}
