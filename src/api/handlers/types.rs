//! Request/response types for the credential endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Missing fields are accepted here and rejected by the gateway so the
/// error body stays uniform. Non-empty scalars are taken as their text form.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct CredentialsRequest {
    #[serde(default, deserialize_with = "scalar_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub password: Option<String>,
}

/// Strings pass through, numbers and `true` become their text form. `null`,
/// `false`, zero, arrays and objects count as absent.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        Some(Value::Bool(true)) => Some("true".to_string()),
        _ => None,
    })
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub ok: bool,
    /// Provider session, forwarded verbatim.
    #[schema(value_type = Object)]
    pub session: Value,
    /// Provider user record, forwarded verbatim.
    #[schema(value_type = Object)]
    pub user: Value,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}
