//! Request and response types for account operations.

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::store::UserRecord;

/// A registered user as exposed to clients. Never carries the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserRecord> for User {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Accept any scalar as text; `null` counts as absent. Arrays and objects are rejected.
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(Value::Bool(value)) => Ok(Some(value.to_string())),
        Some(Value::Array(_) | Value::Object(_)) => {
            Err(D::Error::custom("expected a string, number or boolean"))
        }
    }
}

/// Login input. Every field is optional so absence surfaces as a validation message.
#[derive(ToSchema, IntoParams, Serialize, Deserialize, Default, Clone)]
#[into_params(parameter_in = Query)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "scalar")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub password: Option<String>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(ToSchema, IntoParams, Serialize, Deserialize, Default, Clone)]
#[into_params(parameter_in = Query)]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub password_confirmation: Option<String>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field(
                "password_confirmation",
                &self.password_confirmation.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

/// Freshly issued bearer token plus the user it authenticates.
#[derive(ToSchema, Serialize, Deserialize, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"***")
            .field("user", &self.user)
            .finish()
    }
}

/// Authenticated caller, resolved from a bearer token.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user: User,
    /// Identifier of the presented token; `logout` revokes exactly this one.
    pub token_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    fn record() -> UserRecord {
        UserRecord {
            id: Uuid::nil(),
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn user_json_never_contains_password_hash() -> Result<()> {
        let user = User::from(&record());
        let value = serde_json::to_value(&user)?;
        let object = value.as_object().context("user is not an object")?;

        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("password_hash"));
        assert!(!value.to_string().contains("argon2"));
        assert_eq!(object.get("email"), Some(&serde_json::json!("ann@x.com")));
        Ok(())
    }

    #[test]
    fn scalar_fields_are_read_as_text() -> Result<()> {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "name": "Ann",
            "email": null,
            "password": 123456,
            "password_confirmation": true,
        }))?;

        assert_eq!(request.name.as_deref(), Some("Ann"));
        assert_eq!(request.email, None);
        assert_eq!(request.password.as_deref(), Some("123456"));
        assert_eq!(request.password_confirmation.as_deref(), Some("true"));
        Ok(())
    }

    #[test]
    fn nested_field_values_are_rejected() {
        let result = serde_json::from_value::<LoginRequest>(serde_json::json!({
            "email": ["ann@x.com"],
        }));
        assert!(result.is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let login = LoginRequest {
            email: Some("ann@x.com".to_string()),
            password: Some("secret1".to_string()),
        };
        let printed = format!("{login:?}");
        assert!(printed.contains("ann@x.com"));
        assert!(!printed.contains("secret1"));

        let session = Session {
            token: "raw-token".to_string(),
            user: User::from(record()),
        };
        assert!(!format!("{session:?}").contains("raw-token"));
    }
}
