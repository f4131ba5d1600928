use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::role::{de_opt_role, Role};
use crate::error::{AppResult, ClassifiedError};

/// Resolved identity of the logged-in user. Unknown server fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "display_name", alias = "full_name")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "de_opt_role")]
    pub role: Option<Role>,
    #[serde(default, alias = "isDemo", alias = "demo")]
    pub is_demo: bool,
}

/// Server-confirmed partial update of the current user (profile edits).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPatch {
    #[serde(default, alias = "display_name", alias = "full_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "de_opt_role")]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_demo: Option<bool>,
}

/// Login payload for `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new<S: Into<String>>(username: S, password: S) -> Self {
        LoginRequest { username: username.into(), password: password.into() }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("username", &self.username).field("password", &"<redacted>").finish()
    }
}

impl User {
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name { self.name = name; }
        if let Some(email) = patch.email { self.email = Some(email); }
        if let Some(role) = patch.role { self.role = Some(role); }
        if let Some(demo) = patch.is_demo { self.is_demo = demo; }
    }

    /// A user marked demo by the server, or carrying the demo role.
    pub fn is_demo_account(&self) -> bool {
        self.is_demo || self.role == Some(Role::GuestDemo)
    }

    /// Pull a user out of an auth endpoint payload: either `{ "user": {...} }` or the
    /// user object itself.
    pub fn from_payload(payload: Value) -> AppResult<User> {
        let candidate = match payload {
            Value::Object(mut map) if map.contains_key("user") => map.remove("user").unwrap_or(Value::Null),
            other => other,
        };
        serde_json::from_value(candidate)
            .map_err(|e| ClassifiedError::unknown(None, format!("malformed user payload: {}", e)))
    }
}

// Ids arrive as numbers from some endpoints and strings from others.
fn de_id<'de, D>(de: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid user id: {}", other))),
    }
}
