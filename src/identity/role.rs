use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};

/// Closed set of roles a session can act as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    GuestDemo,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Admin, Role::Doctor, Role::Nurse, Role::Receptionist, Role::GuestDemo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Receptionist => "receptionist",
            Role::GuestDemo => "guest_demo",
        }
    }

    /// Parse a wire role name. Case-insensitive; accepts the short demo aliases
    /// some backends send.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "doctor" => Some(Role::Doctor),
            "nurse" => Some(Role::Nurse),
            "receptionist" => Some(Role::Receptionist),
            "guest_demo" | "guest" | "demo" => Some(Role::GuestDemo),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient role field: unknown or missing names deserialize to `None` instead of
/// failing the whole user payload.
pub(crate) fn de_opt_role<'de, D>(de: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.as_deref().and_then(Role::parse))
}
