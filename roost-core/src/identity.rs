use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role carried by the token issuer's `role` claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Guest,
    Host,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::Host => "HOST",
        }
    }
}

/// Authenticated principal attached to every inbound request.
///
/// Identity is owned by the external token issuer; the core trusts the
/// decoded claims and performs no authentication of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub profile_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn guest(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            role: Role::Guest,
        }
    }

    pub fn host(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            role: Role::Host,
        }
    }
}
