use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Coarse authorization tag carried by an account and its tokens.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// JWT payload for a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaim {
    #[serde(rename = "sub")]
    pub subject_id: u64, // user ID
    pub email: String,
    pub role: Role,
    #[serde(rename = "iat")]
    pub issued_at: i64, // unix seconds
    #[serde(rename = "exp")]
    pub expires_at: i64, // unix seconds
    pub iss: String,
    pub aud: String,
}

impl SessionClaim {
    pub fn issued_at_time(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.issued_at).ok()
    }

    pub fn expires_at_time(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.expires_at).ok()
    }
}
