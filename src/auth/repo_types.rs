use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::claims::Role;

/// Stored user record. Only the store and the password check see this type;
/// convert to `PublicUser` before it goes anywhere else.
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,                      // assigned by the store, never reused
    pub email: String,                // unique, immutable
    pub username: String,             // unique
    pub password_hash: String,        // Argon2 PHC string
    pub full_name: String,
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// User as handed to anything outside the store: no credential field at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: u64,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            username: u.username.clone(),
            full_name: u.full_name.clone(),
            role: u.role,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            full_name: u.full_name,
            role: u.role,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Input for inserting a user; the secret is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Option<Role>,
}

/// Partial profile change. `None` leaves the field alone; `Some("")` is a
/// real value.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total_users: usize,
    pub users_by_role: BTreeMap<Role, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn public_view_carries_no_credential() {
        let user = User {
            id: 1,
            email: "a@x.com".into(),
            username: "alice".into(),
            password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".into(),
            full_name: "Alice".into(),
            role: Role::User,
            created_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: datetime!(2024-01-01 00:00 UTC),
        };
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        let fields: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            fields.len(),
            7,
            "unexpected public fields: {fields:?}"
        );
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
        assert_eq!(PublicUser::from(user).username, "alice");
    }
}
