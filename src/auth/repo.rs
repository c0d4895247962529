use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    auth::repo_types::{NewUser, PublicUser, User, UserStats, UserUpdate},
    clock::Clock,
    errors::{ConflictField, StoreError},
};

/// Authoritative set of user records.
///
/// `create` and `update` check uniqueness and write as one step; readers never
/// observe a half-applied write.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Email is checked before username; the first clash wins.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn get_by_id(&self, id: u64) -> Result<User, StoreError>;

    /// All users in insertion order.
    async fn list_all(&self) -> Vec<PublicUser>;

    /// Apply only the supplied fields. `updated_at` moves even when nothing
    /// else does.
    async fn update(&self, id: u64, changes: UserUpdate) -> Result<User, StoreError>;

    async fn stats(&self) -> UserStats;
}

struct Users {
    rows: Vec<User>,
    next_id: u64,
}

/// Process-local store guarded by a single reader/writer lock.
pub struct InMemoryUserStore {
    users: RwLock<Users>,
    clock: Arc<dyn Clock>,
}

impl InMemoryUserStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: RwLock::new(Users {
                rows: Vec::new(),
                next_id: 1,
            }),
            clock,
        }
    }

    /// A timestamp strictly after `prev`, even if the clock has not moved.
    fn bump(&self, prev: OffsetDateTime) -> OffsetDateTime {
        let now = self.clock.now();
        if now > prev {
            now
        } else {
            prev + Duration::nanoseconds(1)
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        if new_user.password_hash.is_empty() {
            return Err(StoreError::MissingCredential);
        }

        let mut users = self.users.write().await;
        for u in &users.rows {
            if u.email == new_user.email {
                return Err(StoreError::Conflict(ConflictField::Email));
            }
        }
        for u in &users.rows {
            if u.username == new_user.username {
                return Err(StoreError::Conflict(ConflictField::Username));
            }
        }

        let now = self.clock.now();
        let user = User {
            id: users.next_id,
            email: new_user.email,
            username: new_user.username,
            password_hash: new_user.password_hash,
            full_name: new_user.full_name,
            role: new_user.role.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        users.next_id += 1;
        users.rows.push(user.clone());
        debug!(user_id = user.id, "user inserted");
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let users = self.users.read().await;
        users
            .rows
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_id(&self, id: u64) -> Result<User, StoreError> {
        let users = self.users.read().await;
        users
            .rows
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_all(&self) -> Vec<PublicUser> {
        let users = self.users.read().await;
        users.rows.iter().map(PublicUser::from).collect()
    }

    async fn update(&self, id: u64, changes: UserUpdate) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let idx = users
            .rows
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(username) = &changes.username {
            let taken = users
                .rows
                .iter()
                .any(|u| u.id != id && &u.username == username);
            if taken {
                return Err(StoreError::Conflict(ConflictField::Username));
            }
        }

        let updated_at = self.bump(users.rows[idx].updated_at);
        let user = &mut users.rows[idx];
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        user.updated_at = updated_at;
        debug!(user_id = id, "user updated");
        Ok(user.clone())
    }

    async fn stats(&self) -> UserStats {
        let users = self.users.read().await;
        let mut users_by_role = BTreeMap::new();
        for u in &users.rows {
            *users_by_role.entry(u.role).or_insert(0) += 1;
        }
        UserStats {
            total_users: users.rows.len(),
            users_by_role,
        }
    }
}
