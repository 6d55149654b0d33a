//! User directory - the external persistent store of identities.
//!
//! The engine only ever creates users, looks them up by email, and flips the
//! verified flag; it never deletes. Email uniqueness is enforced by the store
//! itself (unique index), not re-checked here beyond the engine's pre-lookup.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::User;
use crate::services::ServiceError;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), ServiceError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;
    async fn set_verified(&self, id: Uuid, verified: bool) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, user: &User) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, is_verified, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_verified)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, is_verified, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn set_verified(&self, id: Uuid, verified: bool) -> Result<(), ServiceError> {
        let result = sqlx::query("UPDATE users SET is_verified = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(verified)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::UserNotFound);
        }

        Ok(())
    }
}

/// In-memory directory used by tests. Tracks `create` calls so tests can
/// assert that re-registration never inserts a second row.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: Mutex<HashMap<String, User>>,
    create_calls: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Seed a user directly, bypassing the create counter.
    pub fn seed(&self, user: User) {
        self.users
            .lock()
            .expect("directory lock poisoned")
            .insert(user.email.clone(), user);
    }

    pub fn get(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .expect("directory lock poisoned")
            .get(email)
            .cloned()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn create(&self, user: &User) -> Result<(), ServiceError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().expect("directory lock poisoned");
        if users.contains_key(&user.email) {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "unique constraint violation on users.email"
            )));
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .users
            .lock()
            .expect("directory lock poisoned")
            .get(email)
            .cloned())
    }

    async fn set_verified(&self, id: Uuid, verified: bool) -> Result<(), ServiceError> {
        let mut users = self.users.lock().expect("directory lock poisoned");
        let user = users
            .values_mut()
            .find(|u| u.id == id)
            .ok_or(ServiceError::UserNotFound)?;
        user.is_verified = verified;
        user.updated_at = chrono::Utc::now();
        Ok(())
    }
}
