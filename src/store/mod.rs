//! Persistence capabilities behind the account service.
//!
//! `UserStore` owns user records and enforces email uniqueness. `TokenIssuer`
//! mints, revokes and resolves opaque bearer tokens. Both are implemented by
//! [`PgStore`] for production and [`MemoryStore`] for tests and ephemeral runs.

mod memory;
mod postgres;
mod token;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

/// A user as stored, including the password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields needed to create a user. The email must already be normalized.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .finish()
    }
}

/// Outcome when attempting to create a user.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(UserRecord),
    /// Another user already holds the email.
    EmailTaken,
}

/// A newly minted token. The raw value is only ever returned here.
#[derive(Clone)]
pub struct IssuedToken {
    pub id: Uuid,
    pub token: String,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("id", &self.id)
            .field("token", &"***")
            .finish()
    }
}

/// Outcome when attempting to mint a token.
#[derive(Debug)]
pub enum MintOutcome {
    Minted(IssuedToken),
    /// The owner does not exist, typically deleted while logging in.
    UnknownUser,
}

/// An active token and the user it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedToken {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;

    /// Insert a user atomically; a duplicate email yields `CreateOutcome::EmailTaken`.
    async fn create(&self, user: NewUser) -> Result<CreateOutcome>;

    /// Delete a user and, with it, every token it owns.
    ///
    /// Returns `false` when no such user existed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Mint a new token bound to `user_id`.
    async fn mint(&self, user_id: Uuid) -> Result<MintOutcome>;

    /// Revoke one token. Revoking an unknown or already revoked token is a no-op.
    async fn revoke(&self, token_id: Uuid) -> Result<()>;

    /// Resolve a raw token; revoked tokens and tokens of deleted users resolve to `None`.
    async fn resolve(&self, token: &str) -> Result<Option<ResolvedToken>>;
}
