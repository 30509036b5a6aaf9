//! Account and token lifecycle.
//!
//! `AccountService` composes a [`UserStore`], a [`TokenIssuer`] and a
//! [`PasswordHasher`] into the five account operations. Authentication is an
//! explicit step: callers resolve a bearer token into an [`AuthContext`] with
//! [`AccountService::authenticate`] and pass it to the operations that need a
//! current user.
//!
//! Token lifecycle: a token is issued by `login`/`register` and stays active
//! until `logout` revokes it or `unregister` deletes its owner. There is no
//! expiry.

mod error;
mod model;
mod validation;

pub use error::{AccountError, FieldErrors, Result};
pub use model::{AuthContext, LoginRequest, RegisterRequest, Session, User};

use anyhow::Context;
use std::{fmt, sync::Arc};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::{
    password::PasswordHasher,
    store::{
        CreateOutcome, IssuedToken, MintOutcome, NewUser, TokenIssuer, UserRecord, UserStore,
    },
};
use validation::EMAIL_TAKEN;

/// Hashed once per service and verified against when a login names an unknown email.
const DUMMY_PASSWORD: &str = "warden-dummy-password";

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenIssuer>,
    hasher: Arc<dyn PasswordHasher>,
    dummy_hash: Arc<OnceCell<String>>,
}

impl fmt::Debug for AccountService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountService").finish_non_exhaustive()
    }
}

impl AccountService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenIssuer>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Verify credentials and issue a new token.
    ///
    /// Unknown email and wrong password fail identically, and both cost one
    /// password verification.
    ///
    /// # Errors
    /// `Validation` for missing or malformed fields, `Authentication` for bad
    /// credentials, `Internal` for store or hasher failures.
    #[instrument(skip_all)]
    pub async fn login(&self, request: LoginRequest) -> Result<Session> {
        let credentials = validation::login(&request)?;

        let Some(user) = self.users.find_by_email(&credentials.email).await? else {
            self.verify_dummy_password(credentials.password).await?;
            debug!("login attempt for unknown email");
            return Err(AccountError::Authentication);
        };

        if !self
            .verify_password(credentials.password, user.password_hash.clone())
            .await?
        {
            debug!(user_id = %user.id, "login attempt with wrong password");
            return Err(AccountError::Authentication);
        }

        let issued = self.mint(&user).await?;
        info!(user_id = %user.id, token_id = %issued.id, "user logged in");

        Ok(Session {
            token: issued.token,
            user: User::from(user),
        })
    }

    /// Create a user and issue its first token.
    ///
    /// # Errors
    /// `Validation` for missing or malformed fields, a taken email or a
    /// password confirmation mismatch; `Internal` for store or hasher failures.
    #[instrument(skip_all)]
    pub async fn register(&self, request: RegisterRequest) -> Result<Session> {
        let mut errors = FieldErrors::new();
        let name = validation::name(&mut errors, request.name.as_deref());
        let email = validation::email(&mut errors, request.email.as_deref());
        let password = validation::confirmed_password(
            &mut errors,
            request.password.as_deref(),
            request.password_confirmation.as_deref(),
        );

        if let Some(email) = &email {
            if self.users.find_by_email(email).await?.is_some() {
                errors.add("email", EMAIL_TAKEN);
            }
        }

        let (name, email, password) = match (name, email, password) {
            (Some(name), Some(email), Some(password)) if errors.is_empty() => {
                (name, email, password)
            }
            _ => return Err(AccountError::Validation(errors)),
        };

        let password_hash = self.hash_password(password).await?;
        let user = match self
            .users
            .create(NewUser {
                name,
                email,
                password_hash,
            })
            .await?
        {
            CreateOutcome::Created(user) => user,
            CreateOutcome::EmailTaken => {
                // Lost a race with a concurrent registration for the same email.
                warn!("registration rejected by unique email constraint");
                let mut errors = FieldErrors::new();
                errors.add("email", EMAIL_TAKEN);
                return Err(AccountError::Validation(errors));
            }
        };

        let issued = self.mint(&user).await?;
        info!(user_id = %user.id, token_id = %issued.id, "user registered");

        Ok(Session {
            token: issued.token,
            user: User::from(user),
        })
    }

    /// Resolve a bearer token into the calling user.
    ///
    /// # Errors
    /// `Authentication` when the token is missing, unknown, revoked, or its
    /// owner no longer exists.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, bearer: Option<&str>) -> Result<AuthContext> {
        let token = bearer
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AccountError::Authentication)?;

        let Some(resolved) = self.tokens.resolve(token).await? else {
            debug!("bearer token did not resolve");
            return Err(AccountError::Authentication);
        };

        let Some(user) = self.users.find_by_id(resolved.user_id).await? else {
            debug!(user_id = %resolved.user_id, "bearer token owner is gone");
            return Err(AccountError::Authentication);
        };

        Ok(AuthContext {
            user: User::from(user),
            token_id: resolved.id,
        })
    }

    /// Revoke the token the caller authenticated with. Other tokens stay valid.
    ///
    /// # Errors
    /// `Internal` if the token issuer fails.
    #[instrument(skip_all, fields(user_id = %context.user.id, token_id = %context.token_id))]
    pub async fn logout(&self, context: &AuthContext) -> Result<()> {
        self.tokens.revoke(context.token_id).await?;
        info!("token revoked");
        Ok(())
    }

    /// Delete the caller's account; its tokens become unusable with it.
    ///
    /// # Errors
    /// `NotFound` if the user record is already gone, `Internal` for store failures.
    #[instrument(skip_all, fields(user_id = %context.user.id))]
    pub async fn unregister(&self, context: &AuthContext) -> Result<()> {
        if !self.users.delete(context.user.id).await? {
            debug!("user already deleted");
            return Err(AccountError::NotFound);
        }
        info!("user deleted");
        Ok(())
    }

    /// The caller's own user record.
    #[must_use]
    pub fn me(&self, context: &AuthContext) -> User {
        context.user.clone()
    }

    /// A user deleted between lookup and minting fails authentication.
    async fn mint(&self, user: &UserRecord) -> Result<IssuedToken> {
        match self.tokens.mint(user.id).await? {
            MintOutcome::Minted(issued) => Ok(issued),
            MintOutcome::UnknownUser => {
                debug!(user_id = %user.id, "user deleted before a token could be minted");
                Err(AccountError::Authentication)
            }
        }
    }

    async fn verify_dummy_password(&self, password: String) -> Result<()> {
        let dummy_hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD.to_string()))
            .await?
            .clone();
        self.verify_password(password, dummy_hash).await?;
        Ok(())
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("password hashing task failed")??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .context("password verification task failed")??;
        Ok(verified)
    }
}
