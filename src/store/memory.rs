//! In-process store. State lives behind a single lock so user deletion and
//! token cascade happen atomically.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use time::{OffsetDateTime, macros::format_description};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    CreateOutcome, IssuedToken, MintOutcome, NewUser, ResolvedToken, TokenIssuer, UserRecord, UserStore,
    token::{MINT_ATTEMPTS, generate_access_token, hash_access_token},
};

#[derive(Debug)]
struct TokenRow {
    user_id: Uuid,
    token_hash: Vec<u8>,
    revoked: bool,
    created_at: String,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    tokens: HashMap<Uuid, TokenRow>,
    /// Token hash to token id.
    token_ids: HashMap<Vec<u8>, Uuid>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    /// Number of stored tokens, revoked ones included.
    pub async fn token_count(&self) -> usize {
        self.state.read().await.tokens.len()
    }
}

fn now_utc() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .unwrap_or_default()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<CreateOutcome> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Ok(CreateOutcome::EmailTaken);
        }

        let now = now_utc();
        let record = UserRecord {
            id: Uuid::now_v7(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now.clone(),
            updated_at: now,
        };
        state.users.insert(record.id, record.clone());

        Ok(CreateOutcome::Created(record))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let owned: Vec<Uuid> = state
            .tokens
            .iter()
            .filter(|(_, row)| row.user_id == id)
            .map(|(token_id, _)| *token_id)
            .collect();
        for token_id in &owned {
            if let Some(row) = state.tokens.remove(token_id) {
                state.token_ids.remove(&row.token_hash);
            }
        }
        debug!("deleted user {id} and {} tokens", owned.len());

        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TokenIssuer for MemoryStore {
    async fn mint(&self, user_id: Uuid) -> Result<MintOutcome> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Ok(MintOutcome::UnknownUser);
        }

        for _ in 0..MINT_ATTEMPTS {
            let token = generate_access_token()?;
            let token_hash = hash_access_token(&token);
            if state.token_ids.contains_key(&token_hash) {
                continue;
            }

            let id = Uuid::now_v7();
            state.token_ids.insert(token_hash.clone(), id);
            state.tokens.insert(
                id,
                TokenRow {
                    user_id,
                    token_hash,
                    revoked: false,
                    created_at: now_utc(),
                },
            );
            return Ok(MintOutcome::Minted(IssuedToken { id, token }));
        }

        Err(anyhow!("failed to generate unique access token"))
    }

    async fn revoke(&self, token_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(row) = state.tokens.get_mut(&token_id) {
            row.revoked = true;
        }
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<Option<ResolvedToken>> {
        let token_hash = hash_access_token(token);
        let state = self.state.read().await;
        Ok(state
            .token_ids
            .get(&token_hash)
            .and_then(|id| state.tokens.get(id).map(|row| (*id, row)))
            .filter(|(_, row)| !row.revoked && state.users.contains_key(&row.user_id))
            .map(|(id, row)| ResolvedToken {
                id,
                user_id: row.user_id,
            }))
    }
}
