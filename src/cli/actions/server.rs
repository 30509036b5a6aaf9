use crate::{
    account::AccountService,
    api,
    password::Argon2Hasher,
    store::{MemoryStore, PgStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<SecretString>,
    pub max_connections: u32,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied,
/// or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let hasher = Arc::new(Argon2Hasher::default());

    let service = if let Some(dsn) = &args.dsn {
        let store = PgStore::connect(dsn, args.max_connections)
            .await
            .context("Failed to connect to database")?;

        store
            .apply_schema()
            .await
            .context("Failed to apply database schema")?;

        info!("Using PostgreSQL account store");

        let store = Arc::new(store);
        AccountService::new(store.clone(), store, hasher)
    } else {
        warn!("No --dsn given, accounts and tokens are kept in memory and lost on exit");

        let store = Arc::new(MemoryStore::new());
        AccountService::new(store.clone(), store, hasher)
    };

    api::new(args.port, Arc::new(service)).await
}
