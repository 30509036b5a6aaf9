//! PostgreSQL store.
//!
//! Email uniqueness is a unique index, token revocation is a flag on the token
//! row, and deleting a user cascades to its tokens through the foreign key.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{
    Connection, PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::time::Duration;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::{
    CreateOutcome, IssuedToken, MintOutcome, NewUser, ResolvedToken, TokenIssuer, UserRecord, UserStore,
    token::{MINT_ATTEMPTS, generate_access_token, hash_access_token},
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const USER_COLUMNS: &str = r#"
    id, name, email, password_hash,
    to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
    to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
"#;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database.
    /// # Errors
    /// Returns an error if the pool cannot be established.
    pub async fn connect(dsn: &SecretString, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn.expose_secret())
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    /// Create tables and indexes when missing.
    /// # Errors
    /// Returns an error if a schema statement fails.
    pub async fn apply_schema(&self) -> Result<()> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "DDL");
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to apply database schema")?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_user(&self, filter: &str, bind: UserKey<'_>) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let statement = sqlx::query(&query);
        let statement = match bind {
            UserKey::Email(email) => statement.bind(email),
            UserKey::Id(id) => statement.bind(id),
        };
        let row = statement
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user")?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .context("failed to decode user row")
    }
}

enum UserKey<'a> {
    Email(&'a str),
    Id(Uuid),
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn has_sqlstate(err: &sqlx::Error, sqlstate: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == sqlstate),
        _ => false,
    }
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_sqlstate(err, "23505")
}

/// The referenced row is gone, e.g. a token minted for a user deleted concurrently.
pub(super) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    has_sqlstate(err, "23503")
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.fetch_user("email = $1", UserKey::Email(email)).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        self.fetch_user("id = $1", UserKey::Id(id)).await
    }

    async fn create(&self, user: NewUser) -> Result<CreateOutcome> {
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(Uuid::now_v7())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(
                user_from_row(&row).context("failed to decode user row")?,
            )),
            // The unique index settles concurrent registrations for one email.
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::EmailTaken),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let query = "DELETE FROM users WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        async {
            let mut conn = self
                .pool
                .acquire()
                .await
                .context("failed to acquire database connection")?;
            conn.ping().await.context("failed to ping database")
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl TokenIssuer for PgStore {
    async fn mint(&self, user_id: Uuid) -> Result<MintOutcome> {
        let query = "INSERT INTO access_tokens (id, user_id, token_hash) VALUES ($1, $2, $3)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        for _ in 0..MINT_ATTEMPTS {
            let id = Uuid::now_v7();
            let token = generate_access_token()?;
            let result = sqlx::query(query)
                .bind(id)
                .bind(user_id)
                .bind(hash_access_token(&token))
                .execute(&self.pool)
                .instrument(span.clone())
                .await;

            match result {
                Ok(_) => return Ok(MintOutcome::Minted(IssuedToken { id, token })),
                Err(err) if is_unique_violation(&err) => {}
                Err(err) if is_foreign_key_violation(&err) => return Ok(MintOutcome::UnknownUser),
                Err(err) => return Err(err).context("failed to insert access token"),
            }
        }

        Err(anyhow!("failed to generate unique access token"))
    }

    async fn revoke(&self, token_id: Uuid) -> Result<()> {
        // Idempotent; revoking twice or revoking a cascaded token touches nothing.
        let query = "UPDATE access_tokens SET revoked = TRUE WHERE id = $1 AND NOT revoked";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to revoke access token")?;
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<Option<ResolvedToken>> {
        let query = r"
            SELECT access_tokens.id, access_tokens.user_id
            FROM access_tokens
            JOIN users ON users.id = access_tokens.user_id
            WHERE access_tokens.token_hash = $1
              AND NOT access_tokens.revoked
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(hash_access_token(token))
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to resolve access token")?;

        row.map(|row| -> Result<ResolvedToken> {
            Ok(ResolvedToken {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23503"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn is_foreign_key_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23503"),
        }));
        assert!(is_foreign_key_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(!is_foreign_key_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError { code: None }));
        assert!(!is_foreign_key_violation(&err));
    }

    #[test]
    fn schema_creates_unique_email_and_cascade() {
        assert!(SCHEMA_SQL.contains("CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email)"));
        assert!(SCHEMA_SQL.contains("ON DELETE CASCADE"));
        assert!(SCHEMA_SQL.contains("access_tokens_token_hash_key"));
    }

    #[test]
    fn user_columns_format_timestamps_as_utc() {
        assert!(USER_COLUMNS.contains("AT TIME ZONE 'utc'"));
        assert!(!USER_COLUMNS.contains('*'));
    }
}
