//! # Warden
//!
//! `warden` registers accounts, verifies passwords and hands out opaque bearer
//! tokens over a small JSON HTTP API.
//!
//! - **Passwords** are hashed with Argon2id and never leave the service.
//! - **Tokens** are 256 random bits, URL-safe base64 encoded; only their
//!   SHA-256 digest is stored, so a leaked table cannot be replayed.
//! - **Logout** revokes the presented token only. **Unregister** deletes the
//!   account together with every token it owns.
//!
//! Accounts live in PostgreSQL when a DSN is configured and in process memory
//! otherwise.

pub mod account;
pub mod api;
pub mod cli;
pub mod password;
pub mod store;
