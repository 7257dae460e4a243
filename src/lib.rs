//! Credential core for the Brandproof compliance assistant.
//!
//! Three pieces, wired together by [`AuthService`]:
//! - [`PasswordScheme`] — derives and verifies password hashes. New hashes
//!   are Argon2id PHC strings under an `argon2:` tag; bare lowercase-hex
//!   SHA-256 hashes from the pre-migration system still verify.
//! - [`UserStore`] — one SQLite table mapping username to stored hash.
//! - [`AuthService`] — registration, verification, and the opportunistic
//!   upgrade: a login that succeeds against a legacy or stale hash rewrites
//!   the record under the current parameters, best-effort.
//!
//! The host binds the service in-process and decides threading; `derive`
//! is intentionally memory-hard (~64 MiB per call at defaults), so dispatch
//! logins to workers if the caller must not block.
//!
//! ```no_run
//! use brandproof_auth::{AuthService, PasswordScheme, UserStore};
//!
//! # fn main() -> Result<(), brandproof_auth::AuthError> {
//! let store = UserStore::open(std::path::Path::new("users.db"))?;
//! let service = AuthService::new(PasswordScheme::default(), store);
//!
//! service.register("alice", "correct horse battery staple")?;
//! assert!(service.verify("alice", "correct horse battery staple")?);
//! # Ok(())
//! # }
//! ```

mod error;
mod hasher;
mod service;
mod store;

pub use error::AuthError;
pub use hasher::{PasswordScheme, SchemeParams};
pub use service::AuthService;
pub use store::UserStore;

// The configured Argon2 variant is part of the public parameters.
pub use argon2::Algorithm;
