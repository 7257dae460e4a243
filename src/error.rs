use thiserror::Error;

/// Errors surfaced by the credential core.
///
/// Failed logins are not errors: `AuthService::verify` returns `Ok(false)`
/// for both unknown users and wrong passwords, and callers cannot tell the
/// two apart.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Empty username or password at registration.
    #[error("username and password must be non-empty")]
    InvalidInput,

    /// Registration conflict: the username already has a record.
    #[error("username '{0}' is already taken")]
    NameTaken(String),

    /// The durable store could not be read or written.
    #[error("credential store unavailable: {0}")]
    Store(#[from] rusqlite::Error),

    /// The KDF failed in a way distinct from a password mismatch
    /// (bad parameters, internal hashing error).
    #[error("password hashing failed: {0}")]
    Hasher(String),
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(e: argon2::password_hash::Error) -> Self {
        Self::Hasher(e.to_string())
    }
}
