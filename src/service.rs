//! Registration, verification, and the opportunistic hash-upgrade protocol.

use crate::error::AuthError;
use crate::hasher::PasswordScheme;
use crate::store::UserStore;

/// Binds the hasher and the store into the externally visible protocol.
///
/// Every verification reads fresh from the store; there is no in-memory
/// credential cache. A verification that succeeds against a legacy or
/// stale hash re-derives the hash from the just-checked plaintext and
/// writes it back, so the stored records converge toward the current
/// parameters as users log in. Records of users who never log in again
/// keep their old shape indefinitely; with the plaintexts unavailable
/// there is no offline migration that could do better.
pub struct AuthService {
    scheme: PasswordScheme,
    store: UserStore,
}

impl AuthService {
    pub fn new(scheme: PasswordScheme, store: UserStore) -> Self {
        Self { scheme, store }
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    pub fn scheme(&self) -> &PasswordScheme {
        &self.scheme
    }

    /// Register a new user under a freshly derived hash.
    ///
    /// `InvalidInput` for an empty (or whitespace) username or empty
    /// password; `NameTaken` when the username already has a record, in
    /// which case the store is untouched.
    pub fn register(&self, username: &str, plaintext: &str) -> Result<(), AuthError> {
        let username = username.trim();
        if username.is_empty() || plaintext.is_empty() {
            return Err(AuthError::InvalidInput);
        }

        let stored_hash = self.scheme.derive(plaintext)?;
        if self.store.insert_unique(username, &stored_hash)? {
            tracing::debug!(username, "user registered");
            Ok(())
        } else {
            Err(AuthError::NameTaken(username.to_string()))
        }
    }

    /// Check a username/password pair.
    ///
    /// Returns `Ok(false)` for unknown users and wrong passwords alike.
    /// Store failures on the read path surface as errors; failures while
    /// upgrading a stale hash are logged and swallowed, because the user
    /// did present the right password.
    ///
    /// The unknown-user path returns without touching the KDF, which makes
    /// it measurably faster than a wrong-password check. Operators who care
    /// about that oracle can verify against a fixed dummy hash on the miss
    /// path; this core documents the gap instead of hiding it.
    pub fn verify(&self, username: &str, plaintext: &str) -> Result<bool, AuthError> {
        let Some(stored_hash) = self.store.lookup(username.trim())? else {
            return Ok(false);
        };

        if !self.scheme.verify(plaintext, &stored_hash) {
            return Ok(false);
        }

        if self.scheme.needs_rehash(&stored_hash) {
            self.upgrade_hash(username.trim(), plaintext);
        }

        Ok(true)
    }

    /// Whether the stored hash for a username is legacy or derived under
    /// stale parameters. `None` for unknown users.
    pub fn needs_rehash(&self, username: &str) -> Result<Option<bool>, AuthError> {
        Ok(self
            .store
            .lookup(username.trim())?
            .map(|h| self.scheme.needs_rehash(&h)))
    }

    /// Best-effort rewrite of a stale hash after a successful verification.
    ///
    /// The fresh hash is derived from the plaintext that just verified,
    /// never from stored data. Nothing here affects the caller's login
    /// outcome; failures go to the log only. Two overlapping logins may
    /// both land here — last writer wins, and either result is a valid
    /// current-parameter hash of the same plaintext.
    fn upgrade_hash(&self, username: &str, plaintext: &str) {
        let fresh = match self.scheme.derive(plaintext) {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(username, error = %e, "hash upgrade derivation failed");
                return;
            }
        };

        match self.store.update_hash(username, &fresh) {
            Ok(true) => tracing::debug!(username, "stored hash upgraded to current parameters"),
            Ok(false) => tracing::warn!(username, "hash upgrade found no record to update"),
            Err(e) => tracing::warn!(username, error = %e, "hash upgrade write failed"),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
