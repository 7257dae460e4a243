//! Password hashing scheme: Argon2id for everything written today, plus
//! verification of legacy unsalted SHA-256 hashes written before the
//! migration.
//!
//! Stored hashes come in exactly two shapes:
//! - Modern: `argon2:<PHC string>` — self-describing, salted, parameters
//!   recoverable from the string itself.
//! - Legacy: 64 lowercase hex chars, a single SHA-256 pass over the UTF-8
//!   password bytes.
//!
//! The `argon2:` tag contains non-hex letters, so the two shapes can never
//! be confused. New hashes are always Modern; the legacy path exists only
//! so old records keep verifying until their next successful login upgrades
//! them.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// Tag prefixed to Argon2 PHC strings in storage.
const MODERN_PREFIX: &str = "argon2:";

/// Width of a legacy hash: SHA-256 digest, hex-encoded.
const LEGACY_HEX_LEN: usize = 64;

/// Upper bound accepted when decoding a salt out of a stored PHC string.
const MAX_SALT_LEN: usize = 64;

/// Argon2 parameters for the scheme.
///
/// Defaults follow the OWASP-style server profile: Argon2id, 64 MiB memory
/// cost, 3 iterations, 1 lane, 16-byte salt, 32-byte digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeParams {
    /// Argon2 variant. Argon2id unless you have a specific reason.
    pub variant: Algorithm,
    /// Memory cost in KiB.
    pub memory_cost_kib: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Number of lanes.
    pub parallelism: u32,
    /// Fresh random salt width in bytes.
    pub salt_len: usize,
    /// Digest width in bytes.
    pub output_len: usize,
}

impl Default for SchemeParams {
    fn default() -> Self {
        Self {
            variant: Algorithm::Argon2id,
            memory_cost_kib: 64 * 1024,
            time_cost: 3,
            parallelism: 1,
            salt_len: 16,
            output_len: 32,
        }
    }
}

impl SchemeParams {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.time_cost < 1 {
            return Err(AuthError::Hasher("argon2 time cost must be >= 1".into()));
        }
        if self.parallelism < 1 {
            return Err(AuthError::Hasher("argon2 parallelism must be >= 1".into()));
        }
        if self.memory_cost_kib < 8 * self.parallelism {
            return Err(AuthError::Hasher(
                "argon2 memory cost must be at least 8 * parallelism KiB".into(),
            ));
        }
        if self.salt_len < 8 || self.salt_len > 32 {
            return Err(AuthError::Hasher("salt length must be 8..=32 bytes".into()));
        }
        if self.output_len < 16 || self.output_len > 64 {
            return Err(AuthError::Hasher(
                "digest length must be 16..=64 bytes".into(),
            ));
        }
        Ok(())
    }
}

/// Stateless password hasher. Cheap to clone and safe to share across
/// threads; parameters are fixed at construction.
#[derive(Debug, Clone)]
pub struct PasswordScheme {
    params: SchemeParams,
}

impl Default for PasswordScheme {
    fn default() -> Self {
        Self {
            params: SchemeParams::default(),
        }
    }
}

impl PasswordScheme {
    /// Build a scheme with explicit parameters. Fails on parameters the
    /// underlying KDF would reject.
    pub fn new(params: SchemeParams) -> Result<Self, AuthError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SchemeParams {
        &self.params
    }

    /// Derive a fresh Modern hash for a plaintext.
    ///
    /// Every call draws a new random salt, so two derivations of the same
    /// plaintext produce different strings. The output is self-describing;
    /// `verify` needs nothing beyond the returned string.
    pub fn derive(&self, plaintext: &str) -> Result<String, AuthError> {
        let argon2 = self.argon2()?;

        let mut salt_bytes = vec![0u8; self.params.salt_len];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)?;

        let phc = argon2.hash_password(plaintext.as_bytes(), &salt)?.to_string();
        Ok(format!("{MODERN_PREFIX}{phc}"))
    }

    /// Check a plaintext against a stored hash of either shape.
    ///
    /// Returns false for mismatches, corrupted Modern payloads, and
    /// unrecognized formats alike; it never errors on ordinary input. The
    /// legacy comparison is constant-time.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        if let Some(payload) = stored_hash.strip_prefix(MODERN_PREFIX) {
            let parsed = match PasswordHash::new(payload) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(error = %e, "stored hash has argon2 tag but corrupt payload");
                    return false;
                }
            };
            // Verification parameters come from the PHC string itself, so a
            // hash derived under older settings still verifies.
            return Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok();
        }

        if !is_legacy_shape(stored_hash) {
            return false;
        }
        constant_time_eq(legacy_digest(plaintext).as_bytes(), stored_hash.as_bytes())
    }

    /// Whether a stored hash should be re-derived on the next successful
    /// verification.
    ///
    /// True for every legacy hash and for Modern hashes whose embedded
    /// variant, version, costs, salt width, or digest width differ from the
    /// configured parameters. Corrupted input returns false: a hash that
    /// cannot be verified must not be rewritten either.
    pub fn needs_rehash(&self, stored_hash: &str) -> bool {
        if let Some(payload) = stored_hash.strip_prefix(MODERN_PREFIX) {
            let Ok(parsed) = PasswordHash::new(payload) else {
                return false;
            };
            return self.is_stale(&parsed);
        }
        is_legacy_shape(stored_hash)
    }

    fn argon2(&self) -> Result<Argon2<'static>, AuthError> {
        let params = Params::new(
            self.params.memory_cost_kib,
            self.params.time_cost,
            self.params.parallelism,
            Some(self.params.output_len),
        )
        .map_err(|e| AuthError::Hasher(format!("invalid argon2 parameters: {e}")))?;
        Ok(Argon2::new(self.params.variant, Version::V0x13, params))
    }

    fn is_stale(&self, parsed: &PasswordHash<'_>) -> bool {
        match Algorithm::try_from(parsed.algorithm) {
            Ok(variant) if variant == self.params.variant => {}
            _ => return true,
        }

        match parsed.version {
            Some(v) if v == u32::from(Version::V0x13) => {}
            _ => return true,
        }

        let Ok(params) = Params::try_from(parsed) else {
            return true;
        };
        if params.m_cost() != self.params.memory_cost_kib
            || params.t_cost() != self.params.time_cost
            || params.p_cost() != self.params.parallelism
        {
            return true;
        }

        let mut salt_buf = [0u8; MAX_SALT_LEN];
        let salt_len = parsed
            .salt
            .and_then(|s| s.decode_b64(&mut salt_buf).ok().map(|b| b.len()));
        if salt_len != Some(self.params.salt_len) {
            return true;
        }

        parsed.hash.map(|h| h.len()) != Some(self.params.output_len)
    }
}

/// Single SHA-256 pass over the UTF-8 plaintext, lowercase hex — the shape
/// the pre-migration system wrote. Never produced for new records.
fn legacy_digest(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

/// A well-formed legacy candidate: exactly 64 lowercase hex chars.
fn is_legacy_shape(candidate: &str) -> bool {
    candidate.len() == LEGACY_HEX_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so the suite doesn't grind through 64 MiB per call.
    fn fast_scheme() -> PasswordScheme {
        PasswordScheme::new(SchemeParams {
            memory_cost_kib: 256,
            time_cost: 1,
            ..SchemeParams::default()
        })
        .unwrap()
    }

    #[test]
    fn derive_produces_tagged_self_describing_hash() {
        let scheme = fast_scheme();
        let hash = scheme.derive("hunter2").unwrap();
        assert!(hash.starts_with("argon2:$argon2id$"));
        assert!(hash.contains("m=256,t=1,p=1"));
    }

    #[test]
    fn derive_and_verify_roundtrip() {
        let scheme = fast_scheme();
        let hash = scheme.derive("correct horse battery staple").unwrap();
        assert!(scheme.verify("correct horse battery staple", &hash));
        assert!(!scheme.verify("wrong", &hash));
    }

    #[test]
    fn derive_uses_fresh_salt_each_call() {
        let scheme = fast_scheme();
        let h1 = scheme.derive("same password").unwrap();
        let h2 = scheme.derive("same password").unwrap();
        assert_ne!(h1, h2);
        assert!(scheme.verify("same password", &h1));
        assert!(scheme.verify("same password", &h2));
    }

    #[test]
    fn verify_accepts_legacy_sha256_hex() {
        let scheme = fast_scheme();
        let legacy = legacy_digest("hunter2");
        assert!(scheme.verify("hunter2", &legacy));
        assert!(!scheme.verify("hunter3", &legacy));
    }

    #[test]
    fn verify_rejects_malformed_legacy_candidates() {
        let scheme = fast_scheme();
        // wrong width
        assert!(!scheme.verify("pw", "deadbeef"));
        // right width, uppercase hex
        let upper = legacy_digest("pw").to_uppercase();
        assert!(!scheme.verify("pw", &upper));
        // right width, non-hex chars
        let junk = "z".repeat(64);
        assert!(!scheme.verify("pw", &junk));
        assert!(!scheme.verify("pw", ""));
    }

    #[test]
    fn verify_rejects_corrupt_modern_payload() {
        let scheme = fast_scheme();
        assert!(!scheme.verify("pw", "argon2:not-a-phc-string"));
        assert!(!scheme.verify("pw", "argon2:"));
    }

    #[test]
    fn unicode_plaintext_hashes_over_utf8_bytes() {
        let scheme = fast_scheme();
        let pw = "пароль-密码-🔑";
        let hash = scheme.derive(pw).unwrap();
        assert!(scheme.verify(pw, &hash));

        let legacy = legacy_digest(pw);
        assert!(scheme.verify(pw, &legacy));
    }

    #[test]
    fn long_plaintext_roundtrips() {
        let scheme = fast_scheme();
        let pw = "x".repeat(2048);
        let hash = scheme.derive(&pw).unwrap();
        assert!(scheme.verify(&pw, &hash));
    }

    #[test]
    fn needs_rehash_true_for_legacy() {
        let scheme = fast_scheme();
        assert!(scheme.needs_rehash(&legacy_digest("anything")));
    }

    #[test]
    fn needs_rehash_false_for_current_params() {
        let scheme = fast_scheme();
        let hash = scheme.derive("pw").unwrap();
        assert!(!scheme.needs_rehash(&hash));
    }

    #[test]
    fn needs_rehash_true_after_parameter_bump() {
        let old = fast_scheme();
        let hash = old.derive("pw").unwrap();

        let bumped = PasswordScheme::new(SchemeParams {
            memory_cost_kib: 512,
            time_cost: 1,
            ..SchemeParams::default()
        })
        .unwrap();
        assert!(bumped.needs_rehash(&hash));
        // still verifies: parameters come from the stored string
        assert!(bumped.verify("pw", &hash));
    }

    #[test]
    fn needs_rehash_true_for_different_variant() {
        let id_scheme = fast_scheme();
        let i_scheme = PasswordScheme::new(SchemeParams {
            variant: Algorithm::Argon2i,
            memory_cost_kib: 256,
            time_cost: 1,
            ..SchemeParams::default()
        })
        .unwrap();
        let hash = i_scheme.derive("pw").unwrap();
        assert!(id_scheme.needs_rehash(&hash));
    }

    #[test]
    fn needs_rehash_true_for_different_salt_or_digest_width() {
        let scheme = fast_scheme();
        let wide = PasswordScheme::new(SchemeParams {
            memory_cost_kib: 256,
            time_cost: 1,
            salt_len: 24,
            output_len: 48,
            ..SchemeParams::default()
        })
        .unwrap();
        let hash = wide.derive("pw").unwrap();
        assert!(scheme.needs_rehash(&hash));
        assert!(!wide.needs_rehash(&hash));
    }

    #[test]
    fn needs_rehash_false_for_garbage() {
        let scheme = fast_scheme();
        assert!(!scheme.needs_rehash(""));
        assert!(!scheme.needs_rehash("not a hash at all"));
        assert!(!scheme.needs_rehash("argon2:corrupt$payload"));
        assert!(!scheme.needs_rehash(&"Z".repeat(64)));
    }

    #[test]
    fn invalid_params_rejected_at_construction() {
        assert!(PasswordScheme::new(SchemeParams {
            time_cost: 0,
            ..SchemeParams::default()
        })
        .is_err());
        assert!(PasswordScheme::new(SchemeParams {
            parallelism: 0,
            ..SchemeParams::default()
        })
        .is_err());
        assert!(PasswordScheme::new(SchemeParams {
            memory_cost_kib: 4,
            parallelism: 1,
            ..SchemeParams::default()
        })
        .is_err());
        assert!(PasswordScheme::new(SchemeParams {
            salt_len: 2,
            ..SchemeParams::default()
        })
        .is_err());
    }

    #[test]
    fn default_params_meet_server_profile() {
        let params = SchemeParams::default();
        assert!(params.memory_cost_kib >= 64 * 1024);
        assert!(params.time_cost >= 2);
        assert_eq!(params.variant, Algorithm::Argon2id);
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
