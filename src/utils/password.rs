use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD},
};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hash a password with argon2id. All newly written hashes use this format.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// True when the stored hash uses the legacy Werkzeug `pbkdf2:sha256:...`
/// format carried over from the previous system. Rows verified against a
/// legacy hash are upgraded to argon2 on the next successful login.
pub fn is_legacy_hash(stored: &str) -> bool {
    stored.starts_with("pbkdf2:")
}

/// Verify a password against a stored hash. Dispatches on the hash format:
/// legacy `pbkdf2:sha256:iterations$salt$digest` rows first, argon2 otherwise.
/// Malformed stored hashes verify as false, never as an error.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if is_legacy_hash(stored) {
        return verify_werkzeug(password, stored);
    }

    let parsed = match argon2::PasswordHash::new(stored) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Werkzeug writes `pbkdf2:sha256:<iterations>$<salt>$<hex digest>` where the
/// salt is a random ASCII string used directly as bytes.
fn verify_werkzeug(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    if parts.len() != 3 {
        return false;
    }

    let header: Vec<&str> = parts[0].split(':').collect();
    if header.len() != 3 || header[0] != "pbkdf2" || header[1] != "sha256" {
        return false;
    }
    let iterations: u32 = match header[2].parse() {
        Ok(n) => n,
        Err(_) => return false,
    };

    let salt = parts[1].as_bytes();
    let expected = match decode_digest(parts[2]) {
        Some(bytes) => bytes,
        None => return false,
    };
    if expected.is_empty() {
        return false;
    }

    let mut computed = vec![0u8; expected.len()];
    if pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut computed).is_err() {
        return false;
    }

    computed == expected
}

/// Digests are hex in stock Werkzeug; some migration tooling wrote base64
/// instead, so fall back to the common encodings before giving up.
fn decode_digest(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 == 0 && input.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(decoded) = hex::decode(input) {
            return Some(decoded);
        }
    }
    if let Ok(decoded) = STANDARD.decode(input) {
        return Some(decoded);
    }
    if let Ok(decoded) = URL_SAFE.decode(input) {
        return Some(decoded);
    }
    if let Ok(decoded) = URL_SAFE_NO_PAD.decode(input) {
        return Some(decoded);
    }
    None
}
