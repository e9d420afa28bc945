//! Password hashes
//!
//! New hashes are argon2id PHC strings (`$argon2id$v=19$...`). Rows written
//! before the switch hold `sha256$<iterations>$<salt hex>$<hash hex>` and
//! still verify.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::MandatoError;

const SALT_LEN: usize = 16;
const LEGACY_PREFIX: &str = "sha256$";

pub fn hash_password(password: &str) -> Result<String, MandatoError> {
    let mut bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes)
        .map_err(|e| MandatoError::ConfigError(format!("Password salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| MandatoError::ConfigError(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, MandatoError> {
    if stored.starts_with(LEGACY_PREFIX) {
        return verify_legacy(password, stored);
    }

    let parsed = PasswordHash::new(stored)
        .map_err(|_| MandatoError::DatabaseError("Unrecognized password hash format".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn verify_legacy(password: &str, stored: &str) -> Result<bool, MandatoError> {
    let parts: Vec<&str> = stored.split('$').collect();
    if parts.len() != 4 {
        return Err(MandatoError::DatabaseError("Unrecognized password hash format".to_string()));
    }

    let iterations: u32 = parts[1]
        .parse()
        .map_err(|_| MandatoError::DatabaseError("Invalid password hash iterations".to_string()))?;
    let salt = hex::decode(parts[2])
        .map_err(|_| MandatoError::DatabaseError("Invalid password hash salt".to_string()))?;

    let candidate = encode_legacy(&salt, iterations, password);
    Ok(constant_time_eq(candidate.as_bytes(), stored.as_bytes()))
}

fn encode_legacy(salt: &[u8], iterations: u32, password: &str) -> String {
    let mut digest = {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize()
    };

    for _ in 1..iterations {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt);
        digest = hasher.finalize();
    }

    format!(
        "sha256${}${}${}",
        iterations,
        hex::encode(salt),
        hex::encode(digest)
    )
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password("s3nha-forte").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("s3nha-forte", &stored).unwrap());
        assert!(!verify_password("senha-errada", &stored).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("igual").unwrap(), hash_password("igual").unwrap());
    }

    #[test]
    fn test_legacy_sha256_hashes_still_verify() {
        let stored = encode_legacy(b"0123456789abcdef", 1_000, "senha-antiga");
        assert!(stored.starts_with("sha256$1000$"));
        assert!(verify_password("senha-antiga", &stored).unwrap());
        assert!(!verify_password("outra", &stored).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("x", "plaintext").is_err());
        assert!(verify_password("x", "sha256$abc").is_err());
    }
}
