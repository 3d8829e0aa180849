use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Key derivation failed")]
    KeyDerivationError,
    #[error("Stored password hash is malformed")]
    MalformedHash,
}

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const TOKEN_LEN: usize = 32;
const ROUNDS: u32 = 100_000;

pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

pub fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], SecurityError> {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, ROUNDS, &mut key)
        .map_err(|_| SecurityError::KeyDerivationError)?;
    Ok(key)
}

/// Hash a password as `hex(salt)$hex(key)`.
pub fn hash_password(password: &str) -> Result<String, SecurityError> {
    let salt = generate_salt();
    let key = derive_key(password, &salt)?;
    Ok(format!("{}${}", hex::encode(salt), hex::encode(key)))
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, SecurityError> {
    let (salt_hex, key_hex) = stored.split_once('$').ok_or(SecurityError::MalformedHash)?;
    let salt = hex::decode(salt_hex).map_err(|_| SecurityError::MalformedHash)?;
    let expected = hex::decode(key_hex).map_err(|_| SecurityError::MalformedHash)?;
    let key = derive_key(password, &salt)?;

    // Compare without short-circuiting on the first differing byte.
    if expected.len() != key.len() {
        return Ok(false);
    }
    let diff = key
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    Ok(diff == 0)
}

/// A fresh bearer token. Only its [`token_digest`] is ever stored.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
