//! `X-NFSN-Authentication` header signing.
//!
//! Header value: `login;timestamp;salt;hash`, where `hash` is the hex SHA-1 of
//! `login;timestamp;salt;api_key;path;sha1(body)`.

use crate::config::Credentials;
use rand::distr::Alphanumeric;
use rand::Rng;
use sha1::{Digest, Sha1};

pub const AUTH_HEADER: &str = "X-NFSN-Authentication";

const SALT_LEN: usize = 16;

/// Computes authentication header values. Each call draws a fresh salt and
/// timestamp, so a signature is never reused.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSigner;

impl RequestSigner {
    pub fn new() -> Self {
        Self
    }

    /// Sign a request for `path` (request target without scheme, host or query).
    pub fn sign(&self, credentials: &Credentials, path: &str, body: &str) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        let salt = random_salt();
        sign_with(credentials, path, body, timestamp, &salt)
    }
}

/// Deterministic signing with an explicit timestamp and salt.
pub fn sign_with(
    credentials: &Credentials,
    path: &str,
    body: &str,
    timestamp: i64,
    salt: &str,
) -> String {
    let prefix = format!("{};{};{}", credentials.username, timestamp, salt);
    // An absent body is signed as the hash of "".
    let body_hash = sha1_hex(body);
    let message = format!("{};{};{};{}", prefix, credentials.api_key, path, body_hash);

    format!("{};{}", prefix, sha1_hex(&message))
}

fn random_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}
