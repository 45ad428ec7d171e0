use sha2::{Digest, Sha256};

/// 256-bit random token, hex encoded. Used for refresh, reset and email
/// verification tokens.
pub fn generate() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Tokens are persisted only as their SHA-256 digest.
pub fn hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
