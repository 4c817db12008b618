use sha2::{Digest, Sha256};

/// `sha256:<hex>` digest of the diff text, logged and reported per run.
pub fn diff_hash(diff: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(diff.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
