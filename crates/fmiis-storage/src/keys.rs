//! Key builders for every durable store entry.
//!
//! Keys end up as file names in the file provider, so they are restricted
//! to a portable character set.

/// Validate that a key is safe to use as a file stem.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !key.starts_with('.')
}
