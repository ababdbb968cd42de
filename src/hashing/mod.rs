//! Content-addressed digests for cache keys.
//!
//! Every digest is computed over line-ending normalized text, so the same logical
//! request maps to the same key on every platform.

use std::borrow::Cow;

use blake3::Hasher;

/// Hex characters kept from the BLAKE3 output (128 bits).
pub const DIGEST_HEX_LEN: usize = 32;

/// Replaces every `\r\n` with `\n`; borrows when there is nothing to replace.
#[inline]
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Computes the 128-bit request digest used as the local cache key.
///
/// Each field is length-prefixed before it is fed to the hasher so that
/// `("ab", "c")` and `("a", "bc")` never collide. `text` is normalized first.
pub fn hash_request(model: &str, seed: u32, mode: &str, text: &str) -> String {
    let normalized = normalize_line_endings(text);

    let mut hasher = Hasher::new();
    update_field(&mut hasher, model.as_bytes());
    hasher.update(&seed.to_le_bytes());
    update_field(&mut hasher, mode.as_bytes());
    update_field(&mut hasher, normalized.as_bytes());

    truncate_hex(hasher.finalize())
}

fn update_field(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn truncate_hex(hash: blake3::Hash) -> String {
    let mut hex = hash.to_hex().to_string();
    hex.truncate(DIGEST_HEX_LEN);
    hex
}
