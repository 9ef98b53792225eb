use serde::Serialize;

/// Length of every digest handed out by [`fake_hash`].
pub const DIGEST_LEN: usize = 64;

/// Rolling, order-sensitive checksum over the input's characters.
///
/// The 32-bit accumulator is folded, rendered as 8 hex chars and tiled up to
/// [`DIGEST_LEN`]. This only looks like a hash; it is trivially collidable
/// and must never be used for anything but the animation.
pub fn fake_hash(input: &str) -> String {
    let mut acc: u32 = 0;
    for c in input.chars() {
        acc = acc
            .wrapping_shl(5)
            .wrapping_sub(acc)
            .wrapping_add(c as u32);
    }
    let word = hex::encode(fold(acc).to_be_bytes());
    word.repeat(DIGEST_LEN / word.len())
}

/// Bijective mix so a change near the end of the input (the nonce) reaches
/// the leading hex digits. Zero maps to zero.
fn fold(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x85eb_ca6b);
    x ^= x >> 13;
    x = x.wrapping_mul(0xc2b2_ae35);
    x ^= x >> 16;
    x
}

/// Digest of a value's canonical (JSON) serialization.
pub fn digest_of<T: Serialize>(value: &T) -> String {
    // Serializing plain data structs into a String cannot fail.
    let json = serde_json::to_string(value).unwrap_or_default();
    fake_hash(&json)
}

/// Pairwise merkle combination; the last digest is duplicated on odd levels.
/// An empty list has an empty root.
pub fn merkle_root<T: Serialize>(items: &[T]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut level: Vec<String> = items.iter().map(digest_of).collect();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1].clone();
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| fake_hash(&format!("{}{}", pair[0], pair[1])))
            .collect();
    }
    level.remove(0)
}

/// True when `hash` starts with `difficulty` zero characters.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let need = difficulty as usize;
    hash.len() >= need && hash.bytes().take(need).all(|b| b == b'0')
}
