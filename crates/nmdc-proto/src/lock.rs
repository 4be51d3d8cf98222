//! The NMDC lock/key handshake.
//!
//! On accept the hub sends `$Lock <lock> Pk=<pk>`; the client answers with
//! `$Key <key>` where the key is derived from the lock by the well-known
//! XOR-and-nibble-swap transform. The hub derives the same key from its own
//! lock and compares.

use rand::Rng;

/// `Pk` value advertised in the `$Lock` greeting.
pub const LOCK_PK: &str = "nmdcd";

const LOCK_PREFIX: &str = "EXTENDEDPROTOCOL";
const LOCK_MIN_LEN: usize = 80;
const LOCK_MAX_LEN: usize = 134;

/// Generate a random lock satisfying the NMDC lock grammar: the extended
/// protocol marker followed by alphanumerics, total length in
/// `[LOCK_MIN_LEN, LOCK_MAX_LEN]`.
pub fn generate_lock<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(LOCK_MIN_LEN..=LOCK_MAX_LEN);
    let mut lock = String::with_capacity(len);
    lock.push_str(LOCK_PREFIX);
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    while lock.len() < len {
        lock.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    }
    lock
}

/// Raw key bytes for a lock, before wire escaping.
///
/// `key[i] = lock[i] ^ lock[i-1]` for `i > 0`,
/// `key[0] = lock[0] ^ lock[-1] ^ lock[-2] ^ 5`, then every byte has its
/// nibbles swapped.
pub fn key_bytes(lock: &str) -> Vec<u8> {
    let b: Vec<u8> = lock.chars().map(|c| c as u8).collect();
    if b.len() < 2 {
        return Vec::new();
    }
    let mut key = vec![0u8; b.len()];
    key[0] = b[0] ^ b[b.len() - 1] ^ b[b.len() - 2] ^ 5;
    for i in 1..b.len() {
        key[i] = b[i] ^ b[i - 1];
    }
    for k in &mut key {
        *k = (*k << 4) | (*k >> 4);
    }
    key
}

/// Wire-escape key bytes. The six magic values that would collide with
/// framing or C-string handling are sent as `/%DCN<ddd>%/` sequences.
pub fn escape_key_bytes(key: &[u8]) -> String {
    let mut out = String::with_capacity(key.len());
    for &k in key {
        match k {
            0 | 5 | 36 | 96 | 124 | 126 => {
                out.push_str(&format!("/%DCN{:03}%/", k));
            }
            _ => out.push(k as char),
        }
    }
    out
}

/// The key a conforming client sends for `lock`.
pub fn key_for(lock: &str) -> String {
    escape_key_bytes(&key_bytes(lock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn lock_grammar() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            let lock = generate_lock(&mut rng);
            assert!(lock.starts_with(LOCK_PREFIX));
            assert!(lock.len() >= LOCK_MIN_LEN && lock.len() <= LOCK_MAX_LEN);
            assert!(lock.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn key_bytes_known_value() {
        // lock "ABC": key[1] = 66^65 = 3, key[2] = 67^66 = 1,
        // key[0] = 65^67^66^5 = 69; nibble-swapped: 0x54, 0x30, 0x10.
        assert_eq!(key_bytes("ABC"), vec![0x54, 0x30, 0x10]);
        assert_eq!(key_for("ABC"), "T0\u{10}");
    }

    #[test]
    fn magic_bytes_are_escaped() {
        assert_eq!(escape_key_bytes(&[0]), "/%DCN000%/");
        assert_eq!(escape_key_bytes(&[5]), "/%DCN005%/");
        assert_eq!(escape_key_bytes(&[36]), "/%DCN036%/");
        assert_eq!(escape_key_bytes(&[96]), "/%DCN096%/");
        assert_eq!(escape_key_bytes(&[124]), "/%DCN124%/");
        assert_eq!(escape_key_bytes(&[126]), "/%DCN126%/");
        assert_eq!(escape_key_bytes(&[65, 0, 66]), "A/%DCN000%/B");
    }

    #[test]
    fn keys_are_stable() {
        let mut rng = StdRng::seed_from_u64(11);
        let lock = generate_lock(&mut rng);
        assert_eq!(key_for(&lock), key_for(&lock));
    }
}
