//! Confirmation nonce generation.

use rand::rngs::OsRng;
use rand::Rng;

/// Symbols a nonce is drawn from. Lowercase alphanumerics keep links URL-safe.
pub const ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Default nonce length.
pub const DEFAULT_LENGTH: usize = 32;

/// Generate a nonce of `len` symbols sampled uniformly from [`ALPHABET`]
/// using the operating system's CSPRNG.
pub fn generate_nonce(len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_length_and_alphabet() {
        let nonce = generate_nonce(DEFAULT_LENGTH);
        assert_eq!(nonce.len(), DEFAULT_LENGTH);
        assert!(nonce.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_zero_length() {
        assert_eq!(generate_nonce(0), "");
    }

    #[test]
    fn test_no_repeats_in_sample() {
        let nonces: HashSet<String> = (0..1000).map(|_| generate_nonce(DEFAULT_LENGTH)).collect();
        assert_eq!(nonces.len(), 1000);
    }
}
