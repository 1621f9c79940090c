use rand::{rng, Rng};

/// Alphabet of generated ids: `[a-zA-Z0-9]`
pub const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random short id of exactly `length` characters.
///
/// Each character is drawn independently and uniformly from [`CHARSET`]
/// using the thread-local CSPRNG, so ids cannot be enumerated by guessing.
pub fn generate_short_id(length: usize) -> String {
    let mut rng = rng();
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generated_id_has_requested_length() {
        for length in [1, 4, 6, 12, 32] {
            assert_eq!(generate_short_id(length).len(), length);
        }
        assert!(generate_short_id(0).is_empty());
    }

    #[test]
    fn test_generated_id_uses_alphabet_only() {
        let id = generate_short_id(256);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_charset_has_62_distinct_symbols() {
        let distinct: HashSet<_> = CHARSET.iter().collect();
        assert_eq!(CHARSET.len(), 62);
        assert_eq!(distinct.len(), 62);
    }

    #[test]
    fn test_ten_thousand_ids_are_distinct() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_short_id(6)).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_draws_cover_the_alphabet() {
        let seen: HashSet<char> = generate_short_id(20_000).chars().collect();
        assert_eq!(seen.len(), CHARSET.len());
    }
}
