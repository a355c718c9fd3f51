use sha2::Digest;
use sha2::Sha256;

/// Hex-encoded SHA-256 of a token, used to look up session records without
/// storing the token itself.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_digest_is_stable_hex() {
        let digest = token_digest("header.payload.signature");

        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, token_digest("header.payload.signature"));
        assert_ne!(digest, token_digest("header.payload.signaturf"));
    }

    #[test]
    fn test_token_digest_known_value() {
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
