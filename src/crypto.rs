//! Session id generation.

/// Length of generated session ids, in characters.
///
/// 32 alphanumeric characters is roughly 190 bits of entropy.
pub const SESSION_ID_LENGTH: usize = 32;

/// Generates a random alphanumeric token of the given length.
pub fn generate_token(length: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

/// Generates a new session id.
///
/// The store never generates ids itself; the session layer calls this when a
/// login establishes a new session.
pub fn generate_session_id() -> String {
    generate_token(SESSION_ID_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_length() {
        assert_eq!(generate_token(8).len(), 8);
        assert_eq!(generate_token(64).len(), 64);
    }

    #[test]
    fn test_generate_token_alphanumeric() {
        let token = generate_token(128);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_session_id_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_eq!(a.len(), SESSION_ID_LENGTH);
        assert_ne!(a, b);
    }
}
