//! Short code generation and validation utilities.

use rand::Rng;

/// Length of every generated short code.
pub const SHORT_CODE_LENGTH: usize = 6;

/// The 62-symbol alphabet short codes are drawn from.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random code of `length` characters.
///
/// Each character is drawn independently and uniformly from the alphanumeric
/// alphabet using the thread-local CSPRNG. Uniqueness is not guaranteed; the
/// caller checks for collisions against the active backend.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code(SHORT_CODE_LENGTH);
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();

    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Returns true if `code` could have been produced by [`generate_code`] with
/// [`SHORT_CODE_LENGTH`].
pub fn is_short_code(code: &str) -> bool {
    code.len() == SHORT_CODE_LENGTH && code.bytes().all(|b| b.is_ascii_alphanumeric())
}
