//! System-generated secret strings.

use rand::Rng;

/// Character set for generated secrets. Alphanumerics plus a small symbol
/// set that survives URL encoding and shell quoting.
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*-_";

/// Generates a random secret of `length` characters from a fixed charset.
///
/// Drawn from the OS-seeded CSPRNG. Intended for system-generated secrets
/// (API tokens, recovery codes), not for end-user passwords.
pub fn generate_secure_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
