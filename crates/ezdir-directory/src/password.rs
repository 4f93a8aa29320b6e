//! Salted SHA1 (SSHA) password hashing for directory entries.
//!
//! SSHA is the historical OpenLDAP default for `userPassword`: the base64
//! payload is the SHA1 digest of password-then-salt, followed by the salt
//! itself.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::Rng;
use sha1::{Digest, Sha1};

/// Scheme prefix on hashed `userPassword` values.
const SSHA_PREFIX: &str = "{SSHA}";

/// SHA1 digests are 20 bytes; anything after is the salt.
const DIGEST_LEN: usize = 20;

/// Characters easily confused with each other in printed passwords.
const AMBIGUOUS: &[char] = &['1', 'l', 'I', 'O', '0'];

/// Hashes and salts a password for use as an LDAP `userPassword` value.
#[must_use]
pub fn ssha_password(plain: &str) -> String {
    let salt: [u8; 4] = rand::thread_rng().gen();
    ssha_with_salt(plain, &salt)
}

fn ssha_with_salt(plain: &str, salt: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(plain.as_bytes());
    hasher.update(salt);

    let mut payload = hasher.finalize().to_vec();
    payload.extend_from_slice(salt);
    format!("{SSHA_PREFIX}{}", BASE64.encode(payload))
}

/// Checks a plaintext password against an SSHA-hashed value.
///
/// Returns false for values that are not well-formed SSHA hashes.
#[must_use]
pub fn ssha_verify(hashed: &str, plain: &str) -> bool {
    let Some(encoded) = hashed.strip_prefix(SSHA_PREFIX) else {
        return false;
    };
    let Ok(payload) = BASE64.decode(encoded) else {
        return false;
    };
    if payload.len() < DIGEST_LEN {
        return false;
    }

    let salt = &payload[DIGEST_LEN..];
    ssha_with_salt(plain, salt) == hashed
}

/// Generates a readable random password.
///
/// Draws from ASCII letters and digits; ambiguous characters (`1lIO0`) are
/// excluded unless `ambiguous_chars` is set.
#[must_use]
pub fn random_password(length: usize, ambiguous_chars: bool) -> String {
    let charset: Vec<char> = ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .filter(|ch| ambiguous_chars || !AMBIGUOUS.contains(ch))
        .collect();

    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| charset[rng.gen_range(0..charset.len())])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = ssha_password("test1234");
        assert!(hashed.starts_with("{SSHA}"));
        assert!(ssha_verify(&hashed, "test1234"));
        assert!(!ssha_verify(&hashed, "wrong"));
    }

    #[test]
    fn hashes_are_salted() {
        // Same password, different salt, different hash.
        assert_ne!(ssha_password("test1234"), ssha_password("test1234"));
    }

    #[test]
    fn known_salt_round_trip() {
        let hashed = ssha_with_salt("secret", &[1, 2, 3, 4]);
        assert!(ssha_verify(&hashed, "secret"));
        assert!(!ssha_verify(&hashed, "Secret"));
    }

    #[test]
    fn verify_rejects_malformed_values() {
        assert!(!ssha_verify("secret", "secret"));
        assert!(!ssha_verify("{SSHA}not-base64!!!", "secret"));
        assert!(!ssha_verify("{SSHA}c2hvcnQ=", "secret"));
    }

    #[test]
    fn random_password_length_and_charset() {
        let password = random_password(10, false);
        assert_eq!(password.len(), 10);
        assert!(password
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() && !"1lIO0".contains(ch)));
    }

    #[test]
    fn random_password_can_include_ambiguous_chars() {
        // With ambiguous characters allowed the charset is the full
        // alphanumeric range; just check the output stays alphanumeric.
        let password = random_password(64, true);
        assert!(password.chars().all(|ch| ch.is_ascii_alphanumeric()));
    }
}
