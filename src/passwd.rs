//! Password policy for key-protecting credentials.
//!
//! A password is acceptable when it is at least six bytes long and mixes at
//! least two of the four character classes (uppercase, lowercase, digits,
//! specials). The policy gates [`crate::FileKeyStore`] construction and the
//! key re-encryption helper below.

use crate::{
    codec,
    error::{Error, Result},
    key::Key,
};
use std::fs;
use std::path::Path;

/// Minimum acceptable password length, in bytes.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimum number of distinct character classes a password must mix.
pub const MIN_CHARACTER_CLASSES: usize = 2;

/// The punctuation bytes counted as the "special" character class.
pub const SPECIAL_CHARACTERS: &[u8] = br##"!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~"##;

/// Password policy violations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PasswordError {
    /// Shorter than [`MIN_PASSWORD_LEN`] bytes.
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,

    /// Fewer than [`MIN_CHARACTER_CLASSES`] character classes present.
    #[error(
        "password must mix at least {MIN_CHARACTER_CLASSES} of: \
         uppercase, lowercase, digits, special characters"
    )]
    InsufficientComplexity,
}

/// Check a password against the policy.
pub fn check_password(password: &[u8]) -> core::result::Result<(), PasswordError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }

    let mut upper = false;
    let mut lower = false;
    let mut digit = false;
    let mut special = false;
    for &b in password {
        if b.is_ascii_uppercase() {
            upper = true;
        } else if b.is_ascii_lowercase() {
            lower = true;
        } else if b.is_ascii_digit() {
            digit = true;
        } else if SPECIAL_CHARACTERS.contains(&b) {
            special = true;
        }
    }

    let classes = usize::from(upper) + usize::from(lower) + usize::from(digit) + usize::from(special);
    if classes < MIN_CHARACTER_CLASSES {
        return Err(PasswordError::InsufficientComplexity);
    }
    Ok(())
}

/// Re-encrypt a PEM private key file in place under a new credential.
///
/// Reads the key at `path` (decrypting with `old_password` when the file is
/// protected), then rewrites it protected with `new_password`, or in
/// plaintext when `new_password` is `None`. A non-`None` new password must
/// satisfy the policy.
pub fn reencrypt_private_key_file(
    path: impl AsRef<Path>,
    old_password: Option<&[u8]>,
    new_password: Option<&[u8]>,
) -> Result<()> {
    if let Some(new) = new_password {
        check_password(new)?;
    }

    let pem = fs::read_to_string(path.as_ref())?;
    let key = codec::pem_to_private_key(&pem, old_password)?;
    let Key::Private(private) = key else {
        return Err(Error::InvalidInput("file does not hold a private key"));
    };
    let rewritten = codec::private_key_to_pem(&private, new_password)?;
    fs::write(path.as_ref(), rewritten.as_bytes())?;
    Ok(())
}
