//! PEM/DER codecs for SM2 key material.
//!
//! Private keys are PKCS#8-wrapped (`id-ecPublicKey` algorithm with the SM2
//! named curve as parameters, SEC1 `ECPrivateKey` inside), public keys are
//! PKIX `SubjectPublicKeyInfo`. Password-protected output wraps the DER
//! payload in PBES2 with a fixed PBKDF2-SHA256 + AES-256-CBC scheme; the
//! cipher is a configuration constant of the provider, not a negotiated
//! parameter.
//!
//! Decoding is deliberately more liberal than encoding: the GM ecosystem
//! emits PKCS#8 blobs whose algorithm identifier and parameters vary, plus
//! bare SEC1 keys, and `SubjectPublicKeyInfo` wrappers whose identifiers are
//! ambiguous between SM2 and generic EC. See [`parse_private_key`] and
//! [`parse_public_key`] for the exact acceptance rules.

use crate::{
    error::{Error, Result},
    key::{Key, Sm2PrivateKey, Sm2PublicKey},
    oid,
};
use der::Decode;
use pem_rfc7468::LineEnding;
use pkcs8::{
    pkcs5::{pbes2, EncryptionScheme},
    DecodePrivateKey, EncodePrivateKey, EncryptedPrivateKeyInfo, PrivateKeyInfo,
};
use rand_core::{OsRng, RngCore};
use sm2::{FieldBytes, PublicKey, SecretKey};
use spki::{EncodePublicKey, SubjectPublicKeyInfoRef};

/// PBKDF2 iteration count for password-protected PEM output.
const PBES2_ITERATIONS: u32 = 100_000;

/// Uncompressed SEC1 point length for the SM2 curve (0x04 || X || Y).
const UNCOMPRESSED_POINT_LEN: usize = 65;

/// Parse a DER-encoded SM2 private key.
///
/// Tries, in order: a standard PKCS#8 unwrap (algorithm `id-ecPublicKey`,
/// parameters naming the SM2 curve), a liberal PKCS#8 unwrap accepting the
/// identifier variations seen in GM toolchains, and finally a bare SEC1
/// `ECPrivateKey`. Fails with [`Error::UnsupportedKeyEncoding`] when nothing
/// matches, or [`Error::KeyOutOfRange`] when a scalar was recovered but is
/// zero or not below the curve order.
pub fn parse_private_key(der: &[u8]) -> Result<Key> {
    if der.is_empty() {
        return Err(Error::InvalidInput("DER bytes must not be empty"));
    }

    if let Ok(secret) = SecretKey::from_pkcs8_der(der) {
        return Ok(Key::Private(secret.into()));
    }

    if let Ok(pki) = PrivateKeyInfo::try_from(der) {
        return private_key_from_pkcs8(&pki);
    }

    if let Ok(ec) = sec1::EcPrivateKey::from_der(der) {
        return Ok(Key::Private(secret_from_scalar_bytes(ec.private_key)?.into()));
    }

    Err(Error::UnsupportedKeyEncoding)
}

/// Liberal PKCS#8 unwrap for keys the strict decoder rejected.
///
/// Accepts `id-ecPublicKey` or the SM2 curve identifier in the algorithm
/// position; when curve parameters are present they must name the SM2 curve,
/// so a P-256 key is refused rather than silently reinterpreted.
fn private_key_from_pkcs8(pki: &PrivateKeyInfo<'_>) -> Result<Key> {
    let alg = pki.algorithm.oid;
    if alg != oid::EC_PUBLIC_KEY && alg != oid::SM2_NAMED_CURVE {
        return Err(Error::UnsupportedKeyEncoding);
    }
    if let Ok(params) = pki.algorithm.parameters_oid() {
        if params != oid::SM2_NAMED_CURVE {
            return Err(Error::UnsupportedKeyEncoding);
        }
    }

    let ec = sec1::EcPrivateKey::from_der(pki.private_key)
        .map_err(|_| Error::UnsupportedKeyEncoding)?;
    Ok(Key::Private(secret_from_scalar_bytes(ec.private_key)?.into()))
}

/// Rebuild a secret key from big-endian scalar bytes, tolerating the leading
/// zero padding (or stripping) some encoders produce.
fn secret_from_scalar_bytes(mut bytes: &[u8]) -> Result<SecretKey> {
    while bytes.len() > 32 {
        if bytes[0] != 0 {
            return Err(Error::KeyOutOfRange);
        }
        bytes = &bytes[1..];
    }
    let mut padded = FieldBytes::default();
    padded[32 - bytes.len()..].copy_from_slice(bytes);
    SecretKey::from_bytes(&padded).map_err(|_| Error::KeyOutOfRange)
}

/// Parse a DER-encoded PKIX (`SubjectPublicKeyInfo`) public key.
///
/// The SPKI wrappers produced by the GM ecosystem carry ambiguous algorithm
/// identifiers, so the decoder does not trust them: it attempts a fixed-size
/// uncompressed point decode against the SM2 curve and accepts only when the
/// point is on-curve. Anything else is [`Error::UnsupportedKeyEncoding`].
pub fn parse_public_key(der: &[u8]) -> Result<Key> {
    if der.is_empty() {
        return Err(Error::InvalidInput("DER bytes must not be empty"));
    }

    let spki =
        SubjectPublicKeyInfoRef::try_from(der).map_err(|_| Error::UnsupportedKeyEncoding)?;
    let point = spki
        .subject_public_key
        .as_bytes()
        .ok_or(Error::UnsupportedKeyEncoding)?;

    if point.len() != UNCOMPRESSED_POINT_LEN {
        return Err(Error::UnsupportedKeyEncoding);
    }
    let public = PublicKey::from_sec1_bytes(point).map_err(|_| Error::UnsupportedKeyEncoding)?;
    Ok(Key::Public(public.into()))
}

/// Serialize a private key to PKCS#8 PEM, optionally PBES2-encrypted.
pub fn private_key_to_pem(key: &Sm2PrivateKey, password: Option<&[u8]>) -> Result<String> {
    let secret = key.as_secret_key();
    match password {
        None => {
            let pem = secret.to_pkcs8_pem(LineEnding::LF).map_err(|_| Error::Crypto)?;
            Ok(pem.to_string())
        }
        Some(password) => {
            let doc = secret.to_pkcs8_der().map_err(|_| Error::Crypto)?;
            let pki = PrivateKeyInfo::try_from(doc.as_bytes()).map_err(|_| Error::Crypto)?;
            let (salt, iv) = fresh_salt_iv();
            let params = pbes2_parameters(&salt, &iv)?;
            let encrypted = pki
                .encrypt_with_params(params, password)
                .map_err(|_| Error::Crypto)?;
            let pem = encrypted
                .to_pem("ENCRYPTED PRIVATE KEY", LineEnding::LF)
                .map_err(|_| Error::Crypto)?;
            Ok(pem.to_string())
        }
    }
}

/// Serialize a public key to PKIX PEM, optionally PBES2-encrypted.
pub fn public_key_to_pem(key: &Sm2PublicKey, password: Option<&[u8]>) -> Result<String> {
    let public = key.as_public_key();
    match password {
        None => public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|_| Error::Crypto),
        Some(password) => {
            let doc = public.to_public_key_der().map_err(|_| Error::Crypto)?;
            let (salt, iv) = fresh_salt_iv();
            let params = pbes2_parameters(&salt, &iv)?;
            let ciphertext = params
                .encrypt(password, doc.as_bytes())
                .map_err(|_| Error::Crypto)?;
            let wrapper = EncryptedPrivateKeyInfo {
                encryption_algorithm: EncryptionScheme::Pbes2(params),
                encrypted_data: &ciphertext,
            };
            let der = der::Encode::to_der(&wrapper)?;
            Ok(pem_rfc7468::encode_string(
                "ENCRYPTED PUBLIC KEY",
                LineEnding::LF,
                &der,
            )?)
        }
    }
}

/// Parse a PEM-encoded private key, decrypting when the block is protected.
pub fn pem_to_private_key(pem: &str, password: Option<&[u8]>) -> Result<Key> {
    let (label, der) = decode_pem(pem)?;
    match label.as_str() {
        "PRIVATE KEY" | "EC PRIVATE KEY" => parse_private_key(&der),
        "ENCRYPTED PRIVATE KEY" => {
            let password = password.ok_or(Error::InvalidInput(
                "encrypted private key requires a password",
            ))?;
            let plaintext = decrypt_pbes2(&der, password)?;
            parse_private_key(&plaintext)
        }
        _ => Err(Error::UnsupportedKeyEncoding),
    }
}

/// Parse a PEM-encoded public key, decrypting when the block is protected.
pub fn pem_to_public_key(pem: &str, password: Option<&[u8]>) -> Result<Key> {
    let (label, der) = decode_pem(pem)?;
    match label.as_str() {
        "PUBLIC KEY" => parse_public_key(&der),
        "ENCRYPTED PUBLIC KEY" => {
            let password = password.ok_or(Error::InvalidInput(
                "encrypted public key requires a password",
            ))?;
            let plaintext = decrypt_pbes2(&der, password)?;
            parse_public_key(&plaintext)
        }
        _ => Err(Error::UnsupportedKeyEncoding),
    }
}

/// Parse a PEM-encoded certificate into the provider's certificate record.
pub fn pem_to_certificate(pem: &str) -> Result<crate::x509::Certificate> {
    let (label, der) = decode_pem(pem)?;
    if label != "CERTIFICATE" {
        return Err(Error::InvalidInput("PEM block is not a certificate"));
    }
    crate::x509::parse_certificate(&der)
}

fn decode_pem(pem: &str) -> Result<(String, Vec<u8>)> {
    let (label, der) = pem_rfc7468::decode_vec(pem.as_bytes())
        .map_err(|_| Error::InvalidInput("malformed PEM document"))?;
    Ok((label.to_string(), der))
}

fn decrypt_pbes2(der: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    let encrypted =
        EncryptedPrivateKeyInfo::try_from(der).map_err(|_| Error::UnsupportedKeyEncoding)?;
    let doc = encrypted
        .decrypt(password)
        .map_err(|_| Error::InvalidInput("decryption failed (wrong password?)"))?;
    Ok(doc.as_bytes().to_vec())
}

fn fresh_salt_iv() -> ([u8; 16], [u8; 16]) {
    let mut salt = [0u8; 16];
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);
    (salt, iv)
}

fn pbes2_parameters<'a>(salt: &'a [u8; 16], iv: &'a [u8; 16]) -> Result<pbes2::Parameters<'a>> {
    pbes2::Parameters::pbkdf2_sha256_aes256cbc(PBES2_ITERATIONS, salt, iv)
        .map_err(|_| Error::Crypto)
}
