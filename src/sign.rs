//! SM2DSA signing and verification bridge.
//!
//! The provider signs whatever digest the caller supplies, feeding it to the
//! SM2 scheme as the message input (the scheme prepends the signer identity
//! hash `Z` and re-digests internally, per GM/T 0003.2). Signatures travel as
//! a DER `SEQUENCE { r INTEGER, s INTEGER }`, the encoding the surrounding
//! X.509 ecosystem expects.

use crate::error::{Error, Result};
use der::{asn1::UintRef, Decode, Encode, Sequence};
use sm2::{
    dsa::{Signature, SigningKey, VerifyingKey},
    FieldBytes, PublicKey, SecretKey,
};
use signature::{Signer, Verifier};

/// Default signer distinguishing identifier, per GM/T 0009-2012.
///
/// This is a protocol-level constant shared by every signer and verifier in
/// the deployment, not a secret. It must match on both sides or verification
/// fails.
pub const DEFAULT_DIST_ID: &str = "1234567812345678";

/// `SEQUENCE { r INTEGER, s INTEGER }` signature wrapper.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct DerSignature<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

/// Sign `digest` with the fixed default distinguishing identifier, returning
/// the DER-encoded signature.
pub fn sign_digest(secret: &SecretKey, digest: &[u8]) -> Result<Vec<u8>> {
    let signing_key = SigningKey::new(DEFAULT_DIST_ID, secret).map_err(|_| Error::Crypto)?;
    let signature: Signature = signing_key.try_sign(digest).map_err(|_| Error::Crypto)?;
    encode_signature(&signature)
}

/// Verify a DER-encoded signature over `digest` with the fixed default
/// distinguishing identifier.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify;
/// malformed signature bytes are an error.
pub fn verify_digest(public: &PublicKey, signature: &[u8], digest: &[u8]) -> Result<bool> {
    let signature = decode_signature(signature)?;
    let verifying_key = VerifyingKey::new(DEFAULT_DIST_ID, *public).map_err(|_| Error::Crypto)?;
    Ok(verifying_key.verify(digest, &signature).is_ok())
}

/// Encode the two signature scalars as a DER SEQUENCE of INTEGERs.
pub fn encode_signature(signature: &Signature) -> Result<Vec<u8>> {
    let r_bytes = signature.r_bytes();
    let s_bytes = signature.s_bytes();
    let der_sig = DerSignature {
        r: UintRef::new(strip_leading_zeroes(r_bytes.as_slice()))?,
        s: UintRef::new(strip_leading_zeroes(s_bytes.as_slice()))?,
    };
    Ok(der_sig.to_der()?)
}

/// Decode a DER SEQUENCE of two INTEGERs into an SM2 signature.
pub fn decode_signature(der: &[u8]) -> Result<Signature> {
    let sig = DerSignature::from_der(der).map_err(|_| Error::InvalidSignature)?;
    Signature::from_scalars(pad_scalar(sig.r.as_bytes())?, pad_scalar(sig.s.as_bytes())?)
        .map_err(|_| Error::InvalidSignature)
}

fn strip_leading_zeroes(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    &bytes[start..]
}

fn pad_scalar(bytes: &[u8]) -> Result<FieldBytes> {
    if bytes.len() > 32 {
        return Err(Error::InvalidSignature);
    }
    let mut padded = FieldBytes::default();
    padded[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(padded)
}
