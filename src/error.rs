//! Error types.

use crate::x509::Certificate;
use crate::passwd::PasswordError;

/// Result type with the `sm2-csp` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error type covering every operation of the provider: key codecs, the
/// capability registry, the key stores and certificate chain validation.
///
/// Verification failures always surface as a specific variant so callers can
/// inspect why a certificate or signature was rejected, never as a bare
/// boolean.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A required argument was empty or otherwise unusable.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// No capability is registered for the supplied options or key type.
    #[error("unsupported options: {0}")]
    UnsupportedOptions(&'static str),

    /// The algorithm identifier is recognized but not implemented by this
    /// provider.
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    /// None of the supported key encodings matched the supplied bytes.
    #[error("unsupported key encoding")]
    UnsupportedKeyEncoding,

    /// A recovered private scalar was zero or not below the curve order.
    #[error("private key scalar out of range for the SM2 curve")]
    KeyOutOfRange,

    /// A derived public point failed the on-curve or non-identity check.
    #[error("derived key failed curve validity check")]
    InvalidDerivedKey,

    /// A signature did not verify against the supplied key and digest.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The certificate is outside its validity window.
    #[error("certificate has expired or is not yet valid")]
    Expired,

    /// A permitted-DNS-domains name constraint rejected the requested name.
    #[error("certificate is not authorized for the requested DNS name")]
    NameConstraintViolation,

    /// The certificate does not cover the requested hostname.
    #[error("certificate is not valid for hostname {0:?}")]
    HostnameMismatch(String),

    /// A path member is not authorized to sign certificates.
    #[error("certificate is not authorized to sign other certificates")]
    NotAuthorizedToSign,

    /// A CA's path length constraint was exceeded.
    #[error("too many intermediates for path length constraint")]
    TooManyIntermediates,

    /// No candidate chain satisfies the requested extended key usage.
    #[error("certificate specifies an incompatible key usage")]
    IncompatibleUsage,

    /// The certificate carries a critical extension this provider does not
    /// understand.
    #[error("unhandled critical extension")]
    UnhandledCriticalExtension,

    /// No verified path to a trusted root was found. Carries a best-effort
    /// diagnostic: one candidate authority that failed, and why.
    #[error("certificate signed by unknown authority{}", unknown_authority_hint(.hint_cert, .hint_err))]
    UnknownAuthority {
        /// A candidate authority certificate rejected during the search.
        hint_cert: Option<Box<Certificate>>,
        /// The reason that candidate was rejected.
        hint_err: Option<Box<Error>>,
    },

    /// No key with the requested identifier exists in the key store.
    #[error("key not found")]
    NotFound,

    /// Key store I/O failure.
    #[error("key store I/O error: {0}")]
    Storage(#[from] std::io::Error),

    /// ASN.1 encoding or decoding failure.
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),

    /// PEM encapsulation failure.
    #[error("PEM error: {0}")]
    Pem(#[from] pem_rfc7468::Error),

    /// The supplied password does not satisfy the password policy.
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Opaque failure inside the elliptic curve primitives.
    #[error("SM2 primitive failure")]
    Crypto,
}

fn unknown_authority_hint(
    hint_cert: &Option<Box<Certificate>>,
    hint_err: &Option<Box<Error>>,
) -> String {
    match (hint_cert, hint_err) {
        (Some(cert), Some(err)) => format!(
            " (possibly because of {err:?} while trying to verify candidate authority certificate {cert})"
        ),
        _ => String::new(),
    }
}
