//! Object identifiers for the ShangMi suite and the standard algorithms this
//! provider recognizes alongside it.
//!
//! The GM/T arc is `1.2.156.10197`. Everything under it is specific to the
//! national suite; the remaining identifiers are the usual RFC 5280 / SEC
//! assignments, listed so certificates carrying them can at least be
//! classified (and rejected with a precise error) rather than failing to
//! parse.

use der::asn1::ObjectIdentifier;

/// `id-ecPublicKey`: generic elliptic curve key. SM2 subject public key info
/// structures reuse this identifier with the SM2 named curve as parameters.
pub const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// The SM2 recommended 256-bit prime curve.
pub const SM2_NAMED_CURVE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.301");

/// SM2 signing with the SM3 digest.
pub const SM2_WITH_SM3: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.501");

/// SM2 signing with SHA-1 (legacy GM/T assignment, never implemented here).
pub const SM2_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.502");

/// SM2 signing with SHA-256 (legacy GM/T assignment, never implemented here).
pub const SM2_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.503");

/// The SM3 digest algorithm.
pub const SM3: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.401");

// Standard signature algorithms, recognized for classification only.

/// `ecdsa-with-SHA256`.
pub const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

/// `ecdsa-with-SHA384`.
pub const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");

/// `sha256WithRSAEncryption`.
pub const SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");

/// `rsaEncryption`.
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// `id-dsa`.
pub const DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");

/// `id-at-commonName`.
pub const AT_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

// X.509 extension identifiers (RFC 5280 §4.2).

/// `id-ce-subjectKeyIdentifier`.
pub const EXT_SUBJECT_KEY_ID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");

/// `id-ce-keyUsage`.
pub const EXT_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");

/// `id-ce-subjectAltName`.
pub const EXT_SUBJECT_ALT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.17");

/// `id-ce-basicConstraints`.
pub const EXT_BASIC_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.19");

/// `id-ce-nameConstraints`.
pub const EXT_NAME_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.30");

/// `id-ce-cRLDistributionPoints`.
pub const EXT_CRL_DISTRIBUTION_POINTS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.5.29.31");

/// `id-ce-certificatePolicies`.
pub const EXT_CERTIFICATE_POLICIES: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.32");

/// `id-ce-authorityKeyIdentifier`.
pub const EXT_AUTHORITY_KEY_ID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.35");

/// `id-ce-extKeyUsage`.
pub const EXT_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37");

/// `id-pe-authorityInfoAccess`.
pub const EXT_AUTHORITY_INFO_ACCESS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.1.1");

/// `id-ad-ocsp` authority information access method.
pub const AD_OCSP: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1");

/// `id-ad-caIssuers` authority information access method.
pub const AD_CA_ISSUERS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.2");

// Extended key usage purposes (RFC 5280 §4.2.1.12 plus the two legacy
// server-gated-crypto assignments).

/// `anyExtendedKeyUsage`.
pub const EKU_ANY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37.0");

/// `id-kp-serverAuth`.
pub const EKU_SERVER_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.1");

/// `id-kp-clientAuth`.
pub const EKU_CLIENT_AUTH: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.2");

/// `id-kp-codeSigning`.
pub const EKU_CODE_SIGNING: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.3");

/// `id-kp-emailProtection`.
pub const EKU_EMAIL_PROTECTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.4");

/// `id-kp-ipsecEndSystem`.
pub const EKU_IPSEC_END_SYSTEM: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.5");

/// `id-kp-ipsecTunnel`.
pub const EKU_IPSEC_TUNNEL: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.6");

/// `id-kp-ipsecUser`.
pub const EKU_IPSEC_USER: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.7");

/// `id-kp-timeStamping`.
pub const EKU_TIME_STAMPING: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.8");

/// `id-kp-OCSPSigning`.
pub const EKU_OCSP_SIGNING: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.9");

/// Microsoft server-gated crypto.
pub const EKU_MICROSOFT_SGC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.10.3.3");

/// Netscape server-gated crypto.
pub const EKU_NETSCAPE_SGC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.113730.4.1");
