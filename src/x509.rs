//! X.509 certificate parsing and chain validation for SM2-with-SM3
//! certificates.
//!
//! The strict profile in the `x509-cert` crate rejects many certificates
//! produced by GM toolchains (non-minimal serials, unusual name encodings,
//! stale UTCTime forms). The parser here decodes the outer structure with a
//! tolerant template that captures the raw `tbsCertificate` bytes exactly as
//! signed, then lifts the well-known extensions into a flat
//! [`Certificate`] record. Chain building and verification live in
//! [`mod@self::verify`] and are exposed as methods on [`Certificate`].

mod verify;

pub use verify::VerifyOptions;

use crate::{
    error::{Error, Result},
    oid,
};
use der::{
    asn1::{AnyRef, BitStringRef, IntRef, ObjectIdentifier, OctetString},
    Decode, Encode, Sequence,
};
use spki::AlgorithmIdentifierRef;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::OnceLock;
use std::time::SystemTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::{
    name::{DistributionPointName, GeneralName},
    AuthorityInfoAccessSyntax, AuthorityKeyIdentifier, BasicConstraints, CertificatePolicies,
    CrlDistributionPoints, ExtendedKeyUsage, KeyUsage, NameConstraints, SubjectAltName,
    SubjectKeyIdentifier,
};
use x509_cert::name::RdnSequence;
use x509_cert::time::Validity;

/// Signature algorithm of a parsed certificate.
///
/// Only [`SignatureAlgorithm::Sm2WithSm3`] is verifiable by this provider;
/// the rest exist so rejection carries a precise classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SignatureAlgorithm {
    /// SM2 signing over an SM3 digest (GM/T 0003).
    Sm2WithSm3,
    /// Legacy SM2-with-SHA1 assignment.
    Sm2WithSha1,
    /// Legacy SM2-with-SHA256 assignment.
    Sm2WithSha256,
    /// ECDSA with SHA-256.
    EcdsaWithSha256,
    /// ECDSA with SHA-384.
    EcdsaWithSha384,
    /// RSA PKCS#1 v1.5 with SHA-256.
    Sha256WithRsa,
    /// Anything else.
    Unknown,
}

impl SignatureAlgorithm {
    fn from_oid(o: ObjectIdentifier) -> Self {
        if o == oid::SM2_WITH_SM3 {
            Self::Sm2WithSm3
        } else if o == oid::SM2_WITH_SHA1 {
            Self::Sm2WithSha1
        } else if o == oid::SM2_WITH_SHA256 {
            Self::Sm2WithSha256
        } else if o == oid::ECDSA_WITH_SHA256 {
            Self::EcdsaWithSha256
        } else if o == oid::ECDSA_WITH_SHA384 {
            Self::EcdsaWithSha384
        } else if o == oid::SHA256_WITH_RSA {
            Self::Sha256WithRsa
        } else {
            Self::Unknown
        }
    }
}

/// Subject public key algorithm family of a parsed certificate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum PublicKeyAlgorithm {
    /// Elliptic curve (covers SM2, which reuses `id-ecPublicKey`).
    Ec,
    /// RSA.
    Rsa,
    /// DSA.
    Dsa,
    /// Anything else.
    Unknown,
}

impl PublicKeyAlgorithm {
    fn from_oid(o: ObjectIdentifier) -> Self {
        if o == oid::EC_PUBLIC_KEY || o == oid::SM2_NAMED_CURVE {
            Self::Ec
        } else if o == oid::RSA_ENCRYPTION {
            Self::Rsa
        } else if o == oid::DSA {
            Self::Dsa
        } else {
            Self::Unknown
        }
    }
}

/// Extended key usage purposes recognized by the chain validator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ExtKeyUsage {
    /// `anyExtendedKeyUsage`: satisfies every requested purpose.
    Any,
    /// TLS server authentication.
    ServerAuth,
    /// TLS client authentication.
    ClientAuth,
    /// Code signing.
    CodeSigning,
    /// Email protection (S/MIME).
    EmailProtection,
    /// IPSEC end system.
    IpsecEndSystem,
    /// IPSEC tunnel.
    IpsecTunnel,
    /// IPSEC user.
    IpsecUser,
    /// Trusted timestamping.
    TimeStamping,
    /// OCSP response signing.
    OcspSigning,
    /// Microsoft server-gated crypto (treated as server auth).
    MicrosoftServerGatedCrypto,
    /// Netscape server-gated crypto (treated as server auth).
    NetscapeServerGatedCrypto,
}

impl ExtKeyUsage {
    /// Map a KeyPurposeId to a known usage, or `None` when unrecognized.
    pub fn from_oid(o: ObjectIdentifier) -> Option<Self> {
        const KNOWN: &[(ObjectIdentifier, ExtKeyUsage)] = &[
            (oid::EKU_ANY, ExtKeyUsage::Any),
            (oid::EKU_SERVER_AUTH, ExtKeyUsage::ServerAuth),
            (oid::EKU_CLIENT_AUTH, ExtKeyUsage::ClientAuth),
            (oid::EKU_CODE_SIGNING, ExtKeyUsage::CodeSigning),
            (oid::EKU_EMAIL_PROTECTION, ExtKeyUsage::EmailProtection),
            (oid::EKU_IPSEC_END_SYSTEM, ExtKeyUsage::IpsecEndSystem),
            (oid::EKU_IPSEC_TUNNEL, ExtKeyUsage::IpsecTunnel),
            (oid::EKU_IPSEC_USER, ExtKeyUsage::IpsecUser),
            (oid::EKU_TIME_STAMPING, ExtKeyUsage::TimeStamping),
            (oid::EKU_OCSP_SIGNING, ExtKeyUsage::OcspSigning),
            (oid::EKU_MICROSOFT_SGC, ExtKeyUsage::MicrosoftServerGatedCrypto),
            (oid::EKU_NETSCAPE_SGC, ExtKeyUsage::NetscapeServerGatedCrypto),
        ];
        KNOWN
            .iter()
            .find(|(candidate, _)| *candidate == o)
            .map(|&(_, usage)| usage)
    }

    /// The KeyPurposeId for this usage.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            Self::Any => oid::EKU_ANY,
            Self::ServerAuth => oid::EKU_SERVER_AUTH,
            Self::ClientAuth => oid::EKU_CLIENT_AUTH,
            Self::CodeSigning => oid::EKU_CODE_SIGNING,
            Self::EmailProtection => oid::EKU_EMAIL_PROTECTION,
            Self::IpsecEndSystem => oid::EKU_IPSEC_END_SYSTEM,
            Self::IpsecTunnel => oid::EKU_IPSEC_TUNNEL,
            Self::IpsecUser => oid::EKU_IPSEC_USER,
            Self::TimeStamping => oid::EKU_TIME_STAMPING,
            Self::OcspSigning => oid::EKU_OCSP_SIGNING,
            Self::MicrosoftServerGatedCrypto => oid::EKU_MICROSOFT_SGC,
            Self::NetscapeServerGatedCrypto => oid::EKU_NETSCAPE_SGC,
        }
    }
}

/// A parsed X.509 certificate, flattened for chain validation.
///
/// The `raw_*` fields hold DER exactly as it appeared on the wire; in
/// particular `raw_tbs` is the byte-exact signed region, so signature checks
/// never depend on re-encoding. Equality is raw-bytes equality.
#[derive(Clone, Debug)]
pub struct Certificate {
    /// Complete DER encoding (tbsCertificate, algorithm, signature).
    pub raw: Vec<u8>,
    /// DER encoding of the signed `tbsCertificate` region.
    pub raw_tbs: Vec<u8>,
    /// DER encoding of the `subjectPublicKeyInfo`.
    pub raw_spki: Vec<u8>,
    /// DER encoding of the subject name.
    pub raw_subject: Vec<u8>,
    /// DER encoding of the issuer name.
    pub raw_issuer: Vec<u8>,

    /// Signature bytes, right-aligned.
    pub signature: Vec<u8>,
    /// Algorithm the certificate claims to be signed with.
    pub signature_algorithm: SignatureAlgorithm,

    /// Algorithm family of the subject public key.
    pub public_key_algorithm: PublicKeyAlgorithm,
    /// The subject public key, when it decodes as an SM2 curve point.
    pub public_key: Option<sm2::PublicKey>,

    /// X.509 version (1 through 3).
    pub version: u8,
    /// Serial number, big-endian two's complement bytes.
    pub serial_number: Vec<u8>,
    /// RFC 4514 rendering of the issuer name (best effort).
    pub issuer: String,
    /// RFC 4514 rendering of the subject name (best effort).
    pub subject: String,
    /// Subject common name, when one is present and string-typed.
    pub common_name: Option<String>,
    /// Start of the validity window.
    pub not_before: SystemTime,
    /// End of the validity window.
    pub not_after: SystemTime,

    /// Key usage bits, when the extension is present.
    pub key_usage: Option<KeyUsage>,

    /// Whether a basic constraints extension was present.
    pub basic_constraints_valid: bool,
    /// CA flag from basic constraints.
    pub is_ca: bool,
    /// Path length constraint; `None` means unconstrained.
    pub max_path_len: Option<u8>,

    /// Subject key identifier extension value.
    pub subject_key_id: Vec<u8>,
    /// Authority key identifier extension value.
    pub authority_key_id: Vec<u8>,

    /// DNS names from the subject alternative name extension.
    pub dns_names: Vec<String>,
    /// Email addresses from the subject alternative name extension.
    pub email_addresses: Vec<String>,
    /// IP addresses from the subject alternative name extension.
    pub ip_addresses: Vec<IpAddr>,

    /// Permitted DNS domains from the name constraints extension.
    pub permitted_dns_domains: Vec<String>,
    /// Whether the name constraints extension was marked critical.
    pub permitted_dns_domains_critical: bool,

    /// CRL distribution point URIs.
    pub crl_distribution_points: Vec<String>,
    /// Certificate policy identifiers.
    pub policy_identifiers: Vec<ObjectIdentifier>,
    /// OCSP responder URIs from authority information access.
    pub ocsp_servers: Vec<String>,
    /// Issuing certificate URIs from authority information access.
    pub issuing_certificate_urls: Vec<String>,

    /// Recognized extended key usages.
    pub ext_key_usage: Vec<ExtKeyUsage>,
    /// KeyPurposeIds this provider does not recognize.
    pub unknown_ext_key_usage: Vec<ObjectIdentifier>,

    /// Critical extensions the parser did not understand. Verification
    /// refuses certificates with a non-empty list.
    pub unhandled_critical_extensions: Vec<ObjectIdentifier>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Certificate {}

impl core::fmt::Display for Certificate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.common_name {
            Some(cn) if !cn.is_empty() => f.write_str(cn),
            _ if !self.subject.is_empty() => f.write_str(&self.subject),
            _ => write!(f, "serial:{}", hex::encode(&self.serial_number)),
        }
    }
}

/// Outer certificate shell. `tbs_certificate` stays undecoded so the signed
/// region survives byte-exact.
#[derive(Sequence)]
struct RawCertificate<'a> {
    tbs_certificate: AnyRef<'a>,
    signature_algorithm: AlgorithmIdentifierRef<'a>,
    signature: BitStringRef<'a>,
}

fn default_version() -> u8 {
    0
}

/// Tolerant `tbsCertificate` template: names and the SPKI stay undecoded,
/// the serial is a signed INTEGER, extensions decode individually. The
/// unique-id fields exist only to keep the decoder positionally correct.
#[derive(Sequence)]
#[allow(dead_code)]
struct RawTbsCertificate<'a> {
    #[asn1(context_specific = "0", default = "default_version")]
    version: u8,
    serial_number: IntRef<'a>,
    signature: AlgorithmIdentifierRef<'a>,
    issuer: AnyRef<'a>,
    validity: Validity,
    subject: AnyRef<'a>,
    subject_public_key_info: AnyRef<'a>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    issuer_unique_id: Option<BitStringRef<'a>>,
    #[asn1(context_specific = "2", tag_mode = "IMPLICIT", optional = "true")]
    subject_unique_id: Option<BitStringRef<'a>>,
    #[asn1(context_specific = "3", optional = "true")]
    extensions: Option<Vec<x509_cert::ext::Extension>>,
}

/// Parse a DER-encoded certificate.
///
/// A malformed well-known extension fails the whole parse; an unknown
/// extension is recorded (and, when critical, remembered so verification can
/// refuse the certificate) rather than rejected here.
pub fn parse_certificate(der_bytes: &[u8]) -> Result<Certificate> {
    let outer = RawCertificate::from_der(der_bytes)?;
    let raw_tbs = outer.tbs_certificate.to_der()?;
    let tbs = RawTbsCertificate::from_der(&raw_tbs)?;

    let raw_subject = tbs.subject.to_der()?;
    let raw_issuer = tbs.issuer.to_der()?;
    let raw_spki = tbs.subject_public_key_info.to_der()?;

    let (public_key_algorithm, public_key) =
        match spki::SubjectPublicKeyInfoRef::from_der(&raw_spki) {
            Ok(spki) => (
                PublicKeyAlgorithm::from_oid(spki.algorithm.oid),
                spki.subject_public_key
                    .as_bytes()
                    .and_then(|point| sm2::PublicKey::from_sec1_bytes(point).ok()),
            ),
            Err(_) => (PublicKeyAlgorithm::Unknown, None),
        };

    let (subject, common_name) = render_name(&raw_subject);
    let (issuer, _) = render_name(&raw_issuer);

    // Extract everything still borrowing the TBS buffer before the buffer
    // itself moves into the record.
    let signature_algorithm = SignatureAlgorithm::from_oid(tbs.signature.oid);
    let version = tbs.version.saturating_add(1);
    let serial_number = tbs.serial_number.as_bytes().to_vec();
    let not_before = tbs.validity.not_before.to_system_time();
    let not_after = tbs.validity.not_after.to_system_time();
    let extensions = tbs.extensions;

    let mut cert = Certificate {
        raw: der_bytes.to_vec(),
        raw_tbs,
        raw_spki,
        raw_subject,
        raw_issuer,
        signature: outer.signature.raw_bytes().to_vec(),
        signature_algorithm,
        public_key_algorithm,
        public_key,
        version,
        serial_number,
        issuer,
        subject,
        common_name,
        not_before,
        not_after,
        key_usage: None,
        basic_constraints_valid: false,
        is_ca: false,
        max_path_len: None,
        subject_key_id: Vec::new(),
        authority_key_id: Vec::new(),
        dns_names: Vec::new(),
        email_addresses: Vec::new(),
        ip_addresses: Vec::new(),
        permitted_dns_domains: Vec::new(),
        permitted_dns_domains_critical: false,
        crl_distribution_points: Vec::new(),
        policy_identifiers: Vec::new(),
        ocsp_servers: Vec::new(),
        issuing_certificate_urls: Vec::new(),
        ext_key_usage: Vec::new(),
        unknown_ext_key_usage: Vec::new(),
        unhandled_critical_extensions: Vec::new(),
    };

    for ext in extensions.iter().flatten() {
        apply_extension(&mut cert, ext)?;
    }

    Ok(cert)
}

fn apply_extension(cert: &mut Certificate, ext: &x509_cert::ext::Extension) -> Result<()> {
    let value = ext.extn_value.as_bytes();
    let id = ext.extn_id;
    let mut unhandled = false;

    if id == oid::EXT_KEY_USAGE {
        cert.key_usage = Some(KeyUsage::from_der(value)?);
    } else if id == oid::EXT_BASIC_CONSTRAINTS {
        let bc = BasicConstraints::from_der(value)?;
        cert.basic_constraints_valid = true;
        cert.is_ca = bc.ca;
        cert.max_path_len = bc.path_len_constraint;
    } else if id == oid::EXT_SUBJECT_ALT_NAME {
        let san = SubjectAltName::from_der(value)?;
        for name in san.0 {
            match name {
                GeneralName::DnsName(dns) => cert.dns_names.push(dns.to_string()),
                GeneralName::Rfc822Name(mail) => cert.email_addresses.push(mail.to_string()),
                GeneralName::IpAddress(octets) => {
                    if let Some(ip) = decode_ip(&octets) {
                        cert.ip_addresses.push(ip);
                    }
                }
                _ => {}
            }
        }
        if cert.dns_names.is_empty()
            && cert.email_addresses.is_empty()
            && cert.ip_addresses.is_empty()
        {
            unhandled = true;
        }
    } else if id == oid::EXT_NAME_CONSTRAINTS {
        let nc = NameConstraints::from_der(value)?;
        if nc.excluded_subtrees.is_some() && ext.critical {
            return Err(Error::UnhandledCriticalExtension);
        }
        for subtree in nc.permitted_subtrees.into_iter().flatten() {
            match subtree.base {
                GeneralName::DnsName(dns) => {
                    cert.permitted_dns_domains.push(dns.to_string());
                }
                _ if ext.critical => return Err(Error::UnhandledCriticalExtension),
                _ => {}
            }
        }
        cert.permitted_dns_domains_critical = ext.critical;
    } else if id == oid::EXT_CRL_DISTRIBUTION_POINTS {
        let cdp = CrlDistributionPoints::from_der(value)?;
        for dp in cdp.0 {
            let Some(DistributionPointName::FullName(names)) = dp.distribution_point else {
                continue;
            };
            for name in names {
                if let GeneralName::UniformResourceIdentifier(uri) = name {
                    cert.crl_distribution_points.push(uri.to_string());
                }
            }
        }
    } else if id == oid::EXT_AUTHORITY_KEY_ID {
        let aki = AuthorityKeyIdentifier::from_der(value)?;
        if let Some(aki_id) = aki.key_identifier {
            cert.authority_key_id = aki_id.as_bytes().to_vec();
        }
    } else if id == oid::EXT_EXTENDED_KEY_USAGE {
        let eku = ExtendedKeyUsage::from_der(value)?;
        for purpose in eku.0 {
            match ExtKeyUsage::from_oid(purpose) {
                Some(known) => cert.ext_key_usage.push(known),
                None => cert.unknown_ext_key_usage.push(purpose),
            }
        }
    } else if id == oid::EXT_SUBJECT_KEY_ID {
        cert.subject_key_id = SubjectKeyIdentifier::from_der(value)?.0.as_bytes().to_vec();
    } else if id == oid::EXT_CERTIFICATE_POLICIES {
        let policies = CertificatePolicies::from_der(value)?;
        cert.policy_identifiers = policies
            .0
            .into_iter()
            .map(|p| p.policy_identifier)
            .collect();
    } else if id == oid::EXT_AUTHORITY_INFO_ACCESS {
        let aia = AuthorityInfoAccessSyntax::from_der(value)?;
        for access in aia.0 {
            let GeneralName::UniformResourceIdentifier(uri) = access.access_location else {
                continue;
            };
            if access.access_method == oid::AD_OCSP {
                cert.ocsp_servers.push(uri.to_string());
            } else if access.access_method == oid::AD_CA_ISSUERS {
                cert.issuing_certificate_urls.push(uri.to_string());
            }
        }
    } else {
        unhandled = true;
    }

    if ext.critical && unhandled {
        cert.unhandled_critical_extensions.push(ext.extn_id);
    }
    Ok(())
}

fn decode_ip(octets: &OctetString) -> Option<IpAddr> {
    match octets.as_bytes() {
        bytes if bytes.len() == 4 => {
            let v4: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::from(v4))
        }
        bytes if bytes.len() == 16 => {
            let v6: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::from(v6))
        }
        _ => None,
    }
}

/// Best-effort RFC 4514 rendering plus common-name extraction. Names that do
/// not decode as an RDN sequence render empty rather than failing the parse.
fn render_name(raw: &[u8]) -> (String, Option<String>) {
    let Ok(name) = RdnSequence::from_der(raw) else {
        return (String::new(), None);
    };
    let display = name.to_string();
    let cn = name
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == oid::AT_COMMON_NAME)
        .and_then(attribute_string);
    (display, cn)
}

fn attribute_string(atv: &AttributeTypeAndValue) -> Option<String> {
    use der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
    if let Ok(s) = atv.value.decode_as::<Utf8StringRef<'_>>() {
        return Some(s.to_string());
    }
    if let Ok(s) = atv.value.decode_as::<PrintableStringRef<'_>>() {
        return Some(s.to_string());
    }
    if let Ok(s) = atv.value.decode_as::<Ia5StringRef<'_>>() {
        return Some(s.to_string());
    }
    None
}

/// A set of certificates indexed for parent lookups during chain building.
#[derive(Clone, Debug, Default)]
pub struct CertPool {
    by_ski: HashMap<Vec<u8>, Vec<usize>>,
    by_name: HashMap<Vec<u8>, Vec<usize>>,
    certs: Vec<Certificate>,
}

impl CertPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a certificate. Duplicates (raw-bytes equal) are ignored.
    pub fn add_cert(&mut self, cert: Certificate) {
        if self.certs.iter().any(|c| c.raw == cert.raw) {
            return;
        }
        let index = self.certs.len();
        if !cert.subject_key_id.is_empty() {
            self.by_ski
                .entry(cert.subject_key_id.clone())
                .or_default()
                .push(index);
        }
        self.by_name
            .entry(cert.raw_subject.clone())
            .or_default()
            .push(index);
        self.certs.push(cert);
    }

    /// Add every certificate found in a PEM bundle, skipping blocks that do
    /// not parse. Returns whether at least one certificate was added.
    pub fn append_from_pem(&mut self, pem: &str) -> bool {
        let mut added = false;
        for block in pem_blocks(pem) {
            let Ok((label, der_bytes)) = pem_rfc7468::decode_vec(block.as_bytes()) else {
                continue;
            };
            if label != "CERTIFICATE" {
                continue;
            }
            if let Ok(cert) = parse_certificate(&der_bytes) {
                self.add_cert(cert);
                added = true;
            }
        }
        added
    }

    /// Number of certificates in the pool.
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// The certificates in the pool, in insertion order.
    pub fn certs(&self) -> &[Certificate] {
        &self.certs
    }

    pub(crate) fn cert(&self, index: usize) -> &Certificate {
        &self.certs[index]
    }

    /// Whether the pool holds this exact certificate.
    pub fn contains(&self, cert: &Certificate) -> bool {
        self.by_name
            .get(&cert.raw_subject)
            .into_iter()
            .flatten()
            .any(|&i| self.certs[i].raw == cert.raw)
    }

    /// Candidate parents for `cert`: matched by authority key identifier
    /// when present, falling back to raw issuer name. Returns the indices of
    /// candidates whose signature over `cert` verifies, plus the last
    /// candidate that failed and why, as a diagnostic hint.
    pub(crate) fn find_verified_parents(
        &self,
        cert: &Certificate,
    ) -> (Vec<usize>, Option<(usize, Error)>) {
        let mut candidates: &[usize] = &[];
        if !cert.authority_key_id.is_empty() {
            if let Some(matches) = self.by_ski.get(&cert.authority_key_id) {
                candidates = matches;
            }
        }
        if candidates.is_empty() {
            if let Some(matches) = self.by_name.get(&cert.raw_issuer) {
                candidates = matches;
            }
        }

        let mut parents = Vec::new();
        let mut hint = None;
        for &i in candidates {
            match verify::check_signature_from(cert, &self.certs[i]) {
                Ok(()) => parents.push(i),
                Err(err) => hint = Some((i, err)),
            }
        }
        (parents, hint)
    }
}

/// Split a PEM bundle into individual encapsulated blocks.
fn pem_blocks(pem: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut inside = false;
    for line in pem.lines() {
        if line.starts_with("-----BEGIN ") {
            inside = true;
            current.clear();
        }
        if inside {
            current.push_str(line);
            current.push('\n');
        }
        if line.starts_with("-----END ") {
            inside = false;
            blocks.push(core::mem::take(&mut current));
        }
    }
    blocks
}

// Well-known locations of the system trust bundle.
const SYSTEM_CERT_FILES: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/ca-bundle.pem",
    "/etc/pki/tls/cacert.pem",
];

const SYSTEM_CERT_DIRECTORIES: &[&str] = &["/etc/ssl/certs", "/system/etc/security/cacerts"];

static SYSTEM_ROOTS: OnceLock<Option<CertPool>> = OnceLock::new();

/// The system root pool, loaded once from the usual bundle locations.
/// `None` when no bundle could be read.
pub fn system_roots() -> Option<&'static CertPool> {
    SYSTEM_ROOTS.get_or_init(load_system_roots).as_ref()
}

fn load_system_roots() -> Option<CertPool> {
    let mut pool = CertPool::new();

    for file in SYSTEM_CERT_FILES {
        if let Ok(data) = std::fs::read_to_string(file) {
            if pool.append_from_pem(&data) {
                return Some(pool);
            }
        }
    }

    for directory in SYSTEM_CERT_DIRECTORIES {
        let Ok(entries) = std::fs::read_dir(directory) else {
            continue;
        };
        let mut added = false;
        for entry in entries.flatten() {
            if let Ok(data) = std::fs::read_to_string(entry.path()) {
                if pool.append_from_pem(&data) {
                    added = true;
                }
            }
        }
        if added {
            return Some(pool);
        }
    }

    None
}
