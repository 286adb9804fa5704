//! Chain validation tests over certificates built with the `x509-cert`
//! owned types and signed with the provider itself.

use core::str::FromStr;
use core::time::Duration;
use der::{
    asn1::{BitString, Ia5String, ObjectIdentifier, OctetString, UtcTime},
    Decode, Encode,
};
use rand_core::OsRng;
use sm2::SecretKey;
use sm2_csp::{
    csp::{HASH_FAMILY, SECURITY_LEVEL},
    oid,
    x509::parse_certificate,
    CertPool, Certificate, Csp, EphemeralKeyStore, Error, ExtKeyUsage, ImportMaterial, Key,
    KeyImportOpts, Sm2PublicKey, VerifyOptions,
};
use spki::{AlgorithmIdentifierOwned, EncodePublicKey};
use std::time::SystemTime;
use x509_cert::{
    certificate::{TbsCertificate, Version},
    ext::{
        pkix::{
            constraints::name::GeneralSubtree,
            name::GeneralName,
            AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages,
            NameConstraints, SubjectAltName, SubjectKeyIdentifier,
        },
        Extension,
    },
    name::Name,
    serial_number::SerialNumber,
    spki::SubjectPublicKeyInfoOwned,
    time::{Time, Validity},
};

fn csp() -> Csp {
    Csp::new(
        SECURITY_LEVEL,
        HASH_FAMILY,
        Box::new(EphemeralKeyStore::new()),
    )
    .unwrap()
}

fn ski_of(key: &SecretKey) -> Vec<u8> {
    Sm2PublicKey::new(key.public_key()).ski()
}

fn sm2_with_sm3() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: oid::SM2_WITH_SM3,
        parameters: None,
    }
}

fn validity_around_now() -> Validity {
    Validity::from_now(Duration::from_secs(24 * 3600)).unwrap()
}

fn validity_in_the_past() -> Validity {
    Validity {
        not_before: Time::UtcTime(
            UtcTime::from_unix_duration(Duration::from_secs(1_000_000_000)).unwrap(),
        ),
        not_after: Time::UtcTime(
            UtcTime::from_unix_duration(Duration::from_secs(1_100_000_000)).unwrap(),
        ),
    }
}

struct CertParams<'a> {
    subject: &'a str,
    issuer: &'a str,
    serial: u8,
    subject_key: &'a SecretKey,
    signer_key: &'a SecretKey,
    /// Key the authority key identifier points at; normally the signer.
    aki_key: &'a SecretKey,
    ca: bool,
    path_len: Option<u8>,
    validity: Validity,
    dns_names: &'a [&'a str],
    ekus: &'a [ObjectIdentifier],
    permitted_dns: &'a [&'a str],
    extra_extensions: Vec<Extension>,
}

impl<'a> CertParams<'a> {
    fn leaf(
        subject: &'a str,
        issuer: &'a str,
        serial: u8,
        subject_key: &'a SecretKey,
        signer_key: &'a SecretKey,
    ) -> Self {
        Self {
            subject,
            issuer,
            serial,
            subject_key,
            signer_key,
            aki_key: signer_key,
            ca: false,
            path_len: None,
            validity: validity_around_now(),
            dns_names: &[],
            ekus: &[],
            permitted_dns: &[],
            extra_extensions: Vec::new(),
        }
    }

    fn ca(
        subject: &'a str,
        issuer: &'a str,
        serial: u8,
        subject_key: &'a SecretKey,
        signer_key: &'a SecretKey,
    ) -> Self {
        Self {
            ca: true,
            ..Self::leaf(subject, issuer, serial, subject_key, signer_key)
        }
    }
}

fn raw_extension(id: ObjectIdentifier, critical: bool, value: Vec<u8>) -> Extension {
    Extension {
        extn_id: id,
        critical,
        extn_value: OctetString::new(value).unwrap(),
    }
}

fn build_cert(p: &CertParams<'_>) -> Certificate {
    let spki_der = p.subject_key.public_key().to_public_key_der().unwrap();
    let spki = SubjectPublicKeyInfoOwned::from_der(spki_der.as_bytes()).unwrap();

    let mut extensions = vec![
        raw_extension(
            oid::EXT_SUBJECT_KEY_ID,
            false,
            SubjectKeyIdentifier(OctetString::new(ski_of(p.subject_key)).unwrap())
                .to_der()
                .unwrap(),
        ),
        raw_extension(
            oid::EXT_AUTHORITY_KEY_ID,
            false,
            AuthorityKeyIdentifier {
                key_identifier: Some(OctetString::new(ski_of(p.aki_key)).unwrap()),
                authority_cert_issuer: None,
                authority_cert_serial_number: None,
            }
            .to_der()
            .unwrap(),
        ),
    ];

    if p.ca {
        extensions.push(raw_extension(
            oid::EXT_BASIC_CONSTRAINTS,
            true,
            BasicConstraints {
                ca: true,
                path_len_constraint: p.path_len,
            }
            .to_der()
            .unwrap(),
        ));
        extensions.push(raw_extension(
            oid::EXT_KEY_USAGE,
            true,
            KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
                .to_der()
                .unwrap(),
        ));
    } else {
        extensions.push(raw_extension(
            oid::EXT_KEY_USAGE,
            true,
            KeyUsage(KeyUsages::DigitalSignature.into()).to_der().unwrap(),
        ));
    }

    if !p.dns_names.is_empty() {
        let names = p
            .dns_names
            .iter()
            .map(|dns| GeneralName::DnsName(Ia5String::new(dns).unwrap()))
            .collect();
        extensions.push(raw_extension(
            oid::EXT_SUBJECT_ALT_NAME,
            false,
            SubjectAltName(names).to_der().unwrap(),
        ));
    }

    if !p.ekus.is_empty() {
        extensions.push(raw_extension(
            oid::EXT_EXTENDED_KEY_USAGE,
            false,
            ExtendedKeyUsage(p.ekus.to_vec()).to_der().unwrap(),
        ));
    }

    if !p.permitted_dns.is_empty() {
        let subtrees = p
            .permitted_dns
            .iter()
            .map(|dns| GeneralSubtree {
                base: GeneralName::DnsName(Ia5String::new(dns).unwrap()),
                minimum: 0,
                maximum: None,
            })
            .collect();
        extensions.push(raw_extension(
            oid::EXT_NAME_CONSTRAINTS,
            false,
            NameConstraints {
                permitted_subtrees: Some(subtrees),
                excluded_subtrees: None,
            }
            .to_der()
            .unwrap(),
        ));
    }

    extensions.extend(p.extra_extensions.iter().cloned());

    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[p.serial]).unwrap(),
        signature: sm2_with_sm3(),
        issuer: Name::from_str(p.issuer).unwrap(),
        validity: p.validity.clone(),
        subject: Name::from_str(p.subject).unwrap(),
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
    };

    let tbs_der = tbs.to_der().unwrap();
    let signer = Key::Private(p.signer_key.clone().into());
    let signature = csp().sign(&signer, &tbs_der).unwrap();

    let cert = x509_cert::Certificate {
        tbs_certificate: tbs,
        signature_algorithm: sm2_with_sm3(),
        signature: BitString::from_bytes(&signature).unwrap(),
    };
    parse_certificate(&cert.to_der().unwrap()).unwrap()
}

struct TestPki {
    root_key: SecretKey,
    inter_key: SecretKey,
    leaf_key: SecretKey,
    root: Certificate,
    inter: Certificate,
    leaf: Certificate,
}

fn three_level_pki() -> TestPki {
    let root_key = SecretKey::random(&mut OsRng);
    let inter_key = SecretKey::random(&mut OsRng);
    let leaf_key = SecretKey::random(&mut OsRng);

    let root = build_cert(&CertParams::ca(
        "CN=Test Root",
        "CN=Test Root",
        1,
        &root_key,
        &root_key,
    ));
    let inter = build_cert(&CertParams {
        path_len: Some(0),
        ..CertParams::ca("CN=Test Intermediate", "CN=Test Root", 2, &inter_key, &root_key)
    });
    let leaf = build_cert(&CertParams {
        dns_names: &["www.example.com"],
        ..CertParams::leaf("CN=Test Leaf", "CN=Test Intermediate", 3, &leaf_key, &inter_key)
    });

    TestPki {
        root_key,
        inter_key,
        leaf_key,
        root,
        inter,
        leaf,
    }
}

fn pool_of(certs: &[&Certificate]) -> CertPool {
    let mut pool = CertPool::new();
    for cert in certs {
        pool.add_cert((*cert).clone());
    }
    pool
}

#[test]
fn parsed_fields_survive_the_round_trip() {
    let pki = three_level_pki();

    assert_eq!(pki.inter.serial_number, vec![2]);
    assert_eq!(pki.inter.common_name.as_deref(), Some("Test Intermediate"));
    assert!(pki.inter.is_ca);
    assert!(pki.inter.basic_constraints_valid);
    assert_eq!(pki.inter.max_path_len, Some(0));
    assert_eq!(pki.inter.subject_key_id, ski_of(&pki.inter_key));
    assert_eq!(pki.inter.authority_key_id, ski_of(&pki.root_key));
    assert_eq!(pki.leaf.dns_names, vec!["www.example.com".to_string()]);
    assert!(!pki.leaf.is_ca);
    assert_eq!(pki.leaf.version, 3);
    assert!(pki.leaf.unhandled_critical_extensions.is_empty());
}

#[test]
fn three_level_chain_verifies() {
    let pki = three_level_pki();
    let roots = pool_of(&[&pki.root]);
    let intermediates = pool_of(&[&pki.inter]);

    let chains = pki
        .leaf
        .verify(&VerifyOptions {
            intermediates: Some(&intermediates),
            roots: Some(&roots),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap();

    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].len(), 3);
    assert_eq!(chains[0][0], pki.leaf);
    assert_eq!(chains[0][1], pki.inter);
    assert_eq!(chains[0][2], pki.root);
}

#[test]
fn trusted_root_short_circuits() {
    let pki = three_level_pki();
    let roots = pool_of(&[&pki.root]);

    let chains = pki
        .root
        .verify(&VerifyOptions {
            roots: Some(&roots),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(chains, vec![vec![pki.root.clone()]]);
}

#[test]
fn expired_leaf_is_rejected() {
    let root_key = SecretKey::random(&mut OsRng);
    let leaf_key = SecretKey::random(&mut OsRng);
    let root = build_cert(&CertParams::ca("CN=Root", "CN=Root", 1, &root_key, &root_key));
    let leaf = build_cert(&CertParams {
        validity: validity_in_the_past(),
        ..CertParams::leaf("CN=Old Leaf", "CN=Root", 2, &leaf_key, &root_key)
    });

    let roots = pool_of(&[&root]);
    let err = leaf
        .verify(&VerifyOptions {
            roots: Some(&roots),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, Error::Expired));
}

#[test]
fn verification_time_can_be_pinned() {
    let root_key = SecretKey::random(&mut OsRng);
    let leaf_key = SecretKey::random(&mut OsRng);
    let root = build_cert(&CertParams {
        validity: validity_in_the_past(),
        ..CertParams::ca("CN=Root", "CN=Root", 1, &root_key, &root_key)
    });
    let leaf = build_cert(&CertParams {
        validity: validity_in_the_past(),
        ..CertParams::leaf("CN=Old Leaf", "CN=Root", 2, &leaf_key, &root_key)
    });

    let roots = pool_of(&[&root]);
    let pinned = SystemTime::UNIX_EPOCH + Duration::from_secs(1_050_000_000);
    let chains = leaf
        .verify(&VerifyOptions {
            roots: Some(&roots),
            current_time: Some(pinned),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(chains[0].len(), 2);
}

#[test]
fn path_length_constraint_is_enforced() {
    let root_key = SecretKey::random(&mut OsRng);
    let inter_key = SecretKey::random(&mut OsRng);
    let leaf_key = SecretKey::random(&mut OsRng);

    // Root allows zero intermediates below it.
    let root = build_cert(&CertParams {
        path_len: Some(0),
        ..CertParams::ca("CN=Short Root", "CN=Short Root", 1, &root_key, &root_key)
    });
    let inter = build_cert(&CertParams::ca(
        "CN=Unwanted Intermediate",
        "CN=Short Root",
        2,
        &inter_key,
        &root_key,
    ));
    let direct_leaf = build_cert(&CertParams::leaf(
        "CN=Direct",
        "CN=Short Root",
        3,
        &leaf_key,
        &root_key,
    ));
    let nested_leaf = build_cert(&CertParams::leaf(
        "CN=Nested",
        "CN=Unwanted Intermediate",
        4,
        &leaf_key,
        &inter_key,
    ));

    let roots = pool_of(&[&root]);
    let intermediates = pool_of(&[&inter]);

    // Directly issued leaf is fine.
    assert!(direct_leaf
        .verify(&VerifyOptions {
            roots: Some(&roots),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .is_ok());

    // A leaf below an intermediate exceeds the root's constraint, and the
    // rejection reason survives the chain search.
    let err = nested_leaf
        .verify(&VerifyOptions {
            roots: Some(&roots),
            intermediates: Some(&intermediates),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, Error::TooManyIntermediates));
}

#[test]
fn unknown_authority_carries_a_hint() {
    let root_key = SecretKey::random(&mut OsRng);
    let rogue_key = SecretKey::random(&mut OsRng);
    let leaf_key = SecretKey::random(&mut OsRng);

    let root = build_cert(&CertParams::ca("CN=Root", "CN=Root", 1, &root_key, &root_key));
    // Leaf points at the root but was signed by someone else entirely.
    let leaf = build_cert(&CertParams {
        aki_key: &root_key,
        ..CertParams::leaf("CN=Forged", "CN=Root", 2, &leaf_key, &rogue_key)
    });

    let roots = pool_of(&[&root]);
    let err = leaf
        .verify(&VerifyOptions {
            roots: Some(&roots),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap_err();

    match err {
        Error::UnknownAuthority {
            hint_cert: Some(cert),
            hint_err: Some(reason),
        } => {
            assert_eq!(*cert, root);
            assert!(matches!(*reason, Error::InvalidSignature));
        }
        other => panic!("expected a hinted unknown-authority error, got {other:?}"),
    }
}

#[test]
fn cross_signed_loop_terminates() {
    let a_key = SecretKey::random(&mut OsRng);
    let b_key = SecretKey::random(&mut OsRng);
    let leaf_key = SecretKey::random(&mut OsRng);
    let root_key = SecretKey::random(&mut OsRng);

    let a = build_cert(&CertParams::ca("CN=Loop A", "CN=Loop B", 1, &a_key, &b_key));
    let b = build_cert(&CertParams::ca("CN=Loop B", "CN=Loop A", 2, &b_key, &a_key));
    let leaf = build_cert(&CertParams::leaf("CN=Leaf", "CN=Loop A", 3, &leaf_key, &a_key));
    let unrelated_root = build_cert(&CertParams::ca(
        "CN=Elsewhere",
        "CN=Elsewhere",
        4,
        &root_key,
        &root_key,
    ));

    let roots = pool_of(&[&unrelated_root]);
    let intermediates = pool_of(&[&a, &b]);

    let err = leaf
        .verify(&VerifyOptions {
            roots: Some(&roots),
            intermediates: Some(&intermediates),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, Error::UnknownAuthority { .. }));
}

#[test]
fn hostname_checking() {
    let pki = three_level_pki();
    let roots = pool_of(&[&pki.root]);
    let intermediates = pool_of(&[&pki.inter]);

    assert!(pki
        .leaf
        .verify(&VerifyOptions {
            dns_name: "www.example.com".into(),
            roots: Some(&roots),
            intermediates: Some(&intermediates),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .is_ok());

    let err = pki
        .leaf
        .verify(&VerifyOptions {
            dns_name: "evil.example.net".into(),
            roots: Some(&roots),
            intermediates: Some(&intermediates),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, Error::HostnameMismatch(_)));
}

#[test]
fn extended_key_usage_filters_chains() {
    let root_key = SecretKey::random(&mut OsRng);
    let leaf_key = SecretKey::random(&mut OsRng);
    let root = build_cert(&CertParams::ca("CN=Root", "CN=Root", 1, &root_key, &root_key));
    let client_leaf = build_cert(&CertParams {
        ekus: &[oid::EKU_CLIENT_AUTH],
        ..CertParams::leaf("CN=Client", "CN=Root", 2, &leaf_key, &root_key)
    });

    let roots = pool_of(&[&root]);

    // The default requirement is server auth, which this leaf lacks.
    let err = client_leaf
        .verify(&VerifyOptions {
            roots: Some(&roots),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, Error::IncompatibleUsage));

    assert!(client_leaf
        .verify(&VerifyOptions {
            roots: Some(&roots),
            key_usages: vec![ExtKeyUsage::ClientAuth],
            ..Default::default()
        })
        .is_ok());
}

#[test]
fn permitted_dns_domains_are_enforced() {
    let root_key = SecretKey::random(&mut OsRng);
    let leaf_key = SecretKey::random(&mut OsRng);
    let root = build_cert(&CertParams::ca("CN=Root", "CN=Root", 1, &root_key, &root_key));
    let leaf = build_cert(&CertParams {
        dns_names: &["www.example.com", "www.other.net"],
        permitted_dns: &["example.com"],
        ..CertParams::leaf("CN=Constrained", "CN=Root", 2, &leaf_key, &root_key)
    });

    let roots = pool_of(&[&root]);

    assert!(leaf
        .verify(&VerifyOptions {
            dns_name: "www.example.com".into(),
            roots: Some(&roots),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .is_ok());

    let err = leaf
        .verify(&VerifyOptions {
            dns_name: "www.other.net".into(),
            roots: Some(&roots),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, Error::NameConstraintViolation));
}

#[test]
fn unknown_critical_extension_blocks_verification() {
    let root_key = SecretKey::random(&mut OsRng);
    let leaf_key = SecretKey::random(&mut OsRng);
    let root = build_cert(&CertParams::ca("CN=Root", "CN=Root", 1, &root_key, &root_key));

    // DER NULL under a made-up identifier, marked critical.
    let mystery = raw_extension(
        ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99999.1"),
        true,
        vec![0x05, 0x00],
    );
    let leaf = build_cert(&CertParams {
        extra_extensions: vec![mystery],
        ..CertParams::leaf("CN=Mystery", "CN=Root", 2, &leaf_key, &root_key)
    });
    assert_eq!(leaf.unhandled_critical_extensions.len(), 1);

    let roots = pool_of(&[&root]);
    let err = leaf
        .verify(&VerifyOptions {
            roots: Some(&roots),
            key_usages: vec![ExtKeyUsage::Any],
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, Error::UnhandledCriticalExtension));
}

#[test]
fn certificate_key_import_matches_the_subject_key() {
    let pki = three_level_pki();
    let provider = csp();

    let imported = provider
        .key_import(
            ImportMaterial::Certificate(&pki.leaf),
            &KeyImportOpts::X509Certificate { ephemeral: true },
        )
        .unwrap();
    assert_eq!(imported.public_key(), pki.leaf_key.public_key());
}

#[test]
fn pool_deduplicates_and_indexes() {
    let pki = three_level_pki();
    let mut pool = CertPool::new();
    pool.add_cert(pki.root.clone());
    pool.add_cert(pki.root.clone());
    assert_eq!(pool.len(), 1);
    assert!(pool.contains(&pki.root));
    assert!(!pool.contains(&pki.leaf));
}
