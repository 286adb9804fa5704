//! The cryptographic service provider: a capability registry dispatching key
//! generation, derivation, import, hashing, signing and verification over
//! the ShangMi suite.
//!
//! Dispatch is closed-world: each operation takes an options enum and
//! matches on it, so the set of supported capabilities is visible in the
//! types and an unsupported combination fails with
//! [`Error::UnsupportedOptions`] rather than falling through reflection.
//! Keys produced by non-ephemeral options are persisted to the configured
//! [`KeyStore`] before being returned.

use crate::{
    codec,
    error::{Error, Result},
    key::{Key, Sm2PrivateKey, Sm2PublicKey},
    keystore::KeyStore,
    sign,
    x509::Certificate,
};
use elliptic_curve::{
    bigint::{NonZero, U256},
    group::Group,
    scalar::ScalarPrimitive,
    Curve,
};
use rand_core::OsRng;
use sm2::{NonZeroScalar, ProjectivePoint, Scalar, SecretKey, Sm2};
use sm3::{Digest, Sm3};

/// Key generation options.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyGenOpts {
    /// Generate an SM2 key pair.
    Sm2 {
        /// Skip persisting the key to the key store.
        ephemeral: bool,
    },
    /// Requests for NIST P-256 keys are honored with SM2 keys, so callers
    /// written against an ECDSA provider keep working against this one.
    EcdsaP256 {
        /// Skip persisting the key to the key store.
        ephemeral: bool,
    },
}

/// Key derivation options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyDerivOpts {
    /// Re-randomize a key by a deterministic offset computed from
    /// `expansion`: the derived private scalar is `d + k mod n` and the
    /// derived public point is `P + [k]G`, with
    /// `k = (expansion mod (n-1)) + 1`.
    ReRand {
        /// Big-endian expansion value, at most 32 bytes.
        expansion: Vec<u8>,
        /// Skip persisting the derived key to the key store.
        ephemeral: bool,
    },
}

/// Key import options. Each variant names the encoding the raw material is
/// expected to be in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyImportOpts {
    /// DER-encoded PKIX `SubjectPublicKeyInfo` holding an SM2 point.
    Sm2PkixPublicKeyDer {
        /// Skip persisting the imported key to the key store.
        ephemeral: bool,
    },
    /// DER-encoded SM2 private key (PKCS#8 or bare SEC1).
    Sm2PrivateKeyDer {
        /// Skip persisting the imported key to the key store.
        ephemeral: bool,
    },
    /// DER-encoded EC private key; accepted with the same decoding rules as
    /// [`KeyImportOpts::Sm2PrivateKeyDer`].
    EcdsaPrivateKeyDer {
        /// Skip persisting the imported key to the key store.
        ephemeral: bool,
    },
    /// An already-decoded SM2 public key.
    Sm2PublicKey {
        /// Skip persisting the imported key to the key store.
        ephemeral: bool,
    },
    /// The subject public key of a parsed X.509 certificate.
    X509Certificate {
        /// Skip persisting the imported key to the key store.
        ephemeral: bool,
    },
}

/// Raw material for [`Csp::key_import`].
#[derive(Clone, Copy, Debug)]
pub enum ImportMaterial<'a> {
    /// DER bytes.
    Der(&'a [u8]),
    /// A decoded SM2 public key.
    PublicKey(&'a sm2::PublicKey),
    /// A parsed certificate.
    Certificate(&'a Certificate),
}

/// Digest selection for [`Csp::hash`].
///
/// The provider is SM3-only; the SHA variants are accepted as aliases so
/// configuration written for a SHA-based provider hashes with SM3 instead
/// of failing. The output is always the 32-byte SM3 digest.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashOpts {
    /// SM3.
    Sm3,
    /// Alias for SM3.
    Sha256,
    /// Alias for SM3.
    Sha,
    /// Alias for SM3.
    Sha3_256,
}

/// Security level (key size, in bits) this provider implements.
pub const SECURITY_LEVEL: u32 = 256;

/// Hash family name this provider implements.
pub const HASH_FAMILY: &str = "SM3";

/// The ShangMi cryptographic service provider.
pub struct Csp {
    key_store: Box<dyn KeyStore>,
}

impl core::fmt::Debug for Csp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Csp").finish_non_exhaustive()
    }
}

impl Csp {
    /// Construct a provider over the given key store.
    ///
    /// `security_level` must be [`SECURITY_LEVEL`] and `hash_family` must be
    /// [`HASH_FAMILY`]; the parameters exist so configuration for other
    /// providers fails loudly here instead of misbehaving later.
    pub fn new(security_level: u32, hash_family: &str, key_store: Box<dyn KeyStore>) -> Result<Self> {
        if security_level != SECURITY_LEVEL {
            return Err(Error::UnsupportedOptions(
                "only the 256-bit security level is supported",
            ));
        }
        if hash_family != HASH_FAMILY {
            return Err(Error::UnsupportedOptions("only the SM3 hash family is supported"));
        }
        Ok(Self { key_store })
    }

    /// Generate a new key pair.
    pub fn key_gen(&self, opts: &KeyGenOpts) -> Result<Key> {
        let (KeyGenOpts::Sm2 { ephemeral } | KeyGenOpts::EcdsaP256 { ephemeral }) = *opts;

        let key = Key::Private(Sm2PrivateKey::new(SecretKey::random(&mut OsRng)));
        if !ephemeral {
            self.key_store.store_key(&key)?;
        }
        log::debug!("generated SM2 key {}", hex::encode(key.ski()));
        Ok(key)
    }

    /// Derive a key from an existing one.
    pub fn key_deriv(&self, key: &Key, opts: &KeyDerivOpts) -> Result<Key> {
        let KeyDerivOpts::ReRand {
            expansion,
            ephemeral,
        } = opts;

        let k = rerand_scalar(expansion)?;
        let derived = match key {
            Key::Private(private) => {
                let d = private.as_secret_key().to_nonzero_scalar();
                let sum = *d + k;
                let nonzero = Option::<NonZeroScalar>::from(NonZeroScalar::new(sum))
                    .ok_or(Error::InvalidDerivedKey)?;
                Key::Private(Sm2PrivateKey::new(SecretKey::from(nonzero)))
            }
            Key::Public(public) => {
                let point = ProjectivePoint::generator() * k
                    + ProjectivePoint::from(*public.as_public_key().as_affine());
                let derived = sm2::PublicKey::from_affine(point.to_affine())
                    .map_err(|_| Error::InvalidDerivedKey)?;
                Key::Public(Sm2PublicKey::new(derived))
            }
        };

        if !ephemeral {
            self.key_store.store_key(&derived)?;
        }
        Ok(derived)
    }

    /// Import key material.
    pub fn key_import(&self, material: ImportMaterial<'_>, opts: &KeyImportOpts) -> Result<Key> {
        let (key, ephemeral) = match (material, *opts) {
            (ImportMaterial::Der(der), KeyImportOpts::Sm2PkixPublicKeyDer { ephemeral }) => {
                (codec::parse_public_key(der)?, ephemeral)
            }
            (
                ImportMaterial::Der(der),
                KeyImportOpts::Sm2PrivateKeyDer { ephemeral }
                | KeyImportOpts::EcdsaPrivateKeyDer { ephemeral },
            ) => (codec::parse_private_key(der)?, ephemeral),
            (ImportMaterial::PublicKey(public), KeyImportOpts::Sm2PublicKey { ephemeral }) => {
                (Key::Public(Sm2PublicKey::new(*public)), ephemeral)
            }
            (ImportMaterial::Certificate(cert), KeyImportOpts::X509Certificate { ephemeral }) => {
                let public = cert.public_key.ok_or(Error::UnsupportedKeyEncoding)?;
                // Route the certificate's key through the public key
                // importer so both paths persist identically.
                return self.key_import(
                    ImportMaterial::PublicKey(&public),
                    &KeyImportOpts::Sm2PublicKey { ephemeral },
                );
            }
            _ => {
                return Err(Error::UnsupportedOptions(
                    "import material does not match the import options",
                ))
            }
        };

        if !ephemeral {
            self.key_store.store_key(&key)?;
        }
        Ok(key)
    }

    /// Load a previously persisted key by SKI.
    pub fn get_key(&self, ski: &[u8]) -> Result<Key> {
        self.key_store.get_key(ski)
    }

    /// Hash a message. Every supported option digests with SM3.
    pub fn hash(&self, msg: &[u8], opts: &HashOpts) -> Result<Vec<u8>> {
        let (HashOpts::Sm3 | HashOpts::Sha256 | HashOpts::Sha | HashOpts::Sha3_256) = *opts;
        Ok(Sm3::digest(msg).to_vec())
    }

    /// Return a streaming hasher for the given options.
    ///
    /// Like [`Csp::hash`], every supported option digests with SM3.
    pub fn get_hasher(&self, opts: &HashOpts) -> Result<Box<dyn sm3::digest::DynDigest>> {
        let (HashOpts::Sm3 | HashOpts::Sha256 | HashOpts::Sha | HashOpts::Sha3_256) = *opts;
        Ok(Box::new(Sm3::new()))
    }

    /// Sign a digest with a private key, returning the DER-encoded
    /// signature.
    pub fn sign(&self, key: &Key, digest: &[u8]) -> Result<Vec<u8>> {
        if digest.is_empty() {
            return Err(Error::InvalidInput("digest must not be empty"));
        }
        let Key::Private(private) = key else {
            return Err(Error::UnsupportedOptions("signing requires a private key"));
        };
        sign::sign_digest(private.as_secret_key(), digest)
    }

    /// Verify a DER-encoded signature over a digest. Works with either key
    /// half.
    pub fn verify(&self, key: &Key, signature: &[u8], digest: &[u8]) -> Result<bool> {
        if signature.is_empty() {
            return Err(Error::InvalidInput("signature must not be empty"));
        }
        if digest.is_empty() {
            return Err(Error::InvalidInput("digest must not be empty"));
        }
        sign::verify_digest(&key.public_key(), signature, digest)
    }

    /// Asymmetric encryption is not part of this provider's capability set.
    pub fn encrypt(&self, _key: &Key, _plaintext: &[u8]) -> Result<Vec<u8>> {
        Err(Error::UnsupportedOptions("encryption is not supported"))
    }

    /// Asymmetric decryption is not part of this provider's capability set.
    pub fn decrypt(&self, _key: &Key, _ciphertext: &[u8]) -> Result<Vec<u8>> {
        Err(Error::UnsupportedOptions("decryption is not supported"))
    }
}

/// Map an expansion value into a scalar offset `k` in `[1, n-1]`:
/// `k = (expansion mod (n-1)) + 1`, so the offset is never zero and never
/// wraps a valid scalar out of range on its own.
fn rerand_scalar(expansion: &[u8]) -> Result<Scalar> {
    if expansion.is_empty() {
        return Err(Error::InvalidInput("expansion must not be empty"));
    }
    if expansion.len() > 32 {
        return Err(Error::InvalidInput("expansion must be at most 32 bytes"));
    }

    let mut padded = [0u8; 32];
    padded[32 - expansion.len()..].copy_from_slice(expansion);
    let value = U256::from_be_slice(&padded);

    let order_minus_one = Sm2::ORDER.wrapping_sub(&U256::ONE);
    let modulus =
        Option::<NonZero<U256>>::from(NonZero::new(order_minus_one)).ok_or(Error::Crypto)?;
    let k = value.rem(&modulus).wrapping_add(&U256::ONE);

    let primitive =
        Option::<ScalarPrimitive<Sm2>>::from(ScalarPrimitive::new(k)).ok_or(Error::Crypto)?;
    Ok(Scalar::from(primitive))
}
