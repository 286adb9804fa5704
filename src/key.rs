//! Key-pair wrappers bridging the external SM2 curve primitives to the
//! provider's dispatch and key store layers.
//!
//! Every key carries a stable subject key identifier (SKI), computed as the
//! SM3 digest of the uncompressed SEC1 point encoding of the public key. The
//! SKI is how stored keys are retrieved and how certificates are matched to
//! the keys that signed them.

use crate::error::{Error, Result};
use elliptic_curve::sec1::ToEncodedPoint;
use sm2::{PublicKey, SecretKey};
use sm3::{Digest, Sm3};

/// An asymmetric SM2 key held by the provider.
///
/// The private variant owns the secret scalar (and derives its public half on
/// demand); the public variant owns only the curve point. Both expose the
/// same SKI so a signer and its verifier resolve to the same stored entry.
#[derive(Clone)]
pub enum Key {
    /// Private key (owns the secret scalar `D`).
    Private(Sm2PrivateKey),
    /// Public key (owns the curve point `(X, Y)` only).
    Public(Sm2PublicKey),
}

impl Key {
    /// Subject key identifier for this key.
    pub fn ski(&self) -> Vec<u8> {
        match self {
            Key::Private(k) => k.ski(),
            Key::Public(k) => k.ski(),
        }
    }

    /// Whether this key contains private material.
    pub fn is_private(&self) -> bool {
        matches!(self, Key::Private(_))
    }

    /// The public half of this key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            Key::Private(k) => k.public_key(),
            Key::Public(k) => *k.as_public_key(),
        }
    }
}

impl core::fmt::Debug for Key {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Key::Private(_) => write!(f, "Key::Private(ski: {})", hex::encode(self.ski())),
            Key::Public(_) => write!(f, "Key::Public(ski: {})", hex::encode(self.ski())),
        }
    }
}

/// SM2 private key wrapper.
#[derive(Clone)]
pub struct Sm2PrivateKey {
    secret: SecretKey,
}

impl Sm2PrivateKey {
    /// Wrap a secret key produced by the curve primitives.
    pub fn new(secret: SecretKey) -> Self {
        Self { secret }
    }

    /// Borrow the wrapped secret key.
    pub fn as_secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Subject key identifier, an SM3 digest over the uncompressed public
    /// point.
    pub fn ski(&self) -> Vec<u8> {
        ski_of(&self.secret.public_key())
    }
}

impl From<SecretKey> for Sm2PrivateKey {
    fn from(secret: SecretKey) -> Self {
        Self::new(secret)
    }
}

/// SM2 public key wrapper.
#[derive(Clone)]
pub struct Sm2PublicKey {
    public: PublicKey,
}

impl Sm2PublicKey {
    /// Wrap a public key produced by the curve primitives.
    pub fn new(public: PublicKey) -> Self {
        Self { public }
    }

    /// Parse from an uncompressed SEC1 point encoding.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let public = PublicKey::from_sec1_bytes(bytes).map_err(|_| Error::UnsupportedKeyEncoding)?;
        Ok(Self { public })
    }

    /// Borrow the wrapped public key.
    pub fn as_public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Subject key identifier, an SM3 digest over the uncompressed point.
    pub fn ski(&self) -> Vec<u8> {
        ski_of(&self.public)
    }
}

impl From<PublicKey> for Sm2PublicKey {
    fn from(public: PublicKey) -> Self {
        Self::new(public)
    }
}

fn ski_of(public: &PublicKey) -> Vec<u8> {
    let point = public.to_encoded_point(false);
    Sm3::digest(point.as_bytes()).to_vec()
}
