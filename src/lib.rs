#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo.svg",
    html_favicon_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo.svg"
)]
#![forbid(unsafe_code)]
#![warn(
    clippy::mod_module_files,
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::checked_conversions,
    clippy::implicit_saturating_sub,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    missing_docs,
    rust_2018_idioms,
    unused_lifetimes,
    unused_qualifications
)]

pub mod codec;
pub mod csp;
pub mod keystore;
pub mod oid;
pub mod passwd;
pub mod x509;

mod error;
mod key;
mod sign;

pub use crate::{
    csp::{Csp, HashOpts, ImportMaterial, KeyDerivOpts, KeyGenOpts, KeyImportOpts},
    error::{Error, Result},
    key::{Key, Sm2PrivateKey, Sm2PublicKey},
    keystore::{EphemeralKeyStore, FileKeyStore, KeyStore},
    sign::DEFAULT_DIST_ID,
    x509::{CertPool, Certificate, ExtKeyUsage, VerifyOptions},
};

pub use sm2;
pub use sm3;
