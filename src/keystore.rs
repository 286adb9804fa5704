//! Key stores: durable, SKI-addressed persistence for provider keys.
//!
//! Two implementations ship with the provider. [`EphemeralKeyStore`] never
//! persists anything and is the right choice when keys live only for the
//! lifetime of the process. [`FileKeyStore`] keeps one PEM file per key under
//! a directory, named by the hex SKI with a `_sk`/`_pk` suffix, optionally
//! encrypting every file with a store-scoped password.

use crate::{
    codec,
    error::{Error, Result},
    key::Key,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable storage for provider keys, addressed by subject key identifier.
pub trait KeyStore: Send + Sync {
    /// Persist a key. Stores that cannot persist reject with
    /// [`Error::UnsupportedOptions`].
    fn store_key(&self, key: &Key) -> Result<()>;

    /// Load the key with the given SKI, or [`Error::NotFound`].
    fn get_key(&self, ski: &[u8]) -> Result<Key>;
}

/// A key store that never persists anything.
///
/// Lookups always fail with [`Error::NotFound`] and stores are rejected, so
/// every key handed out by a provider backed by this store is ephemeral.
#[derive(Clone, Copy, Debug, Default)]
pub struct EphemeralKeyStore;

impl EphemeralKeyStore {
    /// Create an ephemeral key store.
    pub fn new() -> Self {
        Self
    }
}

impl KeyStore for EphemeralKeyStore {
    fn store_key(&self, _key: &Key) -> Result<()> {
        Err(Error::UnsupportedOptions(
            "ephemeral key store cannot persist keys",
        ))
    }

    fn get_key(&self, _ski: &[u8]) -> Result<Key> {
        Err(Error::NotFound)
    }
}

/// File suffix for private key entries.
const PRIVATE_SUFFIX: &str = "_sk";

/// File suffix for public key entries.
const PUBLIC_SUFFIX: &str = "_pk";

/// Directory-backed key store with one PEM file per key.
///
/// Entries are written atomically (temp file plus rename) with owner-only
/// permissions on Unix. When the store carries a password, every entry is
/// PBES2-encrypted with it; loading then requires the same password, supplied
/// once at store construction rather than per operation.
#[derive(Debug)]
pub struct FileKeyStore {
    dir: PathBuf,
    password: Option<Vec<u8>>,
    read_only: bool,
}

impl FileKeyStore {
    /// Open (creating if necessary) a plaintext key store at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::create(dir, None, false)
    }

    /// Open (creating if necessary) a password-protected key store at `dir`.
    ///
    /// The password must satisfy the provider's password policy.
    pub fn open_with_password(dir: impl AsRef<Path>, password: &[u8]) -> Result<Self> {
        crate::passwd::check_password(password)?;
        Self::create(dir, Some(password.to_vec()), false)
    }

    /// Open an existing store for lookups only; stores are rejected.
    pub fn open_read_only(dir: impl AsRef<Path>, password: Option<&[u8]>) -> Result<Self> {
        if !dir.as_ref().is_dir() {
            return Err(Error::InvalidInput("key store directory does not exist"));
        }
        Self::create(dir, password.map(<[u8]>::to_vec), true)
    }

    fn create(dir: impl AsRef<Path>, password: Option<Vec<u8>>, read_only: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
        }
        Ok(Self {
            dir,
            password,
            read_only,
        })
    }

    /// The directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, ski: &[u8], suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{suffix}", hex::encode(ski)))
    }

    /// Write `contents` to `path` atomically via a temp file in the same
    /// directory, so a crash never leaves a half-written key on disk.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(fs::Permissions::from_mode(0o600))?;
            }
            file.write_all(contents)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn store_key(&self, key: &Key) -> Result<()> {
        if self.read_only {
            return Err(Error::UnsupportedOptions("key store is read-only"));
        }
        let password = self.password.as_deref();
        let (path, pem) = match key {
            Key::Private(sk) => (
                self.entry_path(&key.ski(), PRIVATE_SUFFIX),
                codec::private_key_to_pem(sk, password)?,
            ),
            Key::Public(pk) => (
                self.entry_path(&key.ski(), PUBLIC_SUFFIX),
                codec::public_key_to_pem(pk, password)?,
            ),
        };
        self.write_atomic(&path, pem.as_bytes())?;
        log::debug!(
            "stored {} key {} in {}",
            if key.is_private() { "private" } else { "public" },
            hex::encode(key.ski()),
            self.dir.display()
        );
        Ok(())
    }

    fn get_key(&self, ski: &[u8]) -> Result<Key> {
        if ski.is_empty() {
            return Err(Error::InvalidInput("SKI must not be empty"));
        }
        let password = self.password.as_deref();

        let sk_path = self.entry_path(ski, PRIVATE_SUFFIX);
        if sk_path.is_file() {
            let pem = fs::read_to_string(&sk_path)?;
            return codec::pem_to_private_key(&pem, password);
        }

        let pk_path = self.entry_path(ski, PUBLIC_SUFFIX);
        if pk_path.is_file() {
            let pem = fs::read_to_string(&pk_path)?;
            return codec::pem_to_public_key(&pem, password);
        }

        Err(Error::NotFound)
    }
}
