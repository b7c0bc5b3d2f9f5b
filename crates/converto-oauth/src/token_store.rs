//! Refresh token persistence.
//!
//! The Google refresh token is the only credential that outlives the
//! process. It is stored encrypted with an X25519 age identity that lives
//! next to it in a private key file, or in the OS keyring when the
//! `keyring` feature is enabled.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use age::secrecy::ExposeSecret;
use age::x25519::Identity;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{OAuthError, Result};

/// Encrypted refresh token file name within the data directory.
pub const TOKEN_FILE: &str = "refresh_token.age";

/// Identity file name within the data directory.
pub const IDENTITY_FILE: &str = "refresh_token.key";

/// Keyring service name.
#[cfg(feature = "keyring")]
const SERVICE_NAME: &str = "converto";

/// Keyring user holding the age identity.
#[cfg(feature = "keyring")]
const KEYRING_USER: &str = "refresh_token_identity";

// ============================================================================
// RefreshTokenStore Trait
// ============================================================================

/// Storage for the long-lived provider refresh token.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist the token, replacing any previous one.
    async fn save(&self, refresh_token: &str) -> Result<()>;

    /// Read the stored token, surfacing read and decrypt failures.
    async fn try_load(&self) -> Result<Option<String>>;

    /// Read the stored token; any failure is logged and treated as absent.
    async fn load(&self) -> Option<String> {
        match self.try_load().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable refresh token");
                None
            }
        }
    }

    /// Remove the stored token. Clearing an empty store succeeds.
    async fn clear(&self) -> Result<()>;

    /// Whether a token appears to be stored, without decrypting it.
    fn has_token(&self) -> bool;
}

/// Shared token store for use across async contexts.
pub type SharedTokenStore = Arc<dyn RefreshTokenStore>;

// ============================================================================
// EncryptedFileTokenStore
// ============================================================================

/// Where the age identity is kept.
#[derive(Debug, Clone)]
enum KeyLocation {
    File(PathBuf),
    #[cfg(feature = "keyring")]
    Keyring,
}

/// age-encrypted file store for production use.
#[derive(Debug)]
pub struct EncryptedFileTokenStore {
    token_path: PathBuf,
    key: KeyLocation,
}

impl EncryptedFileTokenStore {
    /// Store the token and its identity under `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            token_path: data_dir.join(TOKEN_FILE),
            key: KeyLocation::File(data_dir.join(IDENTITY_FILE)),
        }
    }

    /// Store the token under `data_dir` and its identity in the OS keyring.
    #[cfg(feature = "keyring")]
    pub fn with_keyring(data_dir: &Path) -> Self {
        Self {
            token_path: data_dir.join(TOKEN_FILE),
            key: KeyLocation::Keyring,
        }
    }

    /// Use explicit paths for the token and identity files.
    pub fn with_paths(token_path: PathBuf, key_path: PathBuf) -> Self {
        Self {
            token_path,
            key: KeyLocation::File(key_path),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    fn read_identity(&self) -> Result<Option<Identity>> {
        let encoded = match &self.key {
            KeyLocation::File(path) => {
                if !path.exists() {
                    return Ok(None);
                }
                std::fs::read_to_string(path).map_err(|e| {
                    OAuthError::TokenLoadFailed(format!("Failed to read identity file: {}", e))
                })?
            }
            #[cfg(feature = "keyring")]
            KeyLocation::Keyring => match keyring_get()? {
                Some(encoded) => encoded,
                None => return Ok(None),
            },
        };

        encoded
            .trim()
            .parse::<Identity>()
            .map(Some)
            .map_err(|e| OAuthError::TokenLoadFailed(format!("Malformed identity: {}", e)))
    }

    fn read_or_create_identity(&self) -> Result<Identity> {
        match self.read_identity() {
            Ok(Some(identity)) => return Ok(identity),
            Ok(None) => {}
            Err(e) => {
                // An unusable identity can never decrypt the old token anyway.
                tracing::warn!(error = %e, "Replacing unreadable refresh token identity");
            }
        }

        let identity = Identity::generate();
        let encoded = identity.to_string();
        match &self.key {
            KeyLocation::File(path) => write_private(path, encoded.expose_secret().as_bytes())
                .map_err(|e| {
                    OAuthError::TokenPersistenceFailed(format!(
                        "Failed to write identity file: {}",
                        e
                    ))
                })?,
            #[cfg(feature = "keyring")]
            KeyLocation::Keyring => keyring_set(encoded.expose_secret())?,
        }
        tracing::debug!("Generated new refresh token identity");
        Ok(identity)
    }
}

#[async_trait]
impl RefreshTokenStore for EncryptedFileTokenStore {
    async fn save(&self, refresh_token: &str) -> Result<()> {
        let identity = self.read_or_create_identity()?;
        let ciphertext = age::encrypt(&identity.to_public(), refresh_token.as_bytes())
            .map_err(|e| OAuthError::TokenPersistenceFailed(format!("Encryption failed: {}", e)))?;

        write_private(&self.token_path, &ciphertext).map_err(|e| {
            OAuthError::TokenPersistenceFailed(format!("Failed to write token file: {}", e))
        })?;

        tracing::info!(path = %self.token_path.display(), "Refresh token saved");
        Ok(())
    }

    async fn try_load(&self) -> Result<Option<String>> {
        if !self.token_path.exists() {
            return Ok(None);
        }

        let ciphertext = std::fs::read(&self.token_path).map_err(|e| {
            OAuthError::TokenLoadFailed(format!("Failed to read token file: {}", e))
        })?;
        let identity = self.read_identity()?.ok_or_else(|| {
            OAuthError::TokenLoadFailed("identity for stored token is missing".to_string())
        })?;

        let plaintext = age::decrypt(&identity, &ciphertext)
            .map_err(|e| OAuthError::TokenLoadFailed(format!("Decryption failed: {}", e)))?;
        let token = String::from_utf8(plaintext)
            .map_err(|_| OAuthError::TokenLoadFailed("token is not valid UTF-8".to_string()))?;

        Ok(Some(token))
    }

    async fn clear(&self) -> Result<()> {
        if self.token_path.exists() {
            std::fs::remove_file(&self.token_path).map_err(|e| {
                OAuthError::TokenPersistenceFailed(format!("Failed to delete token file: {}", e))
            })?;
            tracing::info!(path = %self.token_path.display(), "Refresh token cleared");
        }
        Ok(())
    }

    fn has_token(&self) -> bool {
        self.token_path.exists()
    }
}

/// Write `bytes` to `path` readable by the owner only, replacing it atomically.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let result = options.open(&tmp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = result.and_then(|_| std::fs::rename(&tmp_path, path)) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyring implementation (feature-gated)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "keyring")]
fn keyring_get() -> Result<Option<String>> {
    // Keep tests isolated from the local machine's keychain.
    if cfg!(test) {
        return Ok(None);
    }
    let entry = keyring::Entry::new(SERVICE_NAME, KEYRING_USER)
        .map_err(|e| OAuthError::TokenLoadFailed(format!("keyring error: {}", e)))?;
    match entry.get_password() {
        Ok(value) if !value.is_empty() => Ok(Some(value)),
        Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(OAuthError::TokenLoadFailed(format!("keyring error: {}", e))),
    }
}

#[cfg(feature = "keyring")]
fn keyring_set(secret: &str) -> Result<()> {
    if cfg!(test) {
        return Err(OAuthError::TokenPersistenceFailed(
            "keyring access disabled in tests".to_string(),
        ));
    }
    let entry = keyring::Entry::new(SERVICE_NAME, KEYRING_USER)
        .map_err(|e| OAuthError::TokenPersistenceFailed(format!("keyring error: {}", e)))?;
    entry
        .set_password(secret)
        .map_err(|e| OAuthError::TokenPersistenceFailed(format!("failed to store in keyring: {}", e)))
}

// ============================================================================
// InMemoryTokenStore (for testing)
// ============================================================================

/// In-memory token store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(refresh_token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(refresh_token.into())),
        }
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryTokenStore {
    async fn save(&self, refresh_token: &str) -> Result<()> {
        *self.token.write().await = Some(refresh_token.to_string());
        Ok(())
    }

    async fn try_load(&self) -> Result<Option<String>> {
        Ok(self.token.read().await.clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.token.write().await = None;
        Ok(())
    }

    fn has_token(&self) -> bool {
        self.token
            .try_read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

/// Create a shared encrypted file store.
pub fn create_token_store(data_dir: &Path) -> SharedTokenStore {
    Arc::new(EncryptedFileTokenStore::new(data_dir))
}

/// Create a shared in-memory store (for testing).
pub fn create_memory_token_store() -> SharedTokenStore {
    Arc::new(InMemoryTokenStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_empty_store() {
        let temp = tempdir().unwrap();
        let store = EncryptedFileTokenStore::new(temp.path());
        assert!(!store.has_token());
        assert_eq!(store.load().await, None);
        assert!(store.clear().await.is_ok());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let store = EncryptedFileTokenStore::new(temp.path());

        store.save("1//refresh-token-value").await.unwrap();
        assert!(store.has_token());
        assert_eq!(
            store.load().await.as_deref(),
            Some("1//refresh-token-value")
        );

        let on_disk = std::fs::read(temp.path().join(TOKEN_FILE)).unwrap();
        let needle = b"refresh-token-value";
        assert!(!on_disk.windows(needle.len()).any(|w| w == needle));
    }

    #[tokio::test]
    async fn test_survives_new_instance() {
        let temp = tempdir().unwrap();
        EncryptedFileTokenStore::new(temp.path())
            .save("persisted")
            .await
            .unwrap();

        let reopened = EncryptedFileTokenStore::new(temp.path());
        assert_eq!(reopened.load().await.as_deref(), Some("persisted"));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let temp = tempdir().unwrap();
        let store = EncryptedFileTokenStore::new(temp.path());
        store.save("first").await.unwrap();
        store.save("second").await.unwrap();
        assert_eq!(store.load().await.as_deref(), Some("second"));
        assert!(!temp.path().join("refresh_token.age.tmp").exists());
    }

    #[tokio::test]
    async fn test_clear() {
        let temp = tempdir().unwrap();
        let store = EncryptedFileTokenStore::new(temp.path());
        store.save("gone-soon").await.unwrap();
        store.clear().await.unwrap();
        assert!(!store.has_token());
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_as_none() {
        let temp = tempdir().unwrap();
        let store = EncryptedFileTokenStore::new(temp.path());
        store.save("valid").await.unwrap();
        std::fs::write(store.token_path(), b"not an age file").unwrap();

        assert_eq!(store.load().await, None);
        assert!(matches!(
            store.try_load().await,
            Err(OAuthError::TokenLoadFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_identity_loads_as_none() {
        let temp = tempdir().unwrap();
        let store = EncryptedFileTokenStore::new(temp.path());
        store.save("orphaned").await.unwrap();
        std::fs::remove_file(temp.path().join(IDENTITY_FILE)).unwrap();

        assert_eq!(store.load().await, None);

        // A fresh save recovers with a new identity.
        store.save("recovered").await.unwrap();
        assert_eq!(store.load().await.as_deref(), Some("recovered"));
    }

    #[tokio::test]
    async fn test_foreign_identity_cannot_decrypt() {
        let temp = tempdir().unwrap();
        let store = EncryptedFileTokenStore::new(temp.path());
        store.save("secret").await.unwrap();

        let other = Identity::generate();
        std::fs::write(
            temp.path().join(IDENTITY_FILE),
            other.to_string().expose_secret(),
        )
        .unwrap();

        assert_eq!(store.load().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let store = EncryptedFileTokenStore::new(temp.path());
        store.save("private").await.unwrap();

        for name in [TOKEN_FILE, IDENTITY_FILE] {
            let mode = std::fs::metadata(temp.path().join(name))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600, "{}", name);
        }
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryTokenStore::new();
        assert!(!store.has_token());
        store.save("mem").await.unwrap();
        assert!(store.has_token());
        assert_eq!(store.load().await.as_deref(), Some("mem"));
        store.clear().await.unwrap();
        assert_eq!(store.load().await, None);

        let seeded = InMemoryTokenStore::with_token("seeded");
        assert_eq!(seeded.load().await.as_deref(), Some("seeded"));
    }

    #[tokio::test]
    async fn test_shared_store_constructors() {
        let temp = tempdir().unwrap();
        let shared = create_token_store(temp.path());
        shared.save("via-arc").await.unwrap();
        assert_eq!(shared.load().await.as_deref(), Some("via-arc"));

        let memory = create_memory_token_store();
        assert!(!memory.has_token());
    }
}
