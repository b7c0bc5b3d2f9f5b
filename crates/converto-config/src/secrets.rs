//! Secrets management: OAuth client secret storage and retrieval.
//!
//! Resolution order:
//! 1. System keyring (if `keyring` feature enabled)
//! 2. Environment variable
//! 3. Config file (with warning)
//!
//! Keyring entries are stored as service="converto", user="<name>".

/// Keyring service name.
#[cfg(feature = "keyring")]
const SERVICE_NAME: &str = "converto";

/// A secret the client may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    GoogleClientSecret,
}

impl SecretKind {
    /// Environment variable consulted after the keyring.
    pub fn env_var(&self) -> &'static str {
        match self {
            SecretKind::GoogleClientSecret => "CONVERTO_GOOGLE_CLIENT_SECRET",
        }
    }

    fn keyring_user(&self) -> &'static str {
        match self {
            SecretKind::GoogleClientSecret => "google_client_secret",
        }
    }
}

/// Result of secret resolution with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// OS keyring (macOS Keychain, Linux secret-service, Windows Credential Manager).
    Keyring,
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::Keyring => write!(f, "system keyring"),
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve a secret using the full resolution chain.
pub fn resolve_secret(kind: SecretKind, config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_with_env(kind, config_value, |var| std::env::var(var).ok())
}

fn resolve_with_env(
    kind: SecretKind,
    config_value: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<ResolvedSecret> {
    if let Some(secret) = get_from_keyring(kind) {
        return Some(secret);
    }

    let env_var = kind.env_var();
    if let Some(value) = env(env_var)
        && !value.is_empty()
    {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value
        .filter(|v| !v.is_empty())
        .map(|value| ResolvedSecret {
            value: value.to_string(),
            source: SecretSource::ConfigFile,
        })
}

/// Store a secret in the system keyring.
///
/// Returns an error message if keyring is not available.
pub fn store_in_keyring(kind: SecretKind, secret: &str) -> std::result::Result<(), String> {
    store_keyring_entry(kind.keyring_user(), secret)
}

/// Delete a secret from the system keyring.
pub fn delete_from_keyring(kind: SecretKind) -> std::result::Result<(), String> {
    delete_keyring_entry(kind.keyring_user())
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyring implementation (feature-gated)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "keyring")]
fn get_from_keyring(kind: SecretKind) -> Option<ResolvedSecret> {
    // Keep tests isolated from the local machine's keychain.
    if cfg!(test) {
        return None;
    }

    let entry = keyring::Entry::new(SERVICE_NAME, kind.keyring_user()).ok()?;
    let value = entry.get_password().ok()?;
    if value.is_empty() {
        return None;
    }
    Some(ResolvedSecret {
        value,
        source: SecretSource::Keyring,
    })
}

#[cfg(feature = "keyring")]
fn store_keyring_entry(user: &str, secret: &str) -> std::result::Result<(), String> {
    if cfg!(test) {
        return Err("keyring access disabled in tests".to_string());
    }
    let entry =
        keyring::Entry::new(SERVICE_NAME, user).map_err(|e| format!("keyring error: {}", e))?;
    entry
        .set_password(secret)
        .map_err(|e| format!("failed to store in keyring: {}", e))
}

#[cfg(feature = "keyring")]
fn delete_keyring_entry(user: &str) -> std::result::Result<(), String> {
    if cfg!(test) {
        return Err("keyring access disabled in tests".to_string());
    }
    let entry =
        keyring::Entry::new(SERVICE_NAME, user).map_err(|e| format!("keyring error: {}", e))?;
    entry
        .delete_credential()
        .map_err(|e| format!("failed to delete from keyring: {}", e))
}

// ─────────────────────────────────────────────────────────────────────────────
// No-op stubs when keyring feature is disabled
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "keyring"))]
fn get_from_keyring(_kind: SecretKind) -> Option<ResolvedSecret> {
    None
}

#[cfg(not(feature = "keyring"))]
fn store_keyring_entry(_user: &str, _secret: &str) -> std::result::Result<(), String> {
    Err("keyring support not compiled in (enable the 'keyring' feature)".to_string())
}

#[cfg(not(feature = "keyring"))]
fn delete_keyring_entry(_user: &str) -> std::result::Result<(), String> {
    Err("keyring support not compiled in (enable the 'keyring' feature)".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_from_config_value() {
        let resolved =
            resolve_with_env(SecretKind::GoogleClientSecret, Some("from-file"), no_env).unwrap();
        assert_eq!(resolved.value, "from-file");
        assert_eq!(resolved.source, SecretSource::ConfigFile);
    }

    #[test]
    fn test_env_beats_config() {
        let resolved = resolve_with_env(SecretKind::GoogleClientSecret, Some("from-file"), |var| {
            (var == "CONVERTO_GOOGLE_CLIENT_SECRET").then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(resolved.value, "from-env");
        assert_eq!(
            resolved.source,
            SecretSource::EnvVar("CONVERTO_GOOGLE_CLIENT_SECRET".to_string())
        );
    }

    #[test]
    fn test_empty_values_ignored() {
        let resolved = resolve_with_env(SecretKind::GoogleClientSecret, Some(""), |_| {
            Some(String::new())
        });
        assert!(resolved.is_none());
        assert!(resolve_with_env(SecretKind::GoogleClientSecret, None, no_env).is_none());
    }

    #[test]
    fn test_secret_source_display() {
        assert_eq!(SecretSource::Keyring.to_string(), "system keyring");
        assert_eq!(
            SecretSource::EnvVar("CONVERTO_GOOGLE_CLIENT_SECRET".to_string()).to_string(),
            "env var CONVERTO_GOOGLE_CLIENT_SECRET"
        );
        assert_eq!(
            SecretSource::ConfigFile.to_string(),
            "config file (plaintext)"
        );
    }

    #[cfg(not(feature = "keyring"))]
    #[test]
    fn test_store_keyring_disabled() {
        let result = store_in_keyring(SecretKind::GoogleClientSecret, "test-secret");
        assert!(result.unwrap_err().contains("not compiled"));
        assert!(delete_from_keyring(SecretKind::GoogleClientSecret).is_err());
    }
}
