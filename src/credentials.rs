//! Secure credential storage via the OS keychain.
//!
//! At startup, [`populate_env_from_keychain`] copies any stored broker
//! secrets into environment variables so [`crate::config::fetch_config`]
//! picks them up transparently. Values are held in [`Zeroizing`] buffers
//! and wiped when dropped.

use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Keychain service name used for all stored credentials.
const SERVICE: &str = "sinopac-gateway";

/// Broker secrets managed by this module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialKey {
    Password,
    CaPassword,
}

impl CredentialKey {
    /// Returns the keychain entry identifier.
    pub fn keyring_id(self) -> &'static str {
        match self {
            Self::Password => "sinopac_password",
            Self::CaPassword => "sinopac_ca_password",
        }
    }

    /// Returns the environment variable name for this credential.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Password => "SINOPAC_PASSWORD",
            Self::CaPassword => "SINOPAC_CA_PASSWORD",
        }
    }

    pub const ALL: [CredentialKey; 2] = [Self::Password, Self::CaPassword];
}

/// Loads a credential from the keychain, returning `None` if not set.
pub fn load(key: CredentialKey) -> Option<Zeroizing<String>> {
    let entry = keyring::Entry::new(SERVICE, key.keyring_id()).ok()?;
    match entry.get_password() {
        Ok(password) => Some(Zeroizing::new(password)),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key = key.keyring_id(), error = %e, "failed to read keychain entry");
            None
        }
    }
}

/// Saves a credential to the keychain.
///
/// # Errors
///
/// Returns [`GatewayError::Config`](crate::GatewayError::Config) if the
/// keychain entry cannot be created or written.
pub fn save(key: CredentialKey, value: &str) -> crate::Result<()> {
    let entry = keyring::Entry::new(SERVICE, key.keyring_id())
        .map_err(|e| crate::GatewayError::Config(format!("keyring entry error: {e}")))?;
    entry
        .set_password(value)
        .map_err(|e| crate::GatewayError::Config(format!("failed to save to keychain: {e}")))
}

/// Populates environment variables from the keychain for any
/// credentials not already set in the environment.
///
/// Call this at startup before [`crate::config::fetch_config`].
pub fn populate_env_from_keychain() {
    for key in CredentialKey::ALL {
        if std::env::var(key.env_var()).is_err()
            && let Some(value) = load(key)
        {
            debug!(key = key.env_var(), "loaded credential from keychain");
            // SAFETY: called before the tokio runtime spawns any task.
            unsafe {
                std::env::set_var(key.env_var(), value.as_str());
            }
        }
    }
}
