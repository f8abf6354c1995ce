//! Gateway configuration loaded from environment variables.
//!
//! Credentials **must** be provided via environment variables (or the OS
//! keychain, see [`crate::credentials`]):
//! - `SINOPAC_PERSON_ID`: login id
//! - `SINOPAC_PASSWORD`: login password
//!
//! Optional:
//! - `SINOPAC_CA_PATH` / `SINOPAC_CA_PASSWORD`: order-signing certificate;
//!   when the path is set the password must be set too
//! - `SINOPAC_STOCK_ACCOUNT` / `SINOPAC_FUTURES_ACCOUNT`: index of the
//!   default account per class, only consulted when that class has more
//!   than one account (default `0`)
//! - `SINOPAC_SIMULATION`: `true` to log into the broker's simulation
//!   environment
//! - `SINOPAC_RESOLVE_RETRY_MS`: delay before the single sequence-number
//!   resolution retry (default 100)

use std::time::Duration;

use zeroize::Zeroizing;

use crate::GatewayError;

/// Default delay before retrying a sequence-number lookup.
const DEFAULT_RESOLVE_RETRY_MS: u64 = 100;

/// Top-level gateway configuration.
#[derive(Debug)]
pub struct GatewayConfig {
    pub login: LoginConfig,
    pub accounts: AccountSelection,
    pub simulation: bool,
    pub resolve_retry_delay: Duration,
}

/// Broker login credentials.
#[derive(Debug)]
pub struct LoginConfig {
    pub person_id: String,
    pub password: Zeroizing<String>,
    pub ca_path: Option<String>,
    pub ca_password: Option<Zeroizing<String>>,
}

/// Default account indices per account class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountSelection {
    pub stock: usize,
    pub futures: usize,
}

/// Loads the gateway configuration from environment variables.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if the login id or password is missing,
/// if a certificate path is given without its password, or if an account
/// index or the retry delay is not a number.
pub fn fetch_config() -> crate::Result<GatewayConfig> {
    let person_id = non_empty_var("SINOPAC_PERSON_ID")
        .ok_or_else(|| GatewayError::Config("SINOPAC_PERSON_ID is missing".to_string()))?;
    let password = non_empty_var("SINOPAC_PASSWORD")
        .map(Zeroizing::new)
        .ok_or_else(|| GatewayError::Config("SINOPAC_PASSWORD is missing".to_string()))?;

    let ca_path = non_empty_var("SINOPAC_CA_PATH");
    let ca_password = non_empty_var("SINOPAC_CA_PASSWORD").map(Zeroizing::new);
    if ca_path.is_some() && ca_password.is_none() {
        return Err(GatewayError::Config(
            "SINOPAC_CA_PATH is set but SINOPAC_CA_PASSWORD is missing".to_string(),
        ));
    }

    let accounts = AccountSelection {
        stock: parse_var("SINOPAC_STOCK_ACCOUNT")?.unwrap_or(0),
        futures: parse_var("SINOPAC_FUTURES_ACCOUNT")?.unwrap_or(0),
    };

    let simulation = non_empty_var("SINOPAC_SIMULATION")
        .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

    let retry_ms = parse_var("SINOPAC_RESOLVE_RETRY_MS")?.unwrap_or(DEFAULT_RESOLVE_RETRY_MS);

    Ok(GatewayConfig {
        login: LoginConfig {
            person_id,
            password,
            ca_path,
            ca_password,
        },
        accounts,
        simulation,
        resolve_retry_delay: Duration::from_millis(retry_ms),
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Parses an optional numeric environment variable.
fn parse_var<T: std::str::FromStr>(name: &str) -> crate::Result<Option<T>> {
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GatewayError::Config(format!("{name} is not a number: {raw}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VARS: [&str; 8] = [
        "SINOPAC_PERSON_ID",
        "SINOPAC_PASSWORD",
        "SINOPAC_CA_PATH",
        "SINOPAC_CA_PASSWORD",
        "SINOPAC_STOCK_ACCOUNT",
        "SINOPAC_FUTURES_ACCOUNT",
        "SINOPAC_SIMULATION",
        "SINOPAC_RESOLVE_RETRY_MS",
    ];

    /// Serializes env mutation across the test threads of this module.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    /// Clears every gateway variable, applies `vars`, runs `f`, then
    /// restores the originals.
    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let originals: Vec<(&str, Option<String>)> = ALL_VARS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: ENV_LOCK keeps other config tests from touching the env.
        unsafe {
            for k in ALL_VARS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        for (k, original) in originals {
            // SAFETY: restoring original values while still holding ENV_LOCK.
            unsafe {
                match original {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    const LOGIN: [(&str, &str); 2] = [
        ("SINOPAC_PERSON_ID", "A123456789"),
        ("SINOPAC_PASSWORD", "secret"),
    ];

    #[test]
    fn defaults_with_login_only() {
        with_env(&LOGIN, || {
            let config = fetch_config().unwrap();
            assert_eq!(config.login.person_id, "A123456789");
            assert_eq!(config.login.password.as_str(), "secret");
            assert!(config.login.ca_path.is_none());
            assert_eq!(config.accounts, AccountSelection::default());
            assert!(!config.simulation);
            assert_eq!(config.resolve_retry_delay, Duration::from_millis(100));
        });
    }

    #[test]
    fn rejects_missing_password() {
        with_env(&[("SINOPAC_PERSON_ID", "A123456789")], || {
            let err = fetch_config().unwrap_err();
            assert!(err.to_string().contains("SINOPAC_PASSWORD is missing"));
        });
    }

    #[test]
    fn rejects_certificate_without_password() {
        let mut vars = LOGIN.to_vec();
        vars.push(("SINOPAC_CA_PATH", "/tmp/Sinopac.pfx"));
        with_env(&vars, || {
            let err = fetch_config().unwrap_err();
            assert!(err.to_string().contains("SINOPAC_CA_PASSWORD is missing"));
        });
    }

    #[test]
    fn reads_account_indices_and_flags() {
        let mut vars = LOGIN.to_vec();
        vars.extend([
            ("SINOPAC_STOCK_ACCOUNT", "1"),
            ("SINOPAC_FUTURES_ACCOUNT", " 2 "),
            ("SINOPAC_SIMULATION", "TRUE"),
            ("SINOPAC_RESOLVE_RETRY_MS", "250"),
        ]);
        with_env(&vars, || {
            let config = fetch_config().unwrap();
            assert_eq!(config.accounts.stock, 1);
            assert_eq!(config.accounts.futures, 2);
            assert!(config.simulation);
            assert_eq!(config.resolve_retry_delay, Duration::from_millis(250));
        });
    }

    #[test]
    fn rejects_non_numeric_index() {
        let mut vars = LOGIN.to_vec();
        vars.push(("SINOPAC_STOCK_ACCOUNT", "first"));
        with_env(&vars, || {
            let err = fetch_config().unwrap_err();
            assert!(err.to_string().contains("SINOPAC_STOCK_ACCOUNT is not a number"));
        });
    }

    #[test]
    fn empty_values_treated_as_absent() {
        let mut vars = LOGIN.to_vec();
        vars.extend([("SINOPAC_CA_PATH", ""), ("SINOPAC_STOCK_ACCOUNT", "")]);
        with_env(&vars, || {
            let config = fetch_config().unwrap();
            assert!(config.login.ca_path.is_none());
            assert_eq!(config.accounts.stock, 0);
        });
    }
}
