//! Config file handling and option resolution for the pacer CLI.
//!
//! `pacer init` writes a TOML file at `~/.config/pacer/config.toml`; every
//! other command resolves its settings through the chain
//! CLI flag > environment > config file > built-in default.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use pacer_core::token::{TOKEN_SECRET_ENV, TokenSigner};
use pacer_db::config::{DbConfig, URL_ENV as DB_URL_ENV};

// -----------------------------------------------------------------------
// Config file shape
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub auth: AuthSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// HMAC signing secret, hex-encoded (64 hex chars = 32 bytes).
    pub token_secret: String,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// The pacer config directory.
///
/// XDG layout on every platform: `$XDG_CONFIG_HOME/pacer`, else
/// `~/.config/pacer`. `dirs::config_dir()` is deliberately not used because
/// it maps to `~/Library/Application Support` on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("pacer");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("pacer")
}

/// Full path to the config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Errors if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents).context("failed to parse config file")
}

/// Write the config file, creating parent directories as needed.
///
/// The file holds a signing secret, so permissions are tightened to 0600
/// on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let path = config_path();
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Generate a fresh signing secret: 32 random bytes, hex-encoded.
pub fn generate_token_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Resolution
// -----------------------------------------------------------------------

/// Everything a command needs, fully resolved.
#[derive(Debug)]
pub struct PacerConfig {
    pub db_config: DbConfig,
    pub tokens: TokenSigner,
}

impl PacerConfig {
    /// Resolve settings from the CLI flag, environment, and config file.
    ///
    /// The database URL falls back to [`DbConfig::DEFAULT_URL`]; a missing
    /// token secret is an error because without it no bearer token can be
    /// minted or verified.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file = load_config().ok();

        Ok(Self {
            db_config: DbConfig::new(resolved_db_url(cli_db_url, file.as_ref())),
            tokens: resolved_signer(file.as_ref())?,
        })
    }
}

fn resolved_db_url(cli_db_url: Option<&str>, file: Option<&ConfigFile>) -> String {
    if let Some(url) = cli_db_url {
        return url.to_string();
    }
    if let Ok(url) = std::env::var(DB_URL_ENV) {
        return url;
    }
    match file {
        Some(cfg) => cfg.database.url.clone(),
        None => DbConfig::DEFAULT_URL.to_string(),
    }
}

fn resolved_signer(file: Option<&ConfigFile>) -> Result<TokenSigner> {
    let secret_hex = match std::env::var(TOKEN_SECRET_ENV) {
        Ok(hex) => hex,
        Err(_) => match file {
            Some(cfg) => cfg.auth.token_secret.clone(),
            None => bail!(
                "token secret not found; set {TOKEN_SECRET_ENV} or run `pacer init` to create a config file"
            ),
        },
    };
    let secret = hex::decode(secret_hex.trim()).context("token secret is not valid hex")?;
    Ok(TokenSigner::new(secret))
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    /// Redirect the config dir to a temp dir for the duration of a closure,
    /// restoring the previous value before returning.
    fn with_temp_config_dir<T>(f: impl FnOnce() -> T) -> T {
        let tmp = tempfile::TempDir::new().unwrap();
        let orig = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let out = f();

        match orig {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        out
    }

    const SECRET_HEX: &str = "aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55";

    #[test]
    fn generated_secret_is_64_hex_chars() {
        let secret = generate_token_secret();
        assert_eq!(secret.len(), 64);
        assert!(
            secret.chars().all(|c| c.is_ascii_hexdigit()),
            "expected all hex digits, got: {secret}"
        );
    }

    #[test]
    fn generated_secrets_differ() {
        assert_ne!(generate_token_secret(), generate_token_secret());
    }

    #[test]
    fn config_roundtrips_through_save_and_load() {
        let _lock = lock_env();

        let (saved, loaded) = with_temp_config_dir(|| {
            let original = ConfigFile {
                database: DatabaseSection {
                    url: "postgresql://testhost:5432/testdb".to_string(),
                },
                auth: AuthSection {
                    token_secret: "ab".repeat(32),
                },
            };
            (save_config(&original), load_config())
        });

        saved.unwrap();
        let loaded = loaded.unwrap();
        assert_eq!(loaded.database.url, "postgresql://testhost:5432/testdb");
        assert_eq!(loaded.auth.token_secret, "ab".repeat(32));
    }

    #[cfg(unix)]
    #[test]
    fn saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();

        let mode = with_temp_config_dir(|| {
            let cfg = ConfigFile {
                database: DatabaseSection {
                    url: DbConfig::DEFAULT_URL.to_string(),
                },
                auth: AuthSection {
                    token_secret: "cd".repeat(32),
                },
            };
            save_config(&cfg).unwrap();
            std::fs::metadata(config_path()).unwrap().permissions().mode()
        });

        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn cli_flag_beats_env_var() {
        let _lock = lock_env();

        unsafe { std::env::set_var(DB_URL_ENV, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(TOKEN_SECRET_ENV, SECRET_HEX) };

        let config = PacerConfig::resolve(Some("postgresql://cli:5432/clidb"));

        unsafe { std::env::remove_var(DB_URL_ENV) };
        unsafe { std::env::remove_var(TOKEN_SECRET_ENV) };

        let config = config.unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
    }

    #[test]
    fn env_var_sets_db_url() {
        let _lock = lock_env();

        unsafe { std::env::set_var(DB_URL_ENV, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(TOKEN_SECRET_ENV, SECRET_HEX) };

        let config = PacerConfig::resolve(None);

        unsafe { std::env::remove_var(DB_URL_ENV) };
        unsafe { std::env::remove_var(TOKEN_SECRET_ENV) };

        let config = config.unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
    }

    #[test]
    fn db_url_defaults_when_nothing_set() {
        let _lock = lock_env();

        unsafe { std::env::remove_var(DB_URL_ENV) };
        unsafe { std::env::set_var(TOKEN_SECRET_ENV, SECRET_HEX) };

        // Hide any real config file on the machine running the tests.
        let config = with_temp_config_dir(|| PacerConfig::resolve(None));

        unsafe { std::env::remove_var(TOKEN_SECRET_ENV) };

        assert_eq!(config.unwrap().db_config.database_url, DbConfig::DEFAULT_URL);
    }

    #[test]
    fn missing_token_secret_is_an_error() {
        let _lock = lock_env();

        unsafe { std::env::remove_var(TOKEN_SECRET_ENV) };

        let result =
            with_temp_config_dir(|| PacerConfig::resolve(Some("postgresql://localhost:5432/x")));

        let msg = result.unwrap_err().to_string();
        assert!(
            msg.contains("token secret not found"),
            "unexpected error: {msg}"
        );
    }

    #[test]
    fn garbage_secret_in_env_is_an_error() {
        let _lock = lock_env();

        unsafe { std::env::set_var(TOKEN_SECRET_ENV, "not-hex-at-all") };

        let result =
            with_temp_config_dir(|| PacerConfig::resolve(Some("postgresql://localhost:5432/x")));

        unsafe { std::env::remove_var(TOKEN_SECRET_ENV) };

        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("not valid hex"), "unexpected error: {msg}");
    }

    #[test]
    fn config_path_is_under_pacer_dir() {
        let path = config_path();
        assert!(
            path.ends_with("pacer/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
