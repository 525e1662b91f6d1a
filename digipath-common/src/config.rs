//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`DIGIPATH_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The service binary merges tiers 1 and 2 through clap's `env` fallbacks
//! and hands the result over as [`SettingsOverrides`]. The root folder is
//! resolved here directly so library users get the same behaviour.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const ROOT_FOLDER_ENV: &str = "DIGIPATH_ROOT_FOLDER";
pub const DEFAULT_PORT: u16 = 5730;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_DATABASE_FILE: &str = "digipath.db";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_ACCESS_TOKEN_MINUTES: u64 = 10_080;
pub const MAX_REFRESH_TOKEN_DAYS: u64 = 365;

// ========================================
// TOML file
// ========================================

/// Bootstrap configuration read from the TOML file
///
/// Every field is optional; absent values fall through to compiled
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Database file name (relative to root folder) or absolute path
    pub database: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub http: HttpConfig,
    pub content: ContentConfig,
}

/// `[logging]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
    pub level: Option<String>,
}

/// `[auth]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub access_token_minutes: Option<u64>,
    pub refresh_token_days: Option<u64>,
    pub admin_email: Option<String>,
    pub admin_name: Option<String>,
    pub admin_password: Option<String>,
}

/// `[http]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Option<Vec<String>>,
    pub cache_ttl_secs: Option<u64>,
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
}

/// `[content]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Insert the default organ/type/level taxonomy when tags are empty
    pub seed_default_tags: Option<bool>,
}

/// Locate the config file: an explicit path, or the platform default
///
/// On Linux `~/.config/digipath/config.toml` is tried before
/// `/etc/digipath/config.toml`.
pub fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let user_config = dirs::config_dir().map(|d| d.join("digipath").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/digipath/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load the TOML config, falling back to defaults on any problem
///
/// A missing, unreadable or unparsable file is logged and ignored: the
/// service still starts on compiled defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> TomlConfig {
    let Some(path) = config_file_path(explicit) else {
        info!("No config file found, using defaults");
        return TomlConfig::default();
    };

    match parse_toml_file(&path) {
        Ok(config) => {
            info!("Loaded config file {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} (using defaults)", e);
            TomlConfig::default()
        }
    }
}

/// Read and parse a TOML config file
pub fn parse_toml_file(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file {}: {}", path.display(), e)))
}

// ========================================
// Root folder
// ========================================

/// Resolve the root folder (database and runtime files)
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    get_default_root_folder()
}

/// OS-dependent default root folder
pub fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/digipath
        dirs::data_local_dir()
            .map(|d| d.join("digipath"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/digipath"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("digipath"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/digipath"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("digipath"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\digipath"))
    } else {
        PathBuf::from("./digipath_data")
    }
}

// ========================================
// Resolved settings
// ========================================

/// Values supplied on the command line or through `DIGIPATH_*` variables
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub database: Option<PathBuf>,
    pub log_level: Option<String>,
    pub jwt_secret: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub seed_default_tags: Option<bool>,
}

/// Account created at startup when no admin with that email exists
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub log_level: String,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub cors_origins: Vec<String>,
    pub cache_ttl: Duration,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub seed_default_tags: bool,
    pub event_capacity: usize,
}

/// Token lifetime of `value` units, each `unit_secs` long, within `1..=max`
fn token_ttl(field: &str, value: u64, max: u64, unit_secs: u64) -> Result<Duration> {
    if value == 0 || value > max {
        return Err(Error::Config(format!(
            "{} must be between 1 and {} (got {})",
            field, max, value
        )));
    }
    Ok(Duration::from_secs(value * unit_secs))
}

impl Settings {
    /// Merge overrides, TOML values and compiled defaults
    pub fn resolve(overrides: SettingsOverrides, toml: TomlConfig) -> Result<Self> {
        let root_folder = resolve_root_folder(overrides.root_folder.as_deref(), &toml);

        let database = overrides
            .database
            .or(toml.database)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE));
        let database_path = if database.is_absolute() {
            database
        } else {
            root_folder.join(database)
        };

        let jwt_secret = match overrides.jwt_secret.or(toml.auth.jwt_secret) {
            Some(secret) if secret.trim().is_empty() => {
                return Err(Error::Config("jwt_secret must not be blank".to_string()));
            }
            Some(secret) => secret,
            None => {
                warn!("No jwt_secret configured; generated an ephemeral secret (tokens will not survive a restart)");
                format!(
                    "{}{}",
                    uuid::Uuid::new_v4().simple(),
                    uuid::Uuid::new_v4().simple()
                )
            }
        };

        let default_page_size = toml.http.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let max_page_size = toml.http.max_page_size.unwrap_or(MAX_PAGE_SIZE);
        if default_page_size == 0 || max_page_size == 0 || default_page_size > max_page_size {
            return Err(Error::Config(format!(
                "Invalid page sizes: default {} / max {}",
                default_page_size, max_page_size
            )));
        }

        let access_token_ttl = token_ttl(
            "access_token_minutes",
            toml.auth.access_token_minutes.unwrap_or(60),
            MAX_ACCESS_TOKEN_MINUTES,
            60,
        )?;
        let refresh_token_ttl = token_ttl(
            "refresh_token_days",
            toml.auth.refresh_token_days.unwrap_or(7),
            MAX_REFRESH_TOKEN_DAYS,
            86_400,
        )?;

        let admin_email = overrides.admin_email.or(toml.auth.admin_email);
        let admin_password = overrides.admin_password.or(toml.auth.admin_password);
        let bootstrap_admin = match (admin_email, admin_password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(BootstrapAdmin {
                    email: email.trim().to_lowercase(),
                    name: toml.auth.admin_name.unwrap_or_else(|| "Administrator".to_string()),
                    password,
                })
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!("Bootstrap admin needs both admin_email and admin_password; skipping");
                None
            }
            _ => None,
        };

        Ok(Settings {
            root_folder,
            bind: overrides
                .bind
                .or(toml.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            database_path,
            log_level: overrides
                .log_level
                .or(toml.logging.level)
                .unwrap_or_else(|| "info".to_string()),
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            cors_origins: overrides
                .cors_origins
                .or(toml.http.cors_origins)
                .unwrap_or_default(),
            cache_ttl: Duration::from_secs(toml.http.cache_ttl_secs.unwrap_or(60)),
            default_page_size,
            max_page_size,
            bootstrap_admin,
            seed_default_tags: overrides
                .seed_default_tags
                .or(toml.content.seed_default_tags)
                .unwrap_or(true),
            event_capacity: 256,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_root_folder_not_empty() {
        assert!(!get_default_root_folder().as_os_str().is_empty());
    }

    #[test]
    fn test_toml_sections_parse() {
        let toml: TomlConfig = toml::from_str(
            r#"
            port = 6000
            [auth]
            jwt_secret = "s3cret"
            access_token_minutes = 15
            [http]
            cors_origins = ["https://digipath.example"]
            "#,
        )
        .unwrap();
        assert_eq!(toml.port, Some(6000));
        assert_eq!(toml.auth.access_token_minutes, Some(15));
        assert_eq!(toml.http.cors_origins.unwrap().len(), 1);
        assert!(toml.logging.level.is_none());
    }

    #[test]
    fn test_overrides_win_over_toml() {
        let toml = TomlConfig {
            port: Some(6000),
            root_folder: Some(PathBuf::from("/srv/digipath")),
            ..Default::default()
        };
        let overrides = SettingsOverrides {
            port: Some(7000),
            root_folder: Some(PathBuf::from("/tmp/dp")),
            jwt_secret: Some("x".repeat(32)),
            ..Default::default()
        };
        let settings = Settings::resolve(overrides, toml).unwrap();
        assert_eq!(settings.port, 7000);
        assert_eq!(settings.database_path, PathBuf::from("/tmp/dp/digipath.db"));
    }

    #[test]
    fn test_blank_secret_rejected() {
        let overrides = SettingsOverrides {
            jwt_secret: Some("  ".to_string()),
            root_folder: Some(PathBuf::from("/tmp/dp")),
            ..Default::default()
        };
        assert!(matches!(
            Settings::resolve(overrides, TomlConfig::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_bootstrap_admin_requires_both_fields() {
        let overrides = SettingsOverrides {
            root_folder: Some(PathBuf::from("/tmp/dp")),
            jwt_secret: Some("k".into()),
            admin_email: Some("Admin@Example.org ".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(overrides.clone(), TomlConfig::default()).unwrap();
        assert!(settings.bootstrap_admin.is_none());

        let overrides = SettingsOverrides {
            admin_password: Some("pw".into()),
            ..overrides
        };
        let settings = Settings::resolve(overrides, TomlConfig::default()).unwrap();
        assert_eq!(settings.bootstrap_admin.unwrap().email, "admin@example.org");
    }
}
