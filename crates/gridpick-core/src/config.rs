// Configuration loading and parsing (gridpick.toml).

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// File name of the config inside `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "gridpick.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub db_path: String,
    pub drivers_path: String,
}

// ---------------------------------------------------------------------------
// gridpick.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire gridpick.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    league: LeagueConfig,
    database: DatabaseSection,
    catalog: CatalogSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Participants every draft order must include. Empty means any
    /// non-empty order is accepted.
    #[serde(default)]
    pub participants: Vec<String>,
    /// Default number of rounds for a new draft.
    pub rounds_total: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogSection {
    drivers: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate a config from TOML text. `path` is only used for
/// error messages.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = Config {
        league: file.league,
        db_path: file.database.path,
        drivers_path: file.catalog.drivers,
    };

    validate(&config)?;

    Ok(config)
}

/// Load and validate configuration from `config/gridpick.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Seed `config/gridpick.toml` from `defaults/gridpick.toml` if it is
/// missing. Returns the path written, or `None` when a config was already in
/// place. A config created concurrently is left untouched.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let copy_error = |message: String| ConfigError::DefaultsCopyError { message };

    let mut defaults = std::fs::File::open(&source).map_err(|e| {
        copy_error(format!(
            "no {} and no usable {} ({e}); run from the project root",
            target.display(),
            source.display()
        ))
    })?;

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| copy_error(format!("failed to create {}: {e}", dir.display())))?;
    }

    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(copy_error(format!("failed to create {}: {e}", target.display()))),
    };
    std::io::copy(&mut defaults, &mut dest)
        .map_err(|e| copy_error(format!("failed to write {}: {e}", target.display())))?;

    info!("Created {} from defaults", target.display());
    Ok(Some(target))
}

/// Convenience wrapper: loads config relative to `base_dir`, seeding it from
/// `defaults/` first if it is missing.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.name".into(),
            message: "must not be empty".into(),
        });
    }

    if config.league.rounds_total == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.rounds_total".into(),
            message: "must be greater than 0".into(),
        });
    }

    let mut seen = HashSet::new();
    for name in &config.league.participants {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "league.participants".into(),
                message: "must not contain blank names".into(),
            });
        }
        if !seen.insert(name) {
            return Err(ConfigError::ValidationError {
                field: "league.participants".into(),
                message: format!("`{name}` is listed more than once"),
            });
        }
    }

    let paths: &[(&str, &str)] = &[
        ("database.path", config.db_path.as_str()),
        ("catalog.drivers", config.drivers_path.as_str()),
    ];
    for (field, value) in paths {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: field.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
