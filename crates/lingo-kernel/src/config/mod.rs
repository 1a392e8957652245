//! Configuration loading
//!
//! Gateway configuration can be written in any format the `config` crate
//! understands: YAML, TOML, JSON, INI, RON, JSON5.
//!
//! ## Features
//!
//! - Auto-detection of format from file extension
//! - Environment variable substitution (`${VAR}` and `$VAR` syntax)
//! - Layering of several files, later ones overriding earlier ones
//! - `LINGO__*` environment overrides for [`GatewayConfig`]

mod gateway;


pub use config::FileFormat;
pub use gateway::{GatewayConfig, OverBudgetPolicy, ENV_PREFIX};

use config::{Config as Cfg, Environment, File};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::LazyLock;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The configuration parsed but describes an unusable gateway.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

static BRACED_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("braced env var pattern is valid")
});

static BARE_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("bare env var pattern is valid")
});

/// Detect configuration format from file extension
///
/// - YAML: `.yaml`, `.yml`
/// - TOML: `.toml`
/// - JSON: `.json`
/// - INI: `.ini`
/// - RON: `.ron`
/// - JSON5: `.json5`
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute environment variables in a string
///
/// `${VAR_NAME}` is replaced first, then bare `$VAR_NAME`. References to
/// unset variables are left untouched.
pub fn substitute_env_vars(content: &str) -> String {
    let braced = BRACED_VAR.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });

    BARE_VAR
        .replace_all(&braced, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

fn build<T: DeserializeOwned>(builder: config::ConfigBuilder<config::builder::DefaultState>) -> ConfigResult<T> {
    let config = builder
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

fn file_source(path: &str) -> ConfigResult<File<config::FileSourceString, FileFormat>> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    Ok(File::from_str(&substitute_env_vars(&content), format))
}

/// Load configuration from a file, detecting the format from its extension.
pub fn load_config<T>(path: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    build(Cfg::builder().add_source(file_source(path)?))
}

/// Load configuration from a string with explicit format
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let substituted = substitute_env_vars(content);
    build(Cfg::builder().add_source(File::from_str(&substituted, format)))
}

/// Load configuration from multiple files with later files overriding earlier ones
pub fn load_merged<T>(paths: &[&str]) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let mut builder = Cfg::builder();
    for path in paths {
        builder = builder.add_source(file_source(path)?);
    }
    build(builder)
}

/// Load configuration with environment variable overrides
///
/// Variables are named `{PREFIX}__{FIELD}`, with `__` separating nested keys,
/// e.g. `LINGO__MAX_MEMORY_MB=4096`.
pub fn load_with_env<T>(path: &str, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    build(
        Cfg::builder()
            .add_source(file_source(path)?)
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            ),
    )
}
