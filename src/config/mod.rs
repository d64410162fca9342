use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub mod cors;

pub use cors::create_cors_layer;

const DEFAULT_DATABASE_NAME: &str = "interndtevent";
const DEFAULT_APP_NAME: &str = "events-api";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_EVENT_UID: i64 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub database: String,
    pub app_name: String,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub port: u16,
    /// Empty means any origin is accepted.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub uploads: UploadConfig,
    pub default_uid: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let uri = var("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?;

        Ok(Self {
            database: DatabaseConfig {
                uri,
                database: var("MONGODB_DATABASE")
                    .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
                app_name: var("MONGODB_APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            },
            http: HttpConfig {
                port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
                cors_allowed_origins: var("CORS_ALLOWED_ORIGINS")
                    .map(|origins| split_list(&origins))
                    .unwrap_or_default(),
            },
            uploads: UploadConfig {
                dir: var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
                max_bytes: parse_or(
                    "UPLOAD_MAX_BYTES",
                    var("UPLOAD_MAX_BYTES"),
                    DEFAULT_UPLOAD_MAX_BYTES,
                )?,
            },
            default_uid: parse_or("EVENT_DEFAULT_UID", var("EVENT_DEFAULT_UID"), DEFAULT_EVENT_UID)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
