use crate::error::{Result, WarehouseError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SNOWFLAKE_ACCOUNT: &str = "SNOWFLAKE_ACCOUNT";
pub const SNOWFLAKE_USER: &str = "SNOWFLAKE_USER";
pub const SNOWFLAKE_PASSWORD: &str = "SNOWFLAKE_PASSWORD";
pub const SNOWFLAKE_WAREHOUSE: &str = "SNOWFLAKE_WAREHOUSE";
pub const SNOWFLAKE_DATABASE: &str = "SNOWFLAKE_DATABASE";
pub const SNOWFLAKE_SCHEMA: &str = "SNOWFLAKE_SCHEMA";
pub const SNOWFLAKE_HOST: &str = "SNOWFLAKE_HOST";
pub const LIBSQL_URL: &str = "LIBSQL_URL";
pub const LIBSQL_AUTH_TOKEN: &str = "LIBSQL_AUTH_TOKEN";

/// Variables that must all be present for a Snowflake session.
pub const REQUIRED_VARS: [&str; 6] = [
    SNOWFLAKE_ACCOUNT,
    SNOWFLAKE_USER,
    SNOWFLAKE_PASSWORD,
    SNOWFLAKE_WAREHOUSE,
    SNOWFLAKE_DATABASE,
    SNOWFLAKE_SCHEMA,
];

pub const DEFAULT_SETTINGS_FILE: &str = "culture_warehouse.toml";
pub const DEFAULT_FINANCIAL_DIR: &str = "Data/Data for Financial assistances for Art and Culture Promotion";
pub const DEFAULT_TOURISM_DIR: &str = "Data/Tourism Data";

#[derive(Clone)]
pub struct SnowflakeConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub host: Option<String>,
}

impl SnowflakeConfig {
    pub fn base_url(&self) -> String {
        match &self.host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}.snowflakecomputing.com", self.account),
        }
    }
}

// Password stays out of logs.
impl std::fmt::Debug for SnowflakeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("host", &self.host)
            .finish()
    }
}

/// Where sessions are opened.
#[derive(Debug, Clone)]
pub enum WarehouseTarget {
    Snowflake(SnowflakeConfig),
    Libsql {
        url: String,
        auth_token: Option<String>,
    },
}

impl WarehouseTarget {
    /// Resolve the target from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the target from an arbitrary variable source.
    ///
    /// `LIBSQL_URL` selects libSQL; otherwise every Snowflake variable in
    /// [`REQUIRED_VARS`] must be set and non-empty, and the error lists all
    /// of the ones that are not.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(LIBSQL_URL) {
            return Ok(Self::Libsql {
                url,
                auth_token: get(LIBSQL_AUTH_TOKEN),
            });
        }

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|&&key| get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(WarehouseError::MissingEnv { missing });
        }

        let value = |key: &str| get(key).unwrap_or_default();
        Ok(Self::Snowflake(SnowflakeConfig {
            account: value(SNOWFLAKE_ACCOUNT),
            user: value(SNOWFLAKE_USER),
            password: value(SNOWFLAKE_PASSWORD),
            warehouse: value(SNOWFLAKE_WAREHOUSE),
            database: value(SNOWFLAKE_DATABASE),
            schema: value(SNOWFLAKE_SCHEMA),
            host: get(SNOWFLAKE_HOST),
        }))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Snowflake(cfg) => format!(
                "snowflake account={} database={}.{}",
                cfg.account, cfg.database, cfg.schema
            ),
            Self::Libsql { url, .. } => format!("libsql {url}"),
        }
    }
}

/// Optional on-disk settings; every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ingest: IngestSettings,
    pub verify: VerifySettings,
    pub dashboard: DashboardSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub financial_dir: PathBuf,
    pub tourism_dir: PathBuf,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            financial_dir: PathBuf::from(DEFAULT_FINANCIAL_DIR),
            tourism_dir: PathBuf::from(DEFAULT_TOURISM_DIR),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerifySettings {
    pub sample_limit: usize,
}

impl Default for VerifySettings {
    fn default() -> Self {
        Self { sample_limit: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub port: u16,
    pub frame_ancestors: Vec<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            port: 8501,
            frame_ancestors: (3000..=3004)
                .map(|port| format!("http://localhost:{port}"))
                .collect(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from [`DEFAULT_SETTINGS_FILE`] when it
    /// exists, or fall back to defaults. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| {
            WarehouseError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
