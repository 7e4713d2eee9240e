/// Configuration module for ragchat.
///
/// Two layers: an immutable [`Env`] map (`.env` file plus process
/// environment) that carries credentials, and a JSON [`Config`] file with
/// non-secret settings and serde defaults.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm;
use crate::source::SourceKind;

/// Environment variable that selects the retrieval source.
pub const SOURCE_VAR: &str = "RAG_SOURCE";
/// Environment variable that overrides the number of documents to retrieve.
pub const NUM_RESULTS_VAR: &str = "RAG_NUM_RESULTS";
/// Environment variable that overrides the completion endpoint base URL.
pub const OPENAI_BASE_URL_VAR: &str = "OPENAI_BASE_URL";

const ENV_FILENAME: &str = ".env";
const APP_DIR: &str = "ragchat";

/// Errors raised while assembling configuration. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to read env file {}: {message}", .path.display())]
    EnvFile { path: PathBuf, message: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

// ── Environment ──────────────────────────────────────────────────────

/// Where the environment map came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOrigin {
    /// Variables from this file, overlaid by the process environment.
    File(PathBuf),
    /// Process environment only.
    Process,
}

/// Flat map of environment variables, read once at startup.
#[derive(Clone)]
pub struct Env {
    vars: HashMap<String, String>,
    origin: EnvOrigin,
}

// Values are credentials; only key names are printed.
impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.vars.keys().collect();
        keys.sort();
        f.debug_struct("Env")
            .field("keys", &keys)
            .field("origin", &self.origin)
            .finish()
    }
}

impl Env {
    /// Load the environment.
    ///
    /// An explicit `env_file` must exist. Otherwise `./.env` and then
    /// `<config dir>/ragchat/.env` are tried. File values never override
    /// variables already set in the process environment.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match env_file {
            Some(p) if !p.exists() => {
                return Err(ConfigError::EnvFile {
                    path: p.to_path_buf(),
                    message: "file not found".to_string(),
                });
            }
            Some(p) => Some(p.to_path_buf()),
            None => default_env_paths().into_iter().find(|p| p.is_file()),
        };

        let mut vars = HashMap::new();
        let origin = match path {
            Some(path) => {
                vars.extend(read_env_file(&path)?);
                EnvOrigin::File(path)
            }
            None => EnvOrigin::Process,
        };

        vars.extend(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, v.into_string().ok()?))
        }));

        debug!("Environment loaded ({} variables)", vars.len());
        Ok(Self { vars, origin })
    }

    /// Build an environment from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            origin: EnvOrigin::Process,
        }
    }

    #[must_use]
    pub fn origin(&self) -> &EnvOrigin {
        &self.origin
    }

    /// Look up a variable. Blank values count as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Every key from `keys` that is unset, sorted and deduplicated.
    #[must_use]
    pub fn missing(&self, keys: &[&str]) -> Vec<String> {
        let mut missing: Vec<String> = keys
            .iter()
            .filter(|k| self.get(k).is_none())
            .map(|k| (*k).to_string())
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// Fetch all `keys` or fail with the complete list of missing ones.
    pub fn require<const N: usize>(&self, keys: [&str; N]) -> Result<[String; N], ConfigError> {
        let missing = self.missing(&keys);
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnvVars(missing));
        }
        Ok(keys.map(|k| self.get(k).unwrap_or_default().to_string()))
    }
}

fn default_env_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(ENV_FILENAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_DIR).join(ENV_FILENAME));
    }
    paths
}

fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let to_error = |e: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    dotenvy::from_path_iter(path)
        .map_err(to_error)?
        .map(|item| item.map_err(to_error))
        .collect()
}

// ── Default value functions ──────────────────────────────────────────

fn default_num_results() -> usize {
    5
}

fn default_model() -> String {
    llm::DEFAULT_MODEL.to_string()
}

fn default_openai_base_url() -> String {
    llm::openai::DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

// ── Config struct ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub source: SourceKind,

    #[serde(default = "default_num_results")]
    pub num_results: usize,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retry once without certificate verification when TLS validation fails.
    #[serde(default)]
    pub allow_insecure_tls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            num_results: default_num_results(),
            model: default_model(),
            openai_base_url: default_openai_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            allow_insecure_tls: false,
        }
    }
}

impl Config {
    /// Load settings from a JSON file.
    ///
    /// A missing file yields defaults; invalid JSON is reported and replaced
    /// by defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        match serde_json::from_str(&data) {
            Ok(cfg) => {
                info!("Loaded configuration from {}", path.display());
                Ok(cfg)
            }
            Err(e) => {
                warn!("Invalid JSON in {}: {e}", path.display());
                warn!("Using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Apply overrides from the environment map.
    pub fn apply_env(&mut self, env: &Env) -> Result<(), ConfigError> {
        if let Some(raw) = env.get(SOURCE_VAR) {
            self.source = raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: SOURCE_VAR.to_string(),
                message,
            })?;
        }
        if let Some(raw) = env.get(NUM_RESULTS_VAR) {
            self.num_results = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: NUM_RESULTS_VAR.to_string(),
                message: format!("{e}"),
            })?;
        }
        if let Some(url) = env.get(OPENAI_BASE_URL_VAR) {
            self.openai_base_url = url.to_string();
        }
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.num_results > 0, "num_results must be positive");
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be positive"
        );
        anyhow::ensure!(!self.model.trim().is_empty(), "model must not be empty");
        anyhow::ensure!(
            !self.openai_base_url.trim().is_empty(),
            "openai_base_url must not be empty"
        );
        Ok(())
    }

    /// Every environment key this configuration needs: the LLM credential
    /// followed by the selected source's keys.
    #[must_use]
    pub fn required_env_vars(&self) -> Vec<&'static str> {
        let mut keys = vec![llm::openai::API_KEY_VAR];
        keys.extend_from_slice(self.source.required_env_vars());
        keys
    }

    /// Check the environment for every required key at once.
    pub fn check_env(&self, env: &Env) -> Result<(), ConfigError> {
        let missing = env.missing(&self.required_env_vars());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingEnvVars(missing))
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
