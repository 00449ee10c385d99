use std::{collections::HashMap, env};

use anyhow::{Context, Result};
use tx_python::{PythonVersion, PYTHON_ENV};

pub const PYTHON_VERSION_ENV: &str = "TX_PYTHON_VERSION";
pub const LOG_ENV: &str = "TX_LOG";

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Settings taken from the environment; command-line flags win over these.
#[derive(Debug, Default)]
pub struct Config {
    /// Interpreter inspected for the marker environment.
    pub python: Option<String>,
    /// Target version used when `--python` is absent.
    pub python_version: Option<PythonVersion>,
    /// `tracing` filter directives replacing the verbosity default.
    pub log_filter: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let python_version = snapshot
            .var(PYTHON_VERSION_ENV)
            .map(|raw| {
                raw.parse::<PythonVersion>()
                    .with_context(|| format!("invalid {PYTHON_VERSION_ENV} value `{raw}`"))
            })
            .transpose()?;
        Ok(Self {
            python: snapshot.var(PYTHON_ENV).map(str::to_string),
            python_version,
            log_filter: snapshot.var(LOG_ENV).map(str::to_string),
        })
    }

    /// The flag value, else the configured default.
    pub fn target_version(&self, flag: Option<PythonVersion>) -> Option<PythonVersion> {
        flag.or(self.python_version)
    }
}
