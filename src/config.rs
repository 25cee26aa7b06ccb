use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::{comfort::ComfortClassifier, db::Database};

pub const DATABASE_PATH_VAR: &str = "ROOMWATCH_DATABASE_PATH";
pub const MODEL_PATH_VAR: &str = "ROOMWATCH_MODEL_PATH";

const DEFAULT_DATABASE_PATH: &str = "roomwatch.sqlite3";
const DEFAULT_MODEL_PATH: &str = "models/comfort_rf.json";
const IN_MEMORY: &str = ":memory:";

/// Process configuration, read from the environment (and `.env`, if present).
/// Listen address and port are Rocket's own `ROCKET_*` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub model_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.into(),
            model_path: DEFAULT_MODEL_PATH.into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let database_path = non_empty(lookup(DATABASE_PATH_VAR), DATABASE_PATH_VAR)?
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);
        let model_path = non_empty(lookup(MODEL_PATH_VAR), MODEL_PATH_VAR)?
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        Ok(Self {
            database_path,
            model_path,
        })
    }

    pub fn open_database(&self) -> Result<Database> {
        if self.database_path.as_os_str() == IN_MEMORY {
            Database::in_memory()
        } else {
            Database::new(self.database_path.clone())
        }
    }

    pub fn load_classifier(&self) -> Result<ComfortClassifier> {
        ComfortClassifier::load(&self.model_path).with_context(|| {
            format!(
                "failed to load comfort model from {}",
                self.model_path.display()
            )
        })
    }
}

fn non_empty(value: Option<String>, key: &str) -> Result<Option<String>> {
    match value {
        Some(raw) if raw.trim().is_empty() => anyhow::bail!("{key} is set but empty"),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(Config::from_lookup(lookup(&[])).unwrap(), Config::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            (DATABASE_PATH_VAR, ":memory:"),
            (MODEL_PATH_VAR, "/srv/models/rf.json"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from(":memory:"));
        assert_eq!(config.model_path, PathBuf::from("/srv/models/rf.json"));
        assert!(config.open_database().unwrap().path().is_none());
    }

    #[test]
    fn empty_value_is_an_error() {
        assert!(Config::from_lookup(lookup(&[(MODEL_PATH_VAR, "  ")])).is_err());
    }
}
