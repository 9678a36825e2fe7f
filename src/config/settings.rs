use crate::core::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::error::{BlockchainError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static DEFAULT_DATA_DIR: &str = "./tmp/blocks";

const CONFIG_FILE_KEY: &str = "LEDGER_CONFIG";
const DATA_DIR_KEY: &str = "LEDGER_DATA_DIR";
const DIFFICULTY_KEY: &str = "LEDGER_DIFFICULTY";
const MINING_TIMEOUT_KEY: &str = "LEDGER_MINING_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub difficulty: u32,
    /// Give up sealing a block after this many seconds
    pub mining_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            difficulty: DEFAULT_DIFFICULTY,
            mining_timeout_secs: None,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file named by `LEDGER_CONFIG` if set, then
    /// `LEDGER_*` environment overrides.
    pub fn load() -> Result<Config> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Same as [`Config::load`] with variables read through `lookup`
    pub fn load_with<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_KEY) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Config::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Config> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_KEY) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup(DIFFICULTY_KEY) {
            self.difficulty = value.trim().parse::<u32>().map_err(|e| {
                BlockchainError::Config(format!("{DIFFICULTY_KEY}={value} is not a number: {e}"))
            })?;
        }
        if let Some(value) = lookup(MINING_TIMEOUT_KEY) {
            let secs = value.trim().parse::<u64>().map_err(|e| {
                BlockchainError::Config(format!(
                    "{MINING_TIMEOUT_KEY}={value} is not a number: {e}"
                ))
            })?;
            self.mining_timeout_secs = Some(secs);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(BlockchainError::Config(format!(
                "difficulty must be within {MIN_DIFFICULTY}..={MAX_DIFFICULTY}, got {}",
                self.difficulty
            )));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(BlockchainError::Config(
                "data_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mining_timeout(&self) -> Option<Duration> {
        self.mining_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::load_with(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(config.mining_timeout(), None);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::load_with(lookup_from(&[
            (DATA_DIR_KEY, "/var/lib/ledger"),
            (DIFFICULTY_KEY, "8"),
            (MINING_TIMEOUT_KEY, "30"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/ledger"));
        assert_eq!(config.difficulty, 8);
        assert_eq!(config.mining_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = Config::load_with(lookup_from(&[(DIFFICULTY_KEY, "0")]));
        assert!(matches!(result, Err(BlockchainError::Config(_))));

        let result = Config::load_with(lookup_from(&[(MINING_TIMEOUT_KEY, "soon")]));
        assert!(matches!(result, Err(BlockchainError::Config(_))));
    }

    #[test]
    fn test_toml_file_with_partial_fields() {
        let config = Config::from_toml_str("difficulty = 6\n").unwrap();
        assert_eq!(config.difficulty, 6);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));

        assert!(Config::from_toml_str("difficulty = \"hard\"").is_err());
    }

    #[test]
    fn test_toml_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        fs::write(&path, "data_dir = \"/srv/chain\"\ndifficulty = 10\n").unwrap();

        let path_str = path.to_string_lossy().to_string();
        let config = Config::load_with(lookup_from(&[
            (CONFIG_FILE_KEY, path_str.as_str()),
            (DIFFICULTY_KEY, "5"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/chain"));
        assert_eq!(config.difficulty, 5);
    }
}
