//! Scorer Configuration
//!
//! Settings for the similarity scorer, loadable from TOML. Every field
//! has a default, so a config file only needs to list what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eval::cost::{default_table, SubstitutionTable};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// One relabel-cost override, `from` and `to` being node labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Command whose tree stands in for unparseable predictions
    pub fallback_command: String,
    /// Weight of a matching utility (u1)
    pub utility_weight: f64,
    /// Weight of the flag score (u2)
    pub flag_weight: f64,
    /// Extra entries for the relabel-cost table, applied in order
    pub substitutions: Vec<Substitution>,
    /// Compare argument types instead of argument values by default
    pub ignore_arg_value: bool,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            fallback_command: "find".to_string(),
            utility_weight: 1.0,
            flag_weight: 1.0,
            substitutions: Vec::new(),
            ignore_arg_value: false,
        }
    }
}

impl ScoreConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback_command.trim().is_empty() {
            return Err(ConfigError::Invalid("fallback_command is empty".to_string()));
        }
        let weights = [self.utility_weight, self.flag_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        if self.utility_weight + self.flag_weight <= 0.0 {
            return Err(ConfigError::Invalid(
                "utility_weight + flag_weight must be positive".to_string(),
            ));
        }
        if let Some(s) = self.substitutions.iter().find(|s| !s.cost.is_finite() || s.cost < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "substitution {} -> {} needs a finite, non-negative cost",
                s.from, s.to
            )));
        }
        Ok(())
    }

    /// The default relabel table with this config's overrides applied
    pub fn substitution_table(&self) -> SubstitutionTable {
        let mut table = default_table();
        for s in &self.substitutions {
            table.insert(&s.from, &s.to, s.cost);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScoreConfig::default();
        assert_eq!(config.fallback_command, "find");
        assert_eq!(config.utility_weight, 1.0);
        assert_eq!(config.flag_weight, 1.0);
        assert!(!config.ignore_arg_value);
    }

    #[test]
    fn test_partial_toml() {
        let config = ScoreConfig::from_toml_str("flag_weight = 3.0\n").unwrap();
        assert_eq!(config.flag_weight, 3.0);
        assert_eq!(config.fallback_command, "find");
    }

    #[test]
    fn test_substitutions_extend_table() {
        let input = r#"
            [[substitutions]]
            from = "UTILITY_egrep"
            to = "UTILITY_grep"
            cost = 0.0

            [[substitutions]]
            from = "FLAG_-print"
            to = "FLAG_-print0"
            cost = 0.5
        "#;
        let config = ScoreConfig::from_toml_str(input).unwrap();
        let table = config.substitution_table();
        assert_eq!(table.get("UTILITY_egrep", "UTILITY_grep"), Some(0.0));
        assert_eq!(table.get("FLAG_-print", "FLAG_-print0"), Some(0.5));
        assert_eq!(table.get("FLAG_-print0", "FLAG_-print"), Some(0.0));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ScoreConfig::from_toml_str("utility_weight = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ScoreConfig::from_toml_str("utility_weight = 0.0\nflag_weight = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ScoreConfig::from_toml_str("fallback_command = \"  \""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        for input in [
            "utility_weight = nan",
            "flag_weight = inf",
            "[[substitutions]]\nfrom = \"a\"\nto = \"b\"\ncost = nan",
        ] {
            assert!(
                matches!(ScoreConfig::from_toml_str(input), Err(ConfigError::Invalid(_))),
                "accepted {}",
                input
            );
        }
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            ScoreConfig::from_toml_str("flag_weight = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ScoreConfig::load("/nonexistent/cmdtree-eval.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
