//! Configuration schema (snowdump.toml)
//!
//! ```toml
//! [dump]
//! max_concurrency = 8
//! failure_policy = "fail_fast"
//!
//! [targets.production]
//! account = "xy12345.eu-west-1"
//! user = "DUMPER"
//! password = "..."
//! role = "SYSADMIN"
//! warehouse = "COMPUTE_WH"
//! database = "ANALYTICS"
//! schema = "PUBLIC"
//! separate_ddl_folder = true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::DumpError;

/// Sub-folder holding DDL files when a target asks for a separate folder
pub const DDL_FOLDER: &str = "ddl";

/// Default bound on concurrently running database/schema tasks
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// What to do when one object, schema or database fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole run on the first error
    #[default]
    FailFast,

    /// Record the failure and let sibling work finish
    BestEffort,
}

/// Run-wide dump settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpSettings {
    /// Upper bound on concurrently running database/schema tasks
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for DumpSettings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Connection settings for one warehouse account. Every field is required.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,

    /// Put DDL files under `<target>/ddl` instead of `<target>`
    pub separate_ddl_folder: bool,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"***")
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("separate_ddl_folder", &self.separate_ddl_folder)
            .finish()
    }
}

impl TargetConfig {
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("account", &self.account),
            ("user", &self.user),
            ("password", &self.password),
            ("role", &self.role),
            ("warehouse", &self.warehouse),
            ("database", &self.database),
            ("schema", &self.schema),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect()
    }
}

/// A named target, ready to be dumped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub settings: TargetConfig,
}

impl Target {
    pub fn new(name: impl Into<String>, settings: TargetConfig) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    /// Folder of this target's DDL files, relative to the output root
    pub fn ddl_folder(&self) -> String {
        if self.settings.separate_ddl_folder {
            format!("{}/{}", self.name, DDL_FOLDER)
        } else {
            self.name.clone()
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dump: DumpSettings,

    /// Targets keyed by name; the name becomes the top output folder
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,

    /// Directory containing the config file
    #[serde(skip)]
    pub project_root: std::path::PathBuf,
}

impl Config {
    /// Load and validate config from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load and validate config from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked before connecting anywhere
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("no targets configured".to_string()));
        }

        if self.dump.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "dump.max_concurrency must be at least 1".to_string(),
            ));
        }

        let mut folders: HashMap<String, &str> = HashMap::new();
        for (name, target) in &self.targets {
            if name.contains(['/', '\\']) || name.trim().is_empty() || name == "." || name == ".." {
                return Err(ConfigError::Invalid(format!(
                    "target name [{}] cannot be used as a folder name",
                    name
                )));
            }

            let missing = target.missing_fields();
            if !missing.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "[{}] not set in target [{}]",
                    missing.join(", "),
                    name
                )));
            }

            // Output folders are lower-cased, so `Prod` and `prod` would collide
            if let Some(other) = folders.insert(name.to_lowercase(), name) {
                return Err(ConfigError::Invalid(format!(
                    "targets [{}] and [{}] map to the same output folder",
                    other, name
                )));
            }
        }

        Ok(())
    }

    /// Targets in name order, optionally restricted to `only`
    pub fn selected_targets(&self, only: &[String]) -> Result<Vec<Target>, ConfigError> {
        if let Some(unknown) = only.iter().find(|name| !self.targets.contains_key(*name)) {
            return Err(ConfigError::Invalid(format!("unknown target [{}]", unknown)));
        }

        Ok(self
            .targets
            .iter()
            .filter(|(name, _)| only.is_empty() || only.contains(name))
            .map(|(name, settings)| Target::new(name.clone(), settings.clone()))
            .collect())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for DumpError {
    fn from(err: ConfigError) -> Self {
        DumpError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VALID: &str = r#"
        [dump]
        max_concurrency = 4
        failure_policy = "best_effort"

        [targets.prod]
        account = "xy12345"
        user = "DUMPER"
        password = "secret"
        role = "SYSADMIN"
        warehouse = "COMPUTE_WH"
        database = "ANALYTICS"
        schema = "PUBLIC"
        separate_ddl_folder = true

        [targets.dev]
        account = "xy12345"
        user = "DUMPER"
        password = "secret"
        role = "SYSADMIN"
        warehouse = "COMPUTE_WH"
        database = "ANALYTICS"
        schema = "PUBLIC"
        separate_ddl_folder = false
    "#;

    #[test]
    fn parses_targets_and_settings() {
        let config = Config::from_toml(VALID).unwrap();
        assert_eq!(config.dump.max_concurrency, 4);
        assert_eq!(config.dump.failure_policy, FailurePolicy::BestEffort);

        let names: Vec<_> = config.targets.keys().cloned().collect();
        assert_eq!(names, vec!["dev".to_string(), "prod".to_string()]);
    }

    #[test]
    fn dump_settings_default() {
        let toml = VALID.replace("max_concurrency = 4", "").replace("failure_policy = \"best_effort\"", "");
        let config = Config::from_toml(&toml).unwrap();
        assert_eq!(config.dump, DumpSettings::default());
        assert_eq!(config.dump.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn missing_field_is_rejected() {
        let toml = VALID.replacen("role = \"SYSADMIN\"", "", 1);
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains("role"));
    }

    #[test]
    fn missing_ddl_folder_flag_is_rejected() {
        let toml = VALID.replacen("separate_ddl_folder = true", "", 1);
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn empty_field_is_rejected() {
        let toml = VALID.replacen("warehouse = \"COMPUTE_WH\"", "warehouse = \"\"", 1);
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("[warehouse] not set in target [prod]"), "{err}");
    }

    #[test]
    fn no_targets_is_rejected() {
        let err = Config::from_toml("[dump]\nmax_concurrency = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let toml = VALID.replace("max_concurrency = 4", "max_concurrency = 0");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn case_colliding_targets_are_rejected() {
        let toml = VALID.replace("[targets.dev]", "[targets.PROD]");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("same output folder"));
    }

    #[test]
    fn ddl_folder_follows_target_setting() {
        let config = Config::from_toml(VALID).unwrap();
        let targets = config.selected_targets(&[]).unwrap();
        let folders: Vec<_> = targets.iter().map(Target::ddl_folder).collect();
        assert_eq!(folders, vec!["dev".to_string(), "prod/ddl".to_string()]);
    }

    #[test]
    fn selected_targets_filters_and_rejects_unknown() {
        let config = Config::from_toml(VALID).unwrap();
        let only = config.selected_targets(&["prod".to_string()]).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].name, "prod");

        assert!(config.selected_targets(&["qa".to_string()]).is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let config = Config::from_toml(VALID).unwrap();
        let debug = format!("{:?}", config.targets["prod"]);
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn from_file_sets_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snowdump.toml");
        std::fs::write(&path, VALID).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.project_root, dir.path());
    }

    #[test]
    fn config_error_becomes_dump_error() {
        let err: DumpError = ConfigError::Invalid("x".to_string()).into();
        assert!(matches!(err, DumpError::Config(_)));
    }
}
