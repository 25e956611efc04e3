//! Miner configuration
//!
//! Versioned YAML (`version: 1`) with `JITMINE_*` environment overrides.
//!
//! ```yaml
//! version: 1
//! workspace_dir: /var/lib/jitmine/repos
//! artifacts_dir: /var/lib/jitmine/artifacts
//! database_path: /var/lib/jitmine/jitmine.db
//! structural_metrics:
//!   program: java
//!   args: ["-jar", "/opt/ck.jar", "{repo}", "false", "0", "false", "{output}/"]
//! feature_selection:
//!   worker_threads: 4
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use crate::features::guru_metrics::calculator::DEFAULT_FIX_KEYWORDS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    pub binary: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StructuralMetricsConfig {
    pub program: String,
    /// `{repo}` and `{output}` are substituted per run
    pub args: Vec<String>,
    /// File the tool writes into `{output}`
    pub output_file: String,
    /// Scratch root for tool output; defaults to `<workspace_dir>/.metrics`
    pub scratch_dir: Option<PathBuf>,
}

impl Default for StructuralMetricsConfig {
    fn default() -> Self {
        Self {
            program: "java".to_string(),
            args: ["-jar", "ck.jar", "{repo}", "false", "0", "false", "{output}/"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_file: "class.csv".to_string(),
            scratch_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureSelectionPoolConfig {
    pub worker_threads: usize,
}

impl Default for FeatureSelectionPoolConfig {
    fn default() -> Self {
        Self {
            worker_threads: (num_cpus::get() * 3 / 4).max(1), // 75% of cores
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IssuesConfig {
    pub bug_labels: Vec<String>,
    /// Regex; capture group 1 (or the whole match) is the issue id
    pub key_pattern: String,
    /// Environment variable holding the GitHub token
    pub token_env: String,
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            bug_labels: vec!["bug".to_string()],
            key_pattern: r"#(\d+)".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuruConfig {
    pub fix_keywords: Vec<String>,
}

impl Default for GuruConfig {
    fn default() -> Self {
        Self {
            fix_keywords: DEFAULT_FIX_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinerConfig {
    pub version: u32,
    /// Parent directory of per-repository working copies
    pub workspace_dir: PathBuf,
    /// Root of the local artifact store
    pub artifacts_dir: PathBuf,
    /// SQLite database; absent means an in-memory store
    pub database_path: Option<PathBuf>,
    pub git: GitConfig,
    pub structural_metrics: StructuralMetricsConfig,
    pub feature_selection: FeatureSelectionPoolConfig,
    pub issues: IssuesConfig,
    pub guru: GuruConfig,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            workspace_dir: PathBuf::from("./jitmine/repos"),
            artifacts_dir: PathBuf::from("./jitmine/artifacts"),
            database_path: None,
            git: GitConfig::default(),
            structural_metrics: StructuralMetricsConfig::default(),
            feature_selection: FeatureSelectionPoolConfig::default(),
            issues: IssuesConfig::default(),
            guru: GuruConfig::default(),
        }
    }
}

impl MinerConfig {
    /// Load YAML, apply `JITMINE_*` overrides, validate
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&text)?;
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML text (no environment overrides)
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(text)?;
        let version = raw
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or(ConfigError::MissingVersion)? as u32;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }
        Ok(serde_yaml::from_value(raw)?)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply overrides from `lookup` (usually `std::env::var`)
    pub fn apply_env_with<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("JITMINE_WORKSPACE_DIR") {
            self.workspace_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("JITMINE_ARTIFACTS_DIR") {
            self.artifacts_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("JITMINE_DATABASE_PATH") {
            self.database_path = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = lookup("JITMINE_GIT_BINARY") {
            self.git.binary = v;
        }
        if let Some(v) = lookup("JITMINE_WORKER_THREADS") {
            self.feature_selection.worker_threads =
                v.parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidEnv {
                    var: "JITMINE_WORKER_THREADS".to_string(),
                    value: v.clone(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.feature_selection.worker_threads == 0 {
            return Err(ConfigError::Validation(
                "feature_selection.worker_threads must be at least 1".to_string(),
            ));
        }
        if self.guru.fix_keywords.is_empty() {
            return Err(ConfigError::Validation(
                "guru.fix_keywords must not be empty".to_string(),
            ));
        }
        regex::Regex::new(&self.issues.key_pattern).map_err(|e| {
            ConfigError::Validation(format!("issues.key_pattern is not a valid regex: {}", e))
        })?;
        if self.structural_metrics.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "structural_metrics.program must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Working copy location for a repository id
    pub fn repo_dir(&self, repo_id: &str) -> PathBuf {
        self.workspace_dir.join(repo_id)
    }

    pub fn metrics_scratch_dir(&self) -> PathBuf {
        self.structural_metrics
            .scratch_dir
            .clone()
            .unwrap_or_else(|| self.workspace_dir.join(".metrics"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_is_valid() {
        let config = MinerConfig::default();
        config.validate().unwrap();
        assert!(config.feature_selection.worker_threads >= 1);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = MinerConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert_eq!(MinerConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_yaml_loading_partial_file() {
        let yaml_content = r#"
version: 1
workspace_dir: /data/repos
structural_metrics:
  program: ck
  args: ["{repo}", "{output}"]
issues:
  key_pattern: '([A-Z]+-\d+)'
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = MinerConfig::from_yaml(temp_file.path()).unwrap();
        assert_eq!(config.structural_metrics.program, "ck");
        assert_eq!(config.structural_metrics.output_file, "class.csv");
        assert_eq!(config.issues.bug_labels, vec!["bug"]);
        assert_eq!(config.repo_dir("lang"), PathBuf::from("/data/repos/lang"));
    }

    #[test]
    fn test_yaml_missing_version() {
        let result = MinerConfig::from_yaml_str("workspace_dir: /tmp\n");
        assert!(matches!(result, Err(ConfigError::MissingVersion)));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let result = MinerConfig::from_yaml_str("version: 7\n");
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedVersion { found: 7, .. })
        ));
    }

    #[test]
    fn test_yaml_unknown_field() {
        let result = MinerConfig::from_yaml_str("version: 1\nworkspace: /tmp\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("JITMINE_WORKSPACE_DIR", "/env/repos"),
            ("JITMINE_WORKER_THREADS", "3"),
            ("JITMINE_DATABASE_PATH", "/env/db.sqlite"),
        ]
        .into_iter()
        .collect();

        let mut config = MinerConfig::default();
        config
            .apply_env_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.workspace_dir, PathBuf::from("/env/repos"));
        assert_eq!(config.feature_selection.worker_threads, 3);
        assert_eq!(config.database_path, Some(PathBuf::from("/env/db.sqlite")));
    }

    #[test]
    fn test_env_invalid_thread_count() {
        let mut config = MinerConfig::default();
        let result = config.apply_env_with(|k| {
            (k == "JITMINE_WORKER_THREADS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_regex() {
        let mut config = MinerConfig::default();
        config.issues.key_pattern = "(".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
