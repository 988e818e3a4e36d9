use std::path::Path;

use anyhow::Context;
use nmrid_core::ProjectConfig;
use serde::{Deserialize, Serialize};

/// Settings read from `--config`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Name given to the store's project record.
    pub store_name: String,
    pub project: ProjectConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_name: "default".into(),
            project: ProjectConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load from `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_path_gives_defaults() {
        assert_eq!(CliConfig::load(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn loads_nested_project_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "store_name = \"lysozyme\"\n\n[project]\naccept_long_pids = false"
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.store_name, "lysozyme");
        assert!(!config.project.accept_long_pids);
        assert!(config.project.track_renames);
    }

    #[test]
    fn bad_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "store_name = ").unwrap();
        let err = CliConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(CliConfig::load(Some(&missing)).is_err());
    }
}
