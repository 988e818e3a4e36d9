use serde::{Deserialize, Serialize};

/// Behaviour switches for a project attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Whether `get_by_pid` accepts full class names (`Chain:A`) as tags.
    pub accept_long_pids: bool,
    /// Whether rename events are watched. When off, pids of renamed objects
    /// go stale until the next attach.
    pub track_renames: bool,
    /// Run [`Project::verify`](crate::Project::verify) right after the
    /// initial tree walk and log any violations.
    pub verify_on_attach: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            accept_long_pids: true,
            track_renames: true,
            verify_on_attach: false,
        }
    }
}

impl ProjectConfig {
    /// Strict settings: short tags only, verified on attach.
    pub fn strict() -> Self {
        Self {
            accept_long_pids: false,
            verify_on_attach: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProjectConfig::default();
        assert!(config.accept_long_pids);
        assert!(config.track_renames);
        assert!(!config.verify_on_attach);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ProjectConfig = toml::from_str("track_renames = false").unwrap();
        assert!(!config.track_renames);
        assert!(config.accept_long_pids);
    }

    #[test]
    fn strict_overrides() {
        let config = ProjectConfig::strict();
        assert!(!config.accept_long_pids);
        assert!(config.verify_on_attach);
        assert!(config.track_renames);
    }
}
