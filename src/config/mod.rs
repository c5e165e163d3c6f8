//! `statuskit.toml` discovery and loading.
//!
//! ```toml
//! modules = ["model", "git", "usage_limits"]
//!
//! [git]
//! show_last_commit = false
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILENAME: &str = "statuskit.toml";
pub const LOCAL_CONFIG_FILENAME: &str = "statuskit.local.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// The file that failed to load.
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub debug: bool,
    pub colors: bool,
    /// Modules to render, in order.
    pub modules: Vec<String>,
    /// Overrides the platform cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Option tables keyed by module name, e.g. `[git]`.
    pub module_configs: HashMap<String, toml::Table>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            colors: true,
            modules: vec!["model".into(), "git".into(), "usage_limits".into()],
            cache_dir: None,
            module_configs: HashMap::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawConfig {
    debug: Option<bool>,
    colors: Option<bool>,
    modules: Option<Vec<String>>,
    cache_dir: Option<PathBuf>,
    #[serde(flatten)]
    rest: toml::Table,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let raw: RawConfig = toml::from_str(content)?;
        let defaults = Self::default();
        let module_configs = raw
            .rest
            .into_iter()
            .filter_map(|(name, value)| match value {
                toml::Value::Table(table) => Some((name, table)),
                _ => None,
            })
            .collect();
        Ok(Self {
            debug: raw.debug.unwrap_or(defaults.debug),
            colors: raw.colors.unwrap_or(defaults.colors),
            modules: raw.modules.unwrap_or(defaults.modules),
            cache_dir: raw.cache_dir,
            module_configs,
        })
    }

    /// Configured cache directory, else `<platform cache dir>/statuskit`.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("statuskit")))
    }
}

/// Candidate config files, highest priority first: local, project, user.
pub fn config_paths(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![
        cwd.join(".claude").join(LOCAL_CONFIG_FILENAME),
        cwd.join(".claude").join(CONFIG_FILENAME),
    ];
    if let Some(home) = home {
        paths.push(home.join(".claude").join(CONFIG_FILENAME));
    }
    paths
}

/// Load the first existing file in `paths`. Files are not merged.
pub fn load_config(paths: &[PathBuf]) -> Result<Config, ConfigError> {
    let Some(path) = paths.iter().find(|p| p.exists()) else {
        debug!("No config file found, using defaults");
        return Ok(Config::default());
    };
    debug!("Loading config from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    Config::from_toml(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(".claude").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.debug);
        assert!(config.colors);
        assert_eq!(config.modules, ["model", "git", "usage_limits"]);
        assert!(config.module_configs.is_empty());
    }

    #[test]
    fn test_from_toml_splits_module_tables() {
        let config = Config::from_toml(
            r#"
            debug = true
            modules = ["git"]
            extra = 1

            [git]
            show_last_commit = false

            [usage_limits]
            multiline = false
            "#,
        )
        .unwrap();
        assert!(config.debug);
        assert!(config.colors);
        assert_eq!(config.modules, ["git"]);
        assert_eq!(config.module_configs.len(), 2);
        assert_eq!(
            config.module_configs["git"].get("show_last_commit"),
            Some(&toml::Value::Boolean(false))
        );
        assert!(!config.module_configs.contains_key("extra"));
    }

    #[test]
    fn test_config_paths_order() {
        let paths = config_paths(Path::new("/work"), Some(Path::new("/home/u")));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/work/.claude/statuskit.local.toml"),
                PathBuf::from("/work/.claude/statuskit.toml"),
                PathBuf::from("/home/u/.claude/statuskit.toml"),
            ]
        );
        assert_eq!(config_paths(Path::new("/work"), None).len(), 2);
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = tempdir().unwrap();
        let config = load_config(&config_paths(dir.path(), None)).unwrap();
        assert_eq!(config.modules, Config::default().modules);
    }

    #[test]
    fn test_local_beats_project_beats_user() {
        let project = tempdir().unwrap();
        let home = tempdir().unwrap();
        write(home.path(), CONFIG_FILENAME, "modules = [\"user\"]");
        let paths = config_paths(project.path(), Some(home.path()));
        assert_eq!(load_config(&paths).unwrap().modules, ["user"]);

        write(project.path(), CONFIG_FILENAME, "modules = [\"project\"]");
        assert_eq!(load_config(&paths).unwrap().modules, ["project"]);

        write(project.path(), LOCAL_CONFIG_FILENAME, "modules = [\"local\"]");
        assert_eq!(load_config(&paths).unwrap().modules, ["local"]);
    }

    #[test]
    fn test_no_merging_between_scopes() {
        let project = tempdir().unwrap();
        let home = tempdir().unwrap();
        write(home.path(), CONFIG_FILENAME, "debug = true");
        write(project.path(), CONFIG_FILENAME, "colors = false");
        let config = load_config(&config_paths(project.path(), Some(home.path()))).unwrap();
        assert!(!config.colors);
        assert!(!config.debug);
    }

    #[test]
    fn test_parse_error_carries_path() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), CONFIG_FILENAME, "modules = [");
        let err = load_config(&config_paths(dir.path(), None)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path);
    }

    #[test]
    fn test_cache_dir_override() {
        let config = Config::from_toml("cache_dir = \"/tmp/sk\"").unwrap();
        assert_eq!(config.cache_dir(), Some(PathBuf::from("/tmp/sk")));
    }
}
