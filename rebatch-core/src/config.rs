use crate::batch::{BatchOptions, SortKey};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory (relative to the working directory) holding a project config
pub const PROJECT_CONFIG_DIR: &str = ".rebatch";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Persistent defaults. Command-line flags can only switch these on (or add
/// to `exclude`); a sort key given on the command line replaces this one.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub fix_conflicts: bool,

    #[serde(default)]
    pub include_hidden: bool,

    #[serde(default)]
    pub include_dir: bool,

    #[serde(default)]
    pub ignore_case: bool,

    #[serde(default)]
    pub ignore_ext: bool,

    #[serde(default)]
    pub string_mode: bool,

    /// Default sort key: "size", "mtime", "atime", "btime" or "ctime"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortKey>,

    #[serde(default)]
    pub reverse_sort: bool,

    /// Exclusion patterns always applied
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Whether to use color output by default (None = auto-detect)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_color: Option<bool>,
}

impl Config {
    /// Load `.rebatch/config.toml` from the working directory, else
    /// `<user_config_dir>/rebatch/config.toml`, else the built-in defaults
    pub fn load(user_config_dir: Option<&Path>) -> Result<Self> {
        match Self::locate(user_config_dir) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    fn locate(user_config_dir: Option<&Path>) -> Option<PathBuf> {
        let project = std::env::current_dir()
            .ok()
            .map(|cwd| cwd.join(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME));
        let user = user_config_dir.map(|dir| dir.join("rebatch").join(CONFIG_FILE_NAME));

        [project, user].into_iter().flatten().find(|path| path.exists())
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Save config to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Fold the defaults into options already filled from the command line
    pub fn apply_to(&self, options: &mut BatchOptions) {
        let defaults = &self.defaults;
        options.fix_conflicts |= defaults.fix_conflicts;
        options.include_hidden |= defaults.include_hidden;
        options.include_dir |= defaults.include_dir;
        options.ignore_case |= defaults.ignore_case;
        options.ignore_ext |= defaults.ignore_ext;
        options.string_mode |= defaults.string_mode;

        if options.sort.is_none() {
            options.sort = defaults.sort;
            options.reverse_sort |= defaults.reverse_sort;
        }

        let mut exclude = defaults.exclude.clone();
        exclude.append(&mut options.exclude);
        options.exclude = exclude;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.defaults.fix_conflicts);
        assert!(!config.defaults.include_hidden);
        assert!(config.defaults.exclude.is_empty());
        assert_eq!(config.defaults.sort, None);
        assert_eq!(config.defaults.use_color, None);
    }

    #[test]
    fn test_load_save_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.defaults.ignore_case = true;
        config.defaults.sort = Some(SortKey::Size);
        config.defaults.exclude = vec!["^target$".to_string()];
        config.defaults.use_color = Some(false);

        config.save_to_path(&config_path).unwrap();

        let loaded = Config::load_from_path(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config() {
        let toml_content = r#"
[defaults]
include_dir = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.defaults.include_dir);
        // Other fields should have their defaults
        assert!(!config.defaults.string_mode);
        assert!(config.defaults.exclude.is_empty());
    }

    #[test]
    fn test_user_config_dir_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let user_dir = temp_dir.path();
        let path = user_dir.join("rebatch").join(CONFIG_FILE_NAME);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[defaults]\nfix_conflicts = true\n").unwrap();

        // The test crate's working directory has no project config
        let config = Config::load(Some(user_dir)).unwrap();
        assert!(config.defaults.fix_conflicts);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[defaults]\nfix_conflicts = \"yes\"\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn test_unknown_sort_key_rejected_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[defaults]\nsort = \"name\"\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid sort"));
    }

    #[test]
    fn test_apply_to_merges_with_flags() {
        let config: Config = toml::from_str(
            r#"
[defaults]
ignore_case = true
sort = "mtime"
reverse_sort = true
exclude = ["^\\.git$"]
"#,
        )
        .unwrap();

        let mut options = BatchOptions {
            exclude: vec!["tmp".to_string()],
            ..BatchOptions::default()
        };
        config.apply_to(&mut options);
        assert!(options.ignore_case);
        assert_eq!(options.sort, Some(SortKey::Modified));
        assert!(options.reverse_sort);
        assert_eq!(options.exclude, vec!["^\\.git$".to_string(), "tmp".to_string()]);

        let mut explicit = BatchOptions {
            sort: Some(SortKey::Size),
            ..BatchOptions::default()
        };
        config.apply_to(&mut explicit);
        assert_eq!(explicit.sort, Some(SortKey::Size));
        assert!(!explicit.reverse_sort);
    }
}
