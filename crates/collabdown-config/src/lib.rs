use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read initial text at {path}: {source}")]
    InitialTextReadError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where remote cursors go when text is inserted exactly at their position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorBiasSetting {
    #[default]
    Stay,
    Advance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Markdown file used to seed a room nobody has edited yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_text: Option<PathBuf>,
    pub cursor_bias: CursorBiasSetting,
    pub max_apply_failures: u32,
    pub preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_text: None,
            cursor_bias: CursorBiasSetting::Stay,
            max_apply_failures: 3,
            preview: true,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.initial_text = config
            .initial_text
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/collabdown");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Contents of the configured seed document, if one is set
    pub fn read_initial_text(&self) -> Result<Option<String>, ConfigError> {
        let Some(path) = &self.initial_text else {
            return Ok(None);
        };
        std::fs::read_to_string(path)
            .map(Some)
            .map_err(|source| ConfigError::InitialTextReadError {
                path: path.clone(),
                source,
            })
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/collabdown/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.max_apply_failures, 3);
        assert!(config.preview);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
cursor_bias = "advance"
preview = false
"#,
        )
        .unwrap();

        assert_eq!(config.cursor_bias, CursorBiasSetting::Advance);
        assert!(!config.preview);
        assert_eq!(config.max_apply_failures, 3);
        assert_eq!(config.initial_text, None);
    }

    #[test]
    fn test_unknown_cursor_bias_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "cursor_bias = \"sideways\"\n").unwrap();

        let result = Config::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_initial_text_with_env_var() {
        unsafe {
            env::set_var("COLLABDOWN_TEST_DOCS", "/custom/docs");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "initial_text = \"$COLLABDOWN_TEST_DOCS/laws.md\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            config.initial_text,
            Some(PathBuf::from("/custom/docs/laws.md"))
        );

        unsafe {
            env::remove_var("COLLABDOWN_TEST_DOCS");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            initial_text: Some(PathBuf::from("/tmp/seed.md")),
            cursor_bias: CursorBiasSetting::Advance,
            max_apply_failures: 5,
            preview: false,
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_read_initial_text() {
        let temp_dir = TempDir::new().unwrap();
        let seed = temp_dir.path().join("seed.md");
        std::fs::write(&seed, "# Seed\n").unwrap();

        let config = Config {
            initial_text: Some(seed),
            ..Config::default()
        };

        assert_eq!(
            config.read_initial_text().unwrap(),
            Some("# Seed\n".to_string())
        );
        assert_eq!(Config::default().read_initial_text().unwrap(), None);
    }

    #[test]
    fn test_missing_initial_text_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            initial_text: Some(temp_dir.path().join("missing.md")),
            ..Config::default()
        };

        assert!(matches!(
            config.read_initial_text(),
            Err(ConfigError::InitialTextReadError { .. })
        ));
    }
}
