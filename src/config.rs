use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{BackendKind, DoerError};

/// Concrete API model names behind each backend kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ModelNames {
    pub general: String,
    pub code: String,
    pub chat: String,
}

impl Default for ModelNames {
    fn default() -> Self {
        Self {
            general: "gpt-3.5-turbo-instruct".to_string(),
            code: "code-davinci-002".to_string(),
            chat: "gpt-3.5-turbo".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: BackendKind,
    pub debug: bool,
    pub yes: bool,
    pub cache: bool,
    /// Mention the working directory in the prompt.
    pub pwd: bool,
    pub api_base: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub models: ModelNames,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: BackendKind::General,
            debug: false,
            yes: false,
            cache: true,
            pwd: false,
            api_base: "https://api.openai.com/v1".to_string(),
            max_tokens: 256,
            timeout_secs: 60,
            models: ModelNames::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("heydo").join("config.yaml"))
    }

    /// Reads the YAML config at `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, DoerError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text).map_err(|err| {
                DoerError::Configuration(format!("Invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(DoerError::Configuration(format!(
                "Could not read config file {}: {err}",
                path.display()
            ))),
        }
    }

    fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // an empty document deserializes to null
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::{BackendKind, DoerError};

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.cache);
        assert_eq!(config.max_tokens, 256);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_yaml(
            "model: chat\nyes: true\nmodels:\n  chat: gpt-4o-mini\n",
        )
        .unwrap();
        assert_eq!(config.model, BackendKind::Chat);
        assert!(config.yes);
        assert_eq!(config.models.chat, "gpt-4o-mini");
        assert_eq!(config.models.general, "gpt-3.5-turbo-instruct");
        assert_eq!(config.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_yaml("\n").unwrap(), Config::default());
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "model: [general").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, DoerError::Configuration(_)));
        assert!(err.to_string().contains("config.yaml"));
    }
}
