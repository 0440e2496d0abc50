//! Configuration file loader with multi-source merging

use super::file_config::{ConfigValidationError, FileConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "calendar-agent";
const PROJECT_FILE: &str = "calendar-agent.toml";
const ENV_PREFIX: &str = "CALAGENT_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigValidationError),
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Environment: `CALAGENT_SECTION__KEY` (e.g. `CALAGENT_AGENT__MAX_ITERATIONS`)
    /// 2. Explicit config path (if provided)
    /// 3. Project: `./calendar-agent.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/calendar-agent/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        let global = Self::global_config_path().filter(|p| p.exists());
        let project = Self::project_config_path();
        let figment = Self::figment(global.as_deref(), project.as_deref(), config_path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    fn figment(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));
        for path in [global, project, explicit].into_iter().flatten() {
            figment = figment.merge(Toml::file(path));
        }
        figment
    }

    fn extract(figment: Figment) -> Result<FileConfig, ConfigError> {
        let config: FileConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the global config file path
    ///
    /// Returns `$XDG_CONFIG_HOME/calendar-agent/config.toml` if set,
    /// otherwise the platform config directory.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        let path = PathBuf::from(PROJECT_FILE);
        path.exists().then_some(path)
    }

    /// Describe the config file locations being used
    pub fn config_sources(explicit: Option<&Path>) -> Vec<String> {
        let mut lines = vec!["Configuration sources (in priority order):".to_string()];

        lines.push(format!("  [ENV  ] Environment: {}SECTION__KEY", ENV_PREFIX));

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "     " };
            lines.push(format!("  [{}] Explicit: {}", mark, path.display()));
        }

        match Self::project_config_path() {
            Some(path) => lines.push(format!("  [FOUND] Project: {}", path.display())),
            None => lines.push(format!("  [     ] Project: ./{}", PROJECT_FILE)),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            lines.push(format!("  [{}] Global:  {}", mark, path.display()));
        }

        lines.push("  [     ] Default: built-in defaults".to_string());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalendarBackendKind;
    use std::io::Write;

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.agent.max_iterations, 8);
        assert!(config.logging.conversation_log.is_none());
    }

    #[test]
    fn test_later_files_override_earlier() {
        let global = toml_file("[agent]\nmax_iterations = 5\n\n[calendar]\ncalendar_id = \"work\"\n");
        let explicit = toml_file("[agent]\nmax_iterations = 2\n");

        let config = ConfigLoader::extract(ConfigLoader::figment(
            Some(global.path()),
            None,
            Some(explicit.path()),
        ))
        .unwrap();

        assert_eq!(config.agent.max_iterations, 2);
        assert_eq!(config.calendar.calendar_id, "work");
        assert_eq!(config.calendar.backend, CalendarBackendKind::Google);
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let file = toml_file("[provider]\ncall_timeout_secs = 0\n");
        let err = ConfigLoader::extract(ConfigLoader::figment(None, None, Some(file.path())))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_type_is_load_error() {
        let file = toml_file("[agent]\nmax_iterations = \"many\"\n");
        let err = ConfigLoader::extract(ConfigLoader::figment(None, None, Some(file.path())))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("calendar-agent"));
    }
}
