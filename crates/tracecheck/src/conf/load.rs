//! Load: config loading from file and environment variables.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::model::CheckerConfig;

pub const CONFIG_ENV: &str = "TRACECHECK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "tracecheck.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl CheckerConfig {
    /// Load configuration.
    /// Priority: Environment Variables > Config File > Defaults
    ///
    /// An explicitly named file (argument or `TRACECHECK_CONFIG`) must exist;
    /// the default `tracecheck.toml` is only read when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let explicit = explicit.map(Path::to_path_buf).or(from_env);

        let mut config = match explicit {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::from_file(&path)?
            }
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                tracing::info!("Loading configuration from: {}", DEFAULT_CONFIG_PATH);
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                tracing::debug!("No config file, using defaults");
                Self::default()
            }
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Environment variables override file config
    pub fn apply_env(&mut self) {
        if let Ok(marker) = std::env::var("TRACECHECK_MARKER") {
            self.marker = marker;
        }
        if let Ok(dir) = std::env::var("TRACECHECK_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(jar) = std::env::var("TLA2TOOLS_JAR") {
            self.tla2tools_jar = Some(PathBuf::from(jar));
        }
        if let Ok(java) = std::env::var("TRACECHECK_JAVA") {
            self.java = PathBuf::from(java);
        }
        if let Ok(value) = std::env::var("TRACECHECK_WORKERS") {
            if let Some(workers) = parse_workers(&value) {
                self.workers = workers;
            }
        }
    }

    /// Validate that configuration values are sane
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.marker.trim().is_empty() {
            return Err(ConfigError::Invalid("marker must not be empty".to_string()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be > 0".to_string()));
        }
        if self.checker_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("checker_timeout_secs must be > 0 when set".to_string()));
        }
        if self.servers.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid("servers must not contain empty ids".to_string()));
        }
        self.trace.validate().map_err(ConfigError::Invalid)
    }
}

/// `None`, with a warning, when the value is not a worker count.
fn parse_workers(value: &str) -> Option<u32> {
    match value.trim().parse() {
        Ok(workers) => Some(workers),
        Err(e) => {
            tracing::warn!("Ignoring TRACECHECK_WORKERS={:?}: {}", value, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "marker = \"[TRACE]\"\nworkers = 4").unwrap();

        let cfg = CheckerConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.marker, "[TRACE]");
        assert_eq!(cfg.workers, 4);
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CheckerConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_from_file_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers = \"many\"").unwrap();
        let err = CheckerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_validate_default_passes() {
        assert!(CheckerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_marker() {
        let cfg = CheckerConfig {
            marker: "  ".to_string(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("marker"), "{}", err);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let cfg = CheckerConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let cfg = CheckerConfig {
            checker_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_server_id() {
        let cfg = CheckerConfig {
            servers: vec!["0".to_string(), "".to_string()],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    // ── Environment overrides ────────────────────────────────────────

    #[test]
    fn test_parse_workers_accepts_counts() {
        assert_eq!(parse_workers("4"), Some(4));
        assert_eq!(parse_workers(" 2\n"), Some(2));
    }

    #[test]
    fn test_parse_workers_rejects_garbage() {
        assert_eq!(parse_workers("many"), None);
        assert_eq!(parse_workers("-1"), None);
        assert_eq!(parse_workers(""), None);
    }
}
