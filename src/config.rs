use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "bus_route_viewer.json";

/// Overrides `data_path`.
pub const DATA_ENV_VAR: &str = "BUS_ROUTE_VIEWER_DATA";

/// Start-up settings for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Table opened at start-up, if any.
    pub data_path: Option<PathBuf>,
    /// Suggested file name for "Export filtered CSV".
    pub export_path: PathBuf,
    /// Initial window size in points.
    pub window_size: [f32; 2],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            export_path: PathBuf::from("filtered_bus_routes.csv"),
            window_size: [1280.0, 800.0],
        }
    }
}

impl ViewerConfig {
    /// Parse a config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Layer defaults, the config file (if it exists), the environment
    /// variable and the CLI argument, later ones winning.
    pub fn resolve(file: &Path, env_data: Option<String>, cli_data: Option<String>) -> Self {
        let mut config = if file.exists() {
            match Self::from_file(file) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("Ignoring config file: {e:#}");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        if let Some(path) = env_data.filter(|p| !p.trim().is_empty()) {
            config.data_path = Some(PathBuf::from(path));
        }
        if let Some(path) = cli_data {
            config.data_path = Some(PathBuf::from(path));
        }
        config
    }

    /// [`ViewerConfig::resolve`] against the real process environment.
    pub fn from_env() -> Self {
        Self::resolve(
            Path::new(CONFIG_FILE),
            std::env::var(DATA_ENV_VAR).ok(),
            std::env::args().nth(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "data_path": "routes.parquet" }}"#).unwrap();

        let cfg = ViewerConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.data_path, Some(PathBuf::from("routes.parquet")));
        assert_eq!(cfg.export_path, PathBuf::from("filtered_bus_routes.csv"));
        assert_eq!(cfg.window_size, [1280.0, 800.0]);
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "data_path": "from_file.csv", "window_size": [800.0, 600.0] }}"#).unwrap();

        let cfg = ViewerConfig::resolve(file.path(), None, None);
        assert_eq!(cfg.data_path, Some(PathBuf::from("from_file.csv")));
        assert_eq!(cfg.window_size, [800.0, 600.0]);

        let cfg = ViewerConfig::resolve(file.path(), Some("from_env.csv".into()), None);
        assert_eq!(cfg.data_path, Some(PathBuf::from("from_env.csv")));

        let cfg = ViewerConfig::resolve(
            file.path(),
            Some("from_env.csv".into()),
            Some("from_cli.json".into()),
        );
        assert_eq!(cfg.data_path, Some(PathBuf::from("from_cli.json")));
    }

    #[test]
    fn broken_or_missing_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert_eq!(ViewerConfig::resolve(file.path(), None, None), ViewerConfig::default());

        let missing = Path::new("/nonexistent/bus_route_viewer.json");
        assert_eq!(ViewerConfig::resolve(missing, Some("  ".into()), None), ViewerConfig::default());
    }
}
