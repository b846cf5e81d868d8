use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Directories holding songs to crawl (used when `crawl` has no CLI args).
    pub music_dirs: Vec<PathBuf>,
    /// Directory for JSON caches and exported CSVs (overrides XDG default).
    pub cache_dir: Option<PathBuf>,
    /// Crawler HTTP settings.
    pub crawler: CrawlerConfig,
    /// Prediction model settings.
    pub model: ModelConfig,
}

/// Crawler HTTP configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Delay between HTTP requests in milliseconds.
    pub rate_limit_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: 500,
            timeout_secs: 15,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// Which estimator family the prediction module wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Random-forest regression on the raw view count.
    Regressor,
    /// k-NN classification over binned view-count ranges.
    Classifier,
}

/// Feature scaler applied before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalerKind {
    MinMax,
    Standard,
}

/// Prediction model configuration. Enumerates every recognized option
/// with defaults matching the original experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub family: ModelFamily,
    /// Neighbors for the k-NN classifier.
    pub k: usize,
    /// Trees for the random-forest regressor.
    pub n_trees: u16,
    /// Held-out fraction for the train/test split.
    pub test_size: f32,
    /// Split shuffle seed.
    pub seed: u64,
    pub scaler: ScalerKind,
    /// Upper bounds of the view-count classification bins.
    pub bin_thresholds: Vec<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            family: ModelFamily::Regressor,
            k: 5,
            n_trees: 100,
            test_size: 0.33,
            seed: 42,
            scaler: ScalerKind::MinMax,
            bin_thresholds: vec![
                100_000.0,
                500_000.0,
                1_000_000.0,
                5_000_000.0,
                10_000_000.0,
                50_000_000.0,
                100_000_000.0,
                500_000_000.0,
                1_000_000_000.0,
                10_000_000_000.0,
            ],
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/mightyfi/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default cache directory using the XDG data directory.
pub fn default_cache_dir() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.to_path_buf()
    } else {
        // Fallback: current directory
        PathBuf::from(".")
    }
}
