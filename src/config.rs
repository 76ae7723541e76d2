use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

fn default_port() -> u16 { 8080 }
fn default_telemetry_url() -> String { "http://127.0.0.1/json/s10daten.json".to_owned() }
fn default_duration_s() -> u64 { 2 }
fn default_peak_power_w() -> f64 { 10_000.0 }
fn default_latitude() -> f64 { 49.843 }
fn default_longitude() -> f64 { 9.902 }
fn default_locale_dir() -> PathBuf { PathBuf::from("lang") }
fn default_language() -> String { "de".to_owned() }

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Run parameters, resolved once at startup and never changed afterwards.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub plant: PlantConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_url")]
    pub url: String,
    /// Request timeout; defaults to the refresh period.
    pub timeout_ms: Option<u64>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { url: default_telemetry_url(), timeout_ms: None }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnimationConfig {
    /// Refresh period and length of every transition, in seconds.
    #[serde(default = "default_duration_s")]
    pub duration_s: u64,
    /// Reduced motion: no spinning, no beams or smoke, slower solar updates.
    #[serde(default)]
    pub slow: bool,
    /// No transitions at all, only static state updates.
    #[serde(default)]
    pub disabled: bool,
    pub batch_timeout_s: Option<u64>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_s: default_duration_s(),
            slow: false,
            disabled: false,
            batch_timeout_s: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlantConfig {
    #[serde(default = "default_peak_power_w")]
    pub peak_power_w: f64,
    /// Expected noon peak at the begin of (northern) summer.
    pub summer_peak_w: Option<f64>,
    /// Expected noon peak at the begin of (northern) winter.
    pub winter_peak_w: Option<f64>,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            peak_power_w: default_peak_power_w(),
            summer_peak_w: None,
            winter_peak_w: None,
            latitude: default_latitude(),
            longitude: default_longitude(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocaleConfig {
    #[serde(default = "default_locale_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self { directory: default_locale_dir(), language: default_language() }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.animation.duration_s.max(1))
    }

    /// Length of one transition; identical to the refresh period.
    pub fn effect_duration(&self) -> Duration {
        self.refresh_period()
    }

    pub fn batch_timeout(&self) -> Duration {
        match self.animation.batch_timeout_s {
            Some(secs) => Duration::from_secs(secs.max(1)),
            None => self.refresh_period() * 5,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        match self.telemetry.timeout_ms {
            Some(ms) => Duration::from_millis(ms.max(1)),
            None => self.refresh_period(),
        }
    }

    /// Interval of the cheap day/night and capacity recomputation.
    pub fn solar_interval(&self) -> Duration {
        if self.animation.slow { Duration::from_secs(300) } else { Duration::from_secs(60) }
    }

    pub fn peak_power_w(&self) -> f64 {
        positive_or(Some(self.plant.peak_power_w), default_peak_power_w())
    }

    pub fn summer_peak_w(&self) -> f64 {
        positive_or(self.plant.summer_peak_w, 0.8 * self.peak_power_w())
    }

    pub fn winter_peak_w(&self) -> f64 {
        positive_or(self.plant.winter_peak_w, 0.6 * self.peak_power_w())
    }

    pub fn locale_path(&self) -> PathBuf {
        self.locale.directory.join(format!("{}.json", self.locale.language))
    }
}

fn positive_or(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.max(1.0),
        _ => fallback,
    }
}
