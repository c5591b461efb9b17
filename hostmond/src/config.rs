use crate::alerts::Thresholds;
use crate::error::{MonitorError, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub alerts: AlertConfig,
    pub storage: StorageConfig,
    pub chart: ChartConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_secs: u64,
    /// CPU utilisation is averaged over this window on every tick.
    pub cpu_window_ms: u64,
    pub history_size: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            cpu_window_ms: 1000,
            history_size: crate::history::MAX_METRICS,
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.cpu_window_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_mb: f64,
    pub network_mb: f64,
    pub cooldown_secs: u64,
    pub slack_webhook_url: Option<String>,
    pub journal_path: Option<PathBuf>,
    pub timeout_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cpu_percent: 80.0,
            memory_percent: 90.0,
            disk_mb: 500.0,
            network_mb: 500.0,
            cooldown_secs: 300,
            slack_webhook_url: None,
            journal_path: Some(data_dir().join("logs/alerts.log")),
            timeout_ms: 10_000,
        }
    }
}

impl AlertConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    /// Journal path; an empty `journal_path` disables the journal.
    pub fn journal(&self) -> Option<&Path> {
        self.journal_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            cpu_percent: self.cpu_percent,
            memory_percent: self.memory_percent,
            disk_mb: self.disk_mb,
            network_mb: self.network_mb,
        }
    }

    /// Webhook URL with blank strings treated as unset.
    pub fn webhook(&self) -> Option<&str> {
        self.slack_webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("metrics.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub path: PathBuf,
    pub interval_secs: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("graphs/metrics_plot.svg"),
            interval_secs: 30,
        }
    }
}

impl ChartConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub listen_addr: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(raw).map_err(|e| MonitorError::config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        let a = &self.alerts;
        for (name, value) in [
            ("alerts.cpu_percent", a.cpu_percent),
            ("alerts.memory_percent", a.memory_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(MonitorError::config(format!(
                    "{name} must be within 0..=100, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("alerts.disk_mb", a.disk_mb),
            ("alerts.network_mb", a.network_mb),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MonitorError::config(format!(
                    "{name} must be a finite value >= 0, got {value}"
                )));
            }
        }
        if self.sampling.history_size == 0 {
            return Err(MonitorError::config("sampling.history_size must be >= 1"));
        }
        Ok(())
    }
}

/// `$HOME/monitor`, or `./monitor` when HOME is unset.
pub fn data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("monitor")
}
