//! Threshold alerting with a global cooldown
//!
//! Each tick the engine tests four independent conditions against the
//! snapshot. Every condition that holds goes into one combined message, and at
//! most one message is released per cooldown window regardless of which
//! conditions fired.

mod journal;
mod notifier;

pub use journal::{AlertJournal, AlertRecord};
pub use notifier::{AlertSink, LogNotifier, SlackNotifier};

use crate::config::AlertConfig;
use crate::types::{Metrics, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use std::fmt;
use std::time::{Duration, Instant};

pub const ALERT_COOLDOWN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_mb: f64,
    pub network_mb: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 80.0,
            memory_percent: 90.0,
            disk_mb: 500.0,
            network_mb: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertCondition {
    HighCpu(f64),
    HighMemory(f64),
    HighDisk { read_mb: f64, write_mb: f64 },
    HighNetwork { sent_mb: f64, received_mb: f64 },
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertCondition::HighCpu(pct) => write!(f, " 🔥 High CPU Usage: {pct:.1}%"),
            AlertCondition::HighMemory(pct) => write!(f, " 📦 High Memory Usage: {pct:.1}%"),
            AlertCondition::HighDisk { read_mb, write_mb } => write!(
                f,
                " 💾 High Disk Usage: Read {read_mb:.2}MB, Write {write_mb:.2}MB"
            ),
            AlertCondition::HighNetwork {
                sent_mb,
                received_mb,
            } => write!(
                f,
                " 🌐 High Network Usage: Sent {sent_mb:.2}MB, Received {received_mb:.2}MB"
            ),
        }
    }
}

/// A composed alert ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub timestamp: NaiveDateTime,
    pub conditions: Vec<AlertCondition>,
}

impl AlertMessage {
    pub fn text(&self) -> String {
        let mut out = format!("Alert at {}:", self.timestamp.format(TIMESTAMP_FORMAT));
        for condition in &self.conditions {
            out.push('\n');
            out.push_str(&condition.to_string());
        }
        out
    }
}

/// Stateful evaluator owned by the sampling activity.
///
/// `evaluate` takes `&mut self`: the sampling loop is the only caller, so the
/// last-alert instant needs no lock. Sharing the engine across activities
/// would require wrapping it in a mutex.
#[derive(Debug)]
pub struct AlertEngine {
    thresholds: Thresholds,
    cooldown: Duration,
    last_alert: Option<Instant>,
}

impl AlertEngine {
    pub fn new(thresholds: Thresholds, cooldown: Duration) -> Self {
        Self {
            thresholds,
            cooldown,
            last_alert: None,
        }
    }

    pub fn from_config(cfg: &AlertConfig) -> Self {
        Self::new(cfg.thresholds(), Duration::from_secs(cfg.cooldown_secs))
    }

    /// Conditions that hold for `metrics`, in fixed order.
    pub fn conditions(&self, metrics: &Metrics) -> Vec<AlertCondition> {
        let t = &self.thresholds;
        let mut out = Vec::new();

        if metrics.cpu_usage > t.cpu_percent {
            out.push(AlertCondition::HighCpu(metrics.cpu_usage));
        }
        if metrics.memory_usage > t.memory_percent {
            out.push(AlertCondition::HighMemory(metrics.memory_usage));
        }
        if metrics.disk_read > t.disk_mb || metrics.disk_write > t.disk_mb {
            out.push(AlertCondition::HighDisk {
                read_mb: metrics.disk_read,
                write_mb: metrics.disk_write,
            });
        }
        if metrics.network_sent > t.network_mb || metrics.network_received > t.network_mb {
            out.push(AlertCondition::HighNetwork {
                sent_mb: metrics.network_sent,
                received_mb: metrics.network_received,
            });
        }
        out
    }

    /// Returns a message when at least one condition holds and the cooldown
    /// has elapsed; records `now` as the last alert time in that case.
    pub fn evaluate(&mut self, metrics: &Metrics, now: Instant) -> Option<AlertMessage> {
        let conditions = self.conditions(metrics);
        if conditions.is_empty() || self.in_cooldown(now) {
            return None;
        }

        self.last_alert = Some(now);
        Some(AlertMessage {
            timestamp: metrics.timestamp,
            conditions,
        })
    }

    fn in_cooldown(&self, now: Instant) -> bool {
        self.last_alert
            .is_some_and(|last| now.saturating_duration_since(last) <= self.cooldown)
    }

    pub fn last_alert(&self) -> Option<Instant> {
        self.last_alert
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(Thresholds::default(), ALERT_COOLDOWN)
    }
}
