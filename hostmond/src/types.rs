use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wire and storage format for snapshot timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One sampling tick worth of host measurements.
///
/// Disk and network fields are cumulative counters since host start,
/// converted to megabytes. Consumers must treat them as counters, not deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub cpu_usage: f64,    // percent, 0..=100
    pub memory_usage: f64, // percent, 0..=100
    pub disk_read: f64,
    pub disk_write: f64,
    pub network_sent: f64,
    pub network_received: f64,
}

impl Metrics {
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// One-line summary for the per-tick debug log.
    pub fn summary(&self) -> String {
        format!(
            "{} cpu={:.1}% mem={:.1}% disk_r={:.1}MB disk_w={:.1}MB net_tx={:.1}MB net_rx={:.1}MB",
            self.timestamp_string(),
            self.cpu_usage,
            self.memory_usage,
            self.disk_read,
            self.disk_write,
            self.network_sent,
            self.network_received
        )
    }
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
}

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    /// Snapshot at 2025-03-30 10:05:00 + `offset_secs`.
    pub fn metrics_at(offset_secs: i64) -> Metrics {
        let base = NaiveDate::from_ymd_opt(2025, 3, 30)
            .and_then(|d| d.and_hms_opt(10, 5, 0))
            .unwrap();
        Metrics {
            timestamp: base + chrono::Duration::seconds(offset_secs),
            cpu_usage: 10.0,
            memory_usage: 40.0,
            disk_read: 0.0,
            disk_write: 0.0,
            network_sent: 0.0,
            network_received: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::metrics_at;
    use super::*;

    #[test]
    fn serializes_with_flat_field_names_and_text_timestamp() {
        let value = serde_json::to_value(metrics_at(35)).unwrap();
        assert_eq!(value["timestamp"], "2025-03-30 10:05:35");
        assert_eq!(value["cpu_usage"], 10.0);
        assert!(value.get("network_received").is_some());
    }

    #[test]
    fn deserializes_from_wire_format() {
        let json = r#"{"timestamp":"2025-03-30 10:05:35","cpu_usage":1.5,"memory_usage":2.5,
            "disk_read":3.0,"disk_write":4.0,"network_sent":5.0,"network_received":6.0}"#;
        let m: Metrics = serde_json::from_str(json).unwrap();
        assert_eq!(m.timestamp, metrics_at(35).timestamp);
        assert_eq!(m.network_received, 6.0);
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let json = r#"{"timestamp":"yesterday","cpu_usage":0,"memory_usage":0,
            "disk_read":0,"disk_write":0,"network_sent":0,"network_received":0}"#;
        assert!(serde_json::from_str::<Metrics>(json).is_err());
    }

    #[test]
    fn converts_bytes_to_megabytes() {
        assert_eq!(bytes_to_mb(1024 * 1024), 1.0);
        assert_eq!(bytes_to_mb(512 * 1024 * 1024), 512.0);
        assert_eq!(bytes_to_mb(0), 0.0);
    }
}
