//! Error taxonomy shared by the sampling, persistence, alerting and
//! rendering paths. None of these are fatal once the daemon is running:
//! every activity logs them at the point of occurrence and carries on.

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The OS metric query failed; the tick is skipped.
    #[error("metric sample unavailable: {0}")]
    SampleUnavailable(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// The alert transport rejected or failed to carry the message.
    #[error("alert delivery failed: {0}")]
    Delivery(String),

    #[error("chart render failed: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(String),
}

impl MonitorError {
    pub(crate) fn sample_unavailable<S: Into<String>>(msg: S) -> Self {
        MonitorError::SampleUnavailable(msg.into())
    }

    pub(crate) fn delivery<S: Into<String>>(msg: S) -> Self {
        MonitorError::Delivery(msg.into())
    }

    pub(crate) fn render<S: Into<String>>(msg: S) -> Self {
        MonitorError::Render(msg.into())
    }

    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
