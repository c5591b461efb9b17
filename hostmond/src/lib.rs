pub mod alerts;
pub mod api;
pub mod chart;
pub mod collectors;
pub mod config;
pub mod error;
pub mod history;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod ui;

pub use alerts::{AlertEngine, AlertMessage, AlertSink};
pub use config::Config;
pub use error::MonitorError;
pub use history::{HistoryBuffer, MAX_METRICS};
pub use scheduler::{RenderLoop, SamplingLoop, Scheduler, ShutdownSignal, TickReport};
pub use store::MetricsStore;
pub use types::Metrics;
