mod system;

pub use system::SystemSampler;

use crate::error::Result;
use crate::types::Metrics;

/// Produces one snapshot per call.
///
/// `collect` may block (the system sampler sleeps through its CPU window), so
/// async callers must run it on the blocking pool. An `Err` means the tick is
/// skipped; nothing downstream sees a partial snapshot.
pub trait MetricsSource: Send + 'static {
    fn collect(&mut self) -> Result<Metrics>;
}
