//! Command types for actor control channels.

use tokio::sync::oneshot;

use crate::monitors::thresholds::MetricAlertState;

/// Commands understood by a [`LogTailActor`](crate::actors::tail::LogTailActor)
#[derive(Debug)]
pub enum TailCommand {
    /// Tear the stream down gracefully and exit the task.
    Shutdown,
}

/// Commands understood by the
/// [`ResourceSamplerActor`](crate::actors::sampler::ResourceSamplerActor)
#[derive(Debug)]
pub enum SamplerCommand {
    /// Trigger an immediate sampling tick (bypassing the interval timer).
    ///
    /// Used for testing and manual refresh operations.
    SampleNow {
        respond_to: oneshot::Sender<anyhow::Result<()>>,
    },

    /// Get the current per-metric alert states.
    GetState {
        respond_to: oneshot::Sender<SamplerState>,
    },

    /// Gracefully shut down the sampler.
    Shutdown,
}

/// Snapshot of the three per-metric alert states.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerState {
    pub cpu: MetricAlertState,
    pub ram: MetricAlertState,
    pub disk: MetricAlertState,
}
