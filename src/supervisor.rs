//! Orchestration of the monitoring tasks.
//!
//! One [`LogTailActor`](crate::actors::tail::LogTailActor) per configured
//! source plus the sampler, started together and shut down together. Shutdown
//! is bounded: a task that ignores its command is logged and abandoned, never
//! awaited forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::actors::sampler::SamplerHandle;
use crate::actors::tail::{MonitoredSource, TailHandle};
use crate::config::Config;
use crate::dispatch::{AlertDispatcher, DeliveryChannel, SubscriberDirectory};

/// Upper bound on waiting for any single task to exit during shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The running set of monitoring tasks.
pub struct Monitor {
    tails: Vec<TailHandle>,
    sampler: SamplerHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl Monitor {
    /// Start all monitoring tasks for `config`.
    ///
    /// `directory` and `channel` are the collaborator seams: who is
    /// subscribed to what, and how messages leave the process.
    pub fn start(
        config: &Config,
        directory: Arc<dyn SubscriberDirectory>,
        channel: Arc<dyn DeliveryChannel>,
    ) -> Self {
        let tuning = config.tuning.clone().unwrap_or_default();
        let limits = config.limits.clone().unwrap_or_default();

        let dispatcher = AlertDispatcher::new(
            directory,
            channel,
            Duration::from_millis(tuning.send_delay_ms),
        );

        let mut tails = Vec::new();
        let mut tasks = Vec::new();

        if let Some(sources) = &config.sources {
            for source_config in sources {
                let source = MonitoredSource::from_config(source_config);
                debug!(
                    "starting tail supervisor for {} ({})",
                    source.path.display(),
                    source.category
                );
                let (handle, task) = TailHandle::spawn(source, dispatcher.clone(), &tuning);
                tails.push(handle);
                tasks.push(task);
            }
        }

        let (sampler, sampler_task) = SamplerHandle::spawn(limits, dispatcher);
        tasks.push(sampler_task);

        Self {
            tails,
            sampler,
            tasks,
        }
    }

    /// Access to the sampler handle (manual ticks, state queries).
    pub fn sampler(&self) -> &SamplerHandle {
        &self.sampler
    }

    /// Coordinated shutdown: signal every task, then await each under a
    /// bounded timeout. Tasks that fail to exit are logged, not retried.
    pub async fn shutdown(self) {
        debug!("shutting down monitoring tasks");

        for tail in &self.tails {
            tail.shutdown().await;
        }
        self.sampler.shutdown().await;

        for task in self.tasks {
            match timeout(JOIN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("monitoring task panicked: {e}"),
                Err(_) => warn!("monitoring task did not exit within {JOIN_TIMEOUT:?}, abandoning"),
            }
        }

        debug!("all monitoring tasks stopped");
    }
}
