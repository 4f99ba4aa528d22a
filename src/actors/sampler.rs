//! ResourceSamplerActor - periodic metric sampling and threshold alerts
//!
//! Samples CPU/RAM/disk on a fixed interval (first tick delayed by one full
//! interval) and runs each value through its own
//! [`MetricAlertState`](crate::monitors::thresholds::MetricAlertState). All
//! alert texts produced in one tick are batched into a single `resources`
//! message so that several metrics crossing at once cost one notification,
//! not three.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, instrument, trace, warn};

use crate::config::Limits;
use crate::dispatch::AlertDispatcher;
use crate::monitors::thresholds::{MetricAlertState, ThresholdEvaluation};
use crate::monitors::sample;
use crate::{AlertCategory, MetricSample};

use super::messages::{SamplerCommand, SamplerState};

#[derive(Debug, Clone, Copy)]
enum Metric {
    Cpu,
    Ram,
    Disk,
}

impl Metric {
    fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU usage",
            Metric::Ram => "RAM usage",
            Metric::Disk => "Disk usage",
        }
    }
}

/// Actor that owns the three per-metric alert states.
pub struct ResourceSamplerActor {
    limits: Limits,
    dispatcher: AlertDispatcher,
    command_rx: mpsc::Receiver<SamplerCommand>,
    states: SamplerState,
}

impl ResourceSamplerActor {
    pub fn new(
        limits: Limits,
        dispatcher: AlertDispatcher,
        command_rx: mpsc::Receiver<SamplerCommand>,
    ) -> Self {
        Self {
            limits,
            dispatcher,
            command_rx,
            states: SamplerState::default(),
        }
    }

    /// Run the actor's main loop until shutdown.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting resource sampler");

        let period = Duration::from_secs(self.limits.sample_interval_secs);
        // startup delay: the first tick comes one full interval in
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // a single bad tick never stops monitoring
                    if let Err(e) = self.tick().await {
                        error!("sampling tick failed: {e:#}");
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SamplerCommand::SampleNow { respond_to }) => {
                            debug!("received SampleNow command");
                            let result = self.tick().await;
                            let _ = respond_to.send(result);
                        }

                        Some(SamplerCommand::GetState { respond_to }) => {
                            let _ = respond_to.send(self.states);
                        }

                        Some(SamplerCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("resource sampler stopped");
    }

    /// Collect one sample and evaluate all three metrics against their
    /// thresholds, dispatching at most one combined message.
    async fn tick(&mut self) -> anyhow::Result<()> {
        // the CPU window blocks for ~1s, keep it off the event loop
        let sample = tokio::task::spawn_blocking(sample::collect)
            .await
            .context("sampling task panicked")?;

        trace!(
            "sample: cpu {:.1}% ram {:.1}% disk {:.1}%",
            sample.cpu_pct, sample.ram_pct, sample.disk_pct
        );

        let texts = self.evaluate(&sample, sample.timestamp);

        if !texts.is_empty() {
            self.dispatcher
                .dispatch(&texts.join("\n"), AlertCategory::Resources)
                .await;
        }

        Ok(())
    }

    /// Pure evaluation step, separated from sampling for testability.
    fn evaluate(&mut self, sample: &MetricSample, now: DateTime<Utc>) -> Vec<String> {
        let cooldown = TimeDelta::seconds(self.limits.cooldown_secs as i64);
        let mut texts = Vec::new();

        let evaluations = [
            (Metric::Cpu, sample.cpu_pct, self.limits.cpu_pct, &mut self.states.cpu),
            (Metric::Ram, sample.ram_pct, self.limits.ram_pct, &mut self.states.ram),
            (Metric::Disk, sample.disk_pct, self.limits.disk_pct, &mut self.states.disk),
        ];

        for (metric, value, threshold, state) in evaluations {
            let evaluation = state.apply(value, threshold, cooldown, now);
            trace!(
                "{}: {value:.1}% vs {threshold:.0}% -> {evaluation:?}",
                metric.label()
            );
            if let Some(text) = format_alert(metric, evaluation, value, threshold) {
                texts.push(text);
            }
        }

        texts
    }
}

fn format_alert(
    metric: Metric,
    evaluation: ThresholdEvaluation,
    value: f32,
    threshold: f32,
) -> Option<String> {
    let label = metric.label();
    match evaluation {
        ThresholdEvaluation::StartsToExceed => Some(format!(
            "⚠️ **{label}** is at **{value:.1}%** (limit: {threshold:.0}%)"
        )),
        ThresholdEvaluation::StillExceeds => Some(format!(
            "⏰ **{label}** still above limit: **{value:.1}%** (limit: {threshold:.0}%)"
        )),
        ThresholdEvaluation::BackToOk => Some(format!(
            "✅ **{label}** back to normal: **{value:.1}%**"
        )),
        ThresholdEvaluation::Ok | ThresholdEvaluation::Suppressed => None,
    }
}

/// Handle for controlling a spawned [`ResourceSamplerActor`]
#[derive(Clone)]
pub struct SamplerHandle {
    sender: mpsc::Sender<SamplerCommand>,
}

impl SamplerHandle {
    /// Spawn the sampler actor.
    pub fn spawn(limits: Limits, dispatcher: AlertDispatcher) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = ResourceSamplerActor::new(limits, dispatcher, cmd_rx);
        let task = tokio::spawn(actor.run());

        (Self { sender: cmd_tx }, task)
    }

    /// Trigger an immediate sampling tick.
    pub async fn sample_now(&self) -> anyhow::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SamplerCommand::SampleNow { respond_to: tx })
            .await
            .context("sampler is gone")?;
        rx.await.context("sampler dropped the response")?
    }

    /// Snapshot of the per-metric alert states.
    pub async fn get_state(&self) -> Option<SamplerState> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SamplerCommand::GetState { respond_to: tx })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Shut the sampler down.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(SamplerCommand::Shutdown).await;
    }
}
