//! Pure per-metric threshold state machine.
//!
//! Converts a noisy stream of periodic samples into a small number of
//! meaningful events per metric:
//!
//! ```text
//! sample >= threshold:
//!   not exceeded yet              → StartsToExceed (alert, remember time)
//!   exceeded, cooldown elapsed    → StillExceeds   (reminder, refresh time)
//!   exceeded, within cooldown     → Suppressed     (no alert)
//!
//! sample < threshold:
//!   was exceeded                  → BackToOk       (recovery alert, reset)
//!   otherwise                     → Ok
//! ```
//!
//! At most one alert per metric per cooldown window while the breach is
//! sustained.

use chrono::{DateTime, TimeDelta, Utc};

/// Alert state for a single metric. Mutated only by [`MetricAlertState::apply`]
/// from the sampler task; no other writer exists.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricAlertState {
    pub exceeded: bool,
    /// Set only while `exceeded` is true.
    pub last_alert: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdEvaluation {
    Ok,
    StartsToExceed,
    StillExceeds,
    Suppressed,
    BackToOk,
}

impl ThresholdEvaluation {
    /// Whether this evaluation produces an alert message.
    pub fn alerts(&self) -> bool {
        matches!(
            self,
            ThresholdEvaluation::StartsToExceed
                | ThresholdEvaluation::StillExceeds
                | ThresholdEvaluation::BackToOk
        )
    }
}

impl MetricAlertState {
    /// Feed one sample into the state machine and return what (if anything)
    /// should be alerted.
    pub fn apply(
        &mut self,
        value: f32,
        threshold: f32,
        cooldown: TimeDelta,
        now: DateTime<Utc>,
    ) -> ThresholdEvaluation {
        if value >= threshold {
            if !self.exceeded {
                self.exceeded = true;
                self.last_alert = Some(now);
                return ThresholdEvaluation::StartsToExceed;
            }

            let reminder_due = self
                .last_alert
                .is_none_or(|last| now.signed_duration_since(last) > cooldown);

            if reminder_due {
                self.last_alert = Some(now);
                return ThresholdEvaluation::StillExceeds;
            }

            return ThresholdEvaluation::Suppressed;
        }

        if self.exceeded {
            *self = MetricAlertState::default();
            return ThresholdEvaluation::BackToOk;
        }

        ThresholdEvaluation::Ok
    }
}
