//! Alert fan-out to subscribed recipients.
//!
//! The dispatcher is the single convergence point for log-derived and
//! resource-derived alerts. It looks up the recipients subscribed to a
//! category and delivers to each in turn, isolating per-recipient failures so
//! one unreachable recipient never costs the others their message.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, instrument, trace, warn};

use crate::{AlertCategory, RecipientId, config::RecipientConfig};

/// Result type alias for delivery attempts
pub type DeliveryResult = Result<(), DeliveryError>;

/// Errors a delivery channel can report for a single recipient
#[derive(Debug)]
pub enum DeliveryError {
    /// The recipient cannot be reached at all (blocked, gone, not found).
    /// Logged at warning level and skipped.
    Unreachable(String),

    /// Any other delivery failure (transport error, server error).
    /// Logged at error level and skipped.
    Other(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Unreachable(msg) => write!(f, "recipient unreachable: {}", msg),
            DeliveryError::Other(msg) => write!(f, "delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Read-only view of the recipient -> subscribed-categories mapping.
///
/// Owned and mutated by the embedding application; the dispatcher only takes
/// point-in-time snapshots, so implementations must return consistent (not
/// torn) sets but are free to change between calls.
pub trait SubscriberDirectory: Send + Sync {
    /// Snapshot of all recipients currently subscribed to `category`.
    fn subscribers(&self, category: AlertCategory) -> Vec<RecipientId>;

    fn is_subscribed(&self, recipient: RecipientId, category: AlertCategory) -> bool {
        self.subscribers(category).contains(&recipient)
    }
}

/// Outbound message transport for a single recipient.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, recipient: RecipientId, text: &str) -> DeliveryResult;
}

/// Fans one alert out to every subscriber of its category.
#[derive(Clone)]
pub struct AlertDispatcher {
    directory: Arc<dyn SubscriberDirectory>,
    channel: Arc<dyn DeliveryChannel>,
    send_delay: Duration,
}

impl AlertDispatcher {
    pub fn new(
        directory: Arc<dyn SubscriberDirectory>,
        channel: Arc<dyn DeliveryChannel>,
        send_delay: Duration,
    ) -> Self {
        Self {
            directory,
            channel,
            send_delay,
        }
    }

    /// Deliver `text` to every recipient subscribed to `category`.
    ///
    /// Delivers sequentially with a fixed pause between sends to respect
    /// external rate limits. Never fails: per-recipient errors are logged and
    /// skipped, an empty subscriber set is a no-op.
    #[instrument(skip(self, text), fields(category = %category))]
    pub async fn dispatch(&self, text: &str, category: AlertCategory) {
        let recipients = self.directory.subscribers(category);

        if recipients.is_empty() {
            debug!("no subscribers for category, skipping alert");
            return;
        }

        trace!("dispatching alert to {} recipients", recipients.len());

        let mut first = true;
        for recipient in recipients {
            if !first {
                tokio::time::sleep(self.send_delay).await;
            }
            first = false;

            match self.channel.send(recipient, text).await {
                Ok(()) => trace!("delivered alert to {recipient}"),
                Err(DeliveryError::Unreachable(msg)) => {
                    warn!("recipient {recipient} unreachable, skipping: {msg}");
                }
                Err(DeliveryError::Other(msg)) => {
                    error!("failed to deliver alert to {recipient}: {msg}");
                }
            }
        }
    }
}

/// Config-driven subscription mapping for standalone deployments.
///
/// An embedding bot with live user management implements
/// [`SubscriberDirectory`] itself; this one is fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    subscriptions: HashMap<RecipientId, HashSet<AlertCategory>>,
}

impl StaticDirectory {
    pub fn new(recipients: &[RecipientConfig]) -> Self {
        let subscriptions = recipients
            .iter()
            .map(|r| (r.id, r.categories.iter().copied().collect()))
            .collect();
        Self { subscriptions }
    }
}

impl SubscriberDirectory for StaticDirectory {
    fn subscribers(&self, category: AlertCategory) -> Vec<RecipientId> {
        let mut ids = self
            .subscriptions
            .iter()
            .filter(|(_, categories)| categories.contains(&category))
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        // deterministic delivery order
        ids.sort_unstable();
        ids
    }

    fn is_subscribed(&self, recipient: RecipientId, category: AlertCategory) -> bool {
        self.subscriptions
            .get(&recipient)
            .is_some_and(|categories| categories.contains(&category))
    }
}

/// Webhook-based delivery: POSTs a JSON payload per recipient.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: Client,
    endpoints: HashMap<RecipientId, String>,
}

impl WebhookChannel {
    pub fn new(recipients: &[RecipientConfig]) -> Self {
        Self {
            client: Client::new(),
            endpoints: recipients
                .iter()
                .map(|r| (r.id, r.url.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    async fn send(&self, recipient: RecipientId, text: &str) -> DeliveryResult {
        let Some(url) = self.endpoints.get(&recipient) else {
            return Err(DeliveryError::Unreachable(format!(
                "no endpoint configured for recipient {recipient}"
            )));
        };

        let payload = json!({
            "recipient": recipient,
            "text": text,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Other(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            403 | 404 | 410 => Err(DeliveryError::Unreachable(format!(
                "endpoint answered {status}"
            ))),
            _ => Err(DeliveryError::Other(format!("endpoint answered {status}"))),
        }
    }
}
