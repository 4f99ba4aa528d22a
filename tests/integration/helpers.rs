//! Test helpers shared by the integration tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vigil::dispatch::{
    AlertDispatcher, DeliveryChannel, DeliveryError, DeliveryResult, SubscriberDirectory,
};
use vigil::{AlertCategory, RecipientId};

/// Directory subscribing a fixed set of recipients to every category.
pub struct EveryCategory(pub Vec<RecipientId>);

impl SubscriberDirectory for EveryCategory {
    fn subscribers(&self, _category: AlertCategory) -> Vec<RecipientId> {
        self.0.clone()
    }
}

/// Delivery channel that records everything it is asked to send.
#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Arc<Mutex<Vec<(RecipientId, String)>>>,
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send(&self, recipient: RecipientId, text: &str) -> DeliveryResult {
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        Ok(())
    }
}

/// Channel that fails for one specific recipient and records the rest.
pub struct FlakyChannel {
    pub failing: RecipientId,
    pub error_kind: fn(String) -> DeliveryError,
    pub sent: Arc<Mutex<Vec<RecipientId>>>,
}

#[async_trait]
impl DeliveryChannel for FlakyChannel {
    async fn send(&self, recipient: RecipientId, _text: &str) -> DeliveryResult {
        if recipient == self.failing {
            return Err((self.error_kind)("simulated failure".to_string()));
        }
        self.sent.lock().unwrap().push(recipient);
        Ok(())
    }
}

/// Dispatcher over a recording channel, subscribed recipients get everything.
pub fn recording_dispatcher(
    recipients: Vec<RecipientId>,
) -> (AlertDispatcher, Arc<Mutex<Vec<(RecipientId, String)>>>) {
    let channel = RecordingChannel::default();
    let sent = channel.sent.clone();
    let dispatcher = AlertDispatcher::new(
        Arc::new(EveryCategory(recipients)),
        Arc::new(channel),
        Duration::from_millis(0),
    );
    (dispatcher, sent)
}
