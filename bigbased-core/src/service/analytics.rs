//! Visit tracking
//!
//! Visits are queued on a bounded channel and delivered by a background
//! task. Callers never wait on delivery and never see its failures; those
//! only show up in logs and the `bigbased_visit_events_total` counter.

use metrics::counter;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const QUEUE_CAPACITY: usize = 1024;

/// Body accepted by the analytics endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitEvent {
    pub domain_id: i64,
    #[serde(rename = "type")]
    pub event_type: &'static str,
}

impl VisitEvent {
    pub fn visit(domain_id: i64) -> Self {
        Self {
            domain_id,
            event_type: "visit",
        }
    }
}

/// Non-blocking handle for recording visits
#[derive(Debug, Clone)]
pub struct VisitTracker {
    sender: mpsc::Sender<VisitEvent>,
}

impl VisitTracker {
    /// Start the delivery task and return the tracker plus the task handle.
    /// The task ends once every tracker clone has been dropped.
    pub fn spawn(endpoint: String) -> (Self, JoinHandle<()>) {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client for analytics: {}", e);
                Client::new()
            });
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(deliver_visits(http_client, endpoint, receiver));
        (Self { sender }, handle)
    }

    /// Queue a visit without waiting; drops the event when the queue is full
    pub fn track_visit(&self, domain_id: i64) {
        match self.sender.try_send(VisitEvent::visit(domain_id)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                counter!("bigbased_visit_events_total", "result" => "dropped").increment(1);
                warn!(domain_id, "Visit queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                counter!("bigbased_visit_events_total", "result" => "dropped").increment(1);
                debug!(domain_id, "Visit tracker stopped, dropping event");
            }
        }
    }
}

async fn deliver_visits(
    http_client: Client,
    endpoint: String,
    mut receiver: mpsc::Receiver<VisitEvent>,
) {
    while let Some(event) = receiver.recv().await {
        let result = http_client.post(&endpoint).json(&event).send().await;
        match result {
            Ok(response) if response.status().is_success() => {
                counter!("bigbased_visit_events_total", "result" => "delivered").increment(1);
            }
            Ok(response) => {
                counter!("bigbased_visit_events_total", "result" => "failed").increment(1);
                warn!(
                    domain_id = event.domain_id,
                    status = %response.status(),
                    "Analytics endpoint rejected visit"
                );
            }
            Err(e) => {
                counter!("bigbased_visit_events_total", "result" => "failed").increment(1);
                warn!(domain_id = event.domain_id, error = %e, "Visit delivery failed");
            }
        }
    }
}
