use crate::entities::{LocationRef, TransactionType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

/// Creates a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Publishes without waiting. A full or closed channel drops the event
    /// with a warning; committed work is never undone for a lost event.
    pub fn publish(&self, event: Event) {
        let name = event.name();
        match self.sender.try_send(event) {
            Ok(()) => {
                debug!(event = name, "Published event");
                counter!("asset_ledger_events.published", 1, "event" => name);
            }
            Err(TrySendError::Full(_)) => {
                warn!(event = name, "Event channel full, dropping event");
                counter!("asset_ledger_events.dropped", 1, "event" => name);
            }
            Err(TrySendError::Closed(_)) => {
                warn!(event = name, "Event channel closed, dropping event");
                counter!("asset_ledger_events.dropped", 1, "event" => name);
            }
        }
    }
}

/// Facts published after a submission commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    MovementRecorded {
        transaction_id: i64,
        transaction_type: TransactionType,
        source: Option<LocationRef>,
        destination: Option<LocationRef>,
        line_count: usize,
        actor_id: i64,
        occurred_at: DateTime<Utc>,
    },
    ProcurementReceived {
        transaction_id: i64,
        warehouse_id: i64,
        devices_created: usize,
        units_received: i64,
        actor_id: i64,
        occurred_at: DateTime<Utc>,
    },
    TransferApproved {
        transaction_id: i64,
        approved_by: i64,
        occurred_at: DateTime<Utc>,
    },
    TransferConfirmed {
        transaction_id: i64,
        destination_warehouse_id: i64,
        confirmed_by: i64,
        occurred_at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::MovementRecorded { .. } => "movement_recorded",
            Event::ProcurementReceived { .. } => "procurement_received",
            Event::TransferApproved { .. } => "transfer_approved",
            Event::TransferConfirmed { .. } => "transfer_confirmed",
        }
    }

    pub fn transaction_id(&self) -> i64 {
        match self {
            Event::MovementRecorded { transaction_id, .. }
            | Event::ProcurementReceived { transaction_id, .. }
            | Event::TransferApproved { transaction_id, .. }
            | Event::TransferConfirmed { transaction_id, .. } => *transaction_id,
        }
    }
}

// Collaborators (notifications, snapshot jobs) subscribe by implementing this.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Drains the channel, handing every event to each handler in turn. Handler
/// failures are logged and do not stop the loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!(event = event.name(), transaction_id = event.transaction_id(), "Received event");

        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(
                    event = event.name(),
                    transaction_id = event.transaction_id(),
                    "Event handler failed: {}",
                    e
                );
            }
        }
    }

    info!("Event channel closed, stopping event processing loop");
}
