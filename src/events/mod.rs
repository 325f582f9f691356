use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events dispatched after primary writes commit. Consumers are
/// best-effort: a failed or missing consumer never affects the write that
/// produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    QuoteCreated(Uuid),
    QuoteStatusChanged {
        quote_id: Uuid,
        old_status: String,
        new_status: String,
    },
    QuoteCompleted(Uuid),
    QuoteCancelled {
        quote_id: Uuid,
        reason: Option<String>,
    },
    VendorRequestCreated {
        quote_id: Uuid,
        vendor_request_id: Uuid,
        vendor_email: String,
    },
    VendorResponseSubmitted {
        vendor_request_id: Uuid,
        quote_id: Uuid,
        is_edit: bool,
    },
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderDelivered(Uuid),
    BudgetDebited {
        budget_id: Uuid,
        order_id: Uuid,
        amount: i64,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Dispatch an event without surfacing failure to the caller. Used for
    /// post-commit side effects where the primary write already succeeded.
    pub async fn dispatch(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dispatch failed: {}", e);
        }
    }
}

/// Background processor draining the event channel. This is the activity
/// log: every domain event is recorded here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::QuoteStatusChanged {
                quote_id,
                old_status,
                new_status,
            } => {
                info!(
                    quote_id = %quote_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Quote status changed"
                );
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    order_id = %order_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Order status changed"
                );
            }
            Event::BudgetDebited {
                budget_id,
                order_id,
                amount,
            } => {
                info!(
                    budget_id = %budget_id,
                    order_id = %order_id,
                    amount = %amount,
                    "Budget debited"
                );
            }
            other => {
                info!(event = ?other, "Domain event");
            }
        }
    }
    info!("Event channel closed, processor exiting");
}

/// Create a connected sender/processor pair. The returned receiver should
/// be passed to [`process_events`] on a spawned task.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (sender, mut rx) = channel(8);
        let quote_id = Uuid::new_v4();
        sender.send(Event::QuoteCreated(quote_id)).await.unwrap();
        match rx.recv().await {
            Some(Event::QuoteCreated(id)) => assert_eq!(id, quote_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn dispatch_swallows_closed_channel() {
        let (sender, rx) = channel(1);
        drop(rx);
        // Must not panic or error out.
        sender.dispatch(Event::OrderCreated(Uuid::new_v4())).await;
    }
}
