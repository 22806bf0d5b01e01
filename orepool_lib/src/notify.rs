// Copyright (C) 2025, 2026 Orepool Developers (see AUTHORS)
//
// This file is part of Orepool
//
// Orepool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Orepool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Orepool. If not, see <https://www.gnu.org/licenses/>.

//! Pool event notifications.
//!
//! An actor owns the subscriber map, so subscribe/unsubscribe/publish all
//! run on one task and the map needs no lock. Publishing never blocks the
//! caller: events are fanned out with try_send and a subscriber that cannot
//! keep up is dropped rather than letting its backlog stall the pool.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// Buffer size for each subscriber's event channel
const EVENT_CHANNEL_SIZE: usize = 16;

/// Events published by the pool, serialized to tagged JSON for subscribers
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum PoolEvent {
    #[serde(rename = "blockFound")]
    BlockFound { hash: String, finder: String },
    #[serde(rename = "blockConfirmed")]
    BlockConfirmed { hash: String, height: u64 },
    #[serde(rename = "blockOrphaned")]
    BlockOrphaned { hash: String },
    #[serde(rename = "paymentSent")]
    PaymentSent {
        address: String,
        amount: u64,
        tx_hash: String,
    },
}

impl PoolEvent {
    /// Block events go to everyone. Payment events go to everyone without a
    /// filter, and to the paid address when a filter is set.
    fn relevant_to(&self, filter: Option<&str>) -> bool {
        match (self, filter) {
            (_, None) => true,
            (PoolEvent::PaymentSent { address, .. }, Some(filter)) => address == filter,
            (_, Some(_)) => true,
        }
    }
}

struct SubscriberChannels {
    event_tx: mpsc::Sender<Arc<String>>,
    /// When set, payment events for other addresses are skipped
    address: Option<String>,
}

enum NotificationCommand {
    Subscribe {
        address: Option<String>,
        response: oneshot::Sender<(u64, mpsc::Receiver<Arc<String>>)>,
    },
    Unsubscribe {
        id: u64,
    },
    Publish {
        event: PoolEvent,
    },
}

/// A handle to interact with the notification actor
#[derive(Clone)]
pub struct NotificationBusHandle {
    cmd_tx: mpsc::Sender<NotificationCommand>,
}

impl NotificationBusHandle {
    /// Register a subscriber, optionally filtered to one address's payment
    /// events. Returns the subscriber id and the event receiver.
    pub async fn subscribe(
        &self,
        address: Option<String>,
    ) -> Option<(u64, mpsc::Receiver<Arc<String>>)> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(NotificationCommand::Subscribe {
                address,
                response: tx,
            })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Drop a subscriber. Fire and forget.
    pub async fn unsubscribe(&self, id: u64) {
        let _ = self
            .cmd_tx
            .send(NotificationCommand::Unsubscribe { id })
            .await;
    }

    /// Publish an event to all interested subscribers. Fire and forget.
    pub async fn publish(&self, event: PoolEvent) {
        let _ = self.cmd_tx.send(NotificationCommand::Publish { event }).await;
    }
}

#[derive(Default)]
struct NotificationBus {
    subscribers: HashMap<u64, SubscriberChannels>,
    next_id: u64,
}

impl NotificationBus {
    fn subscribe(&mut self, address: Option<String>) -> (u64, mpsc::Receiver<Arc<String>>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers
            .insert(id, SubscriberChannels { event_tx, address });
        (id, event_rx)
    }

    fn unsubscribe(&mut self, id: u64) {
        self.subscribers.remove(&id);
    }

    /// Serialize once, fan out with try_send, drop subscribers whose
    /// channels are full or closed.
    fn publish(&mut self, event: PoolEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                error!("Failed to serialize pool event: {}", e);
                return;
            }
        };

        let mut failed_ids = Vec::new();
        for (id, channels) in &self.subscribers {
            if !event.relevant_to(channels.address.as_deref()) {
                continue;
            }
            if channels.event_tx.try_send(payload.clone()).is_err() {
                failed_ids.push(*id);
            }
        }
        for id in failed_ids {
            debug!("Dropping slow notification subscriber {}", id);
            self.unsubscribe(id);
        }
    }
}

/// Spawn the notification actor and return a handle to it
pub fn start_notification_bus() -> NotificationBusHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<NotificationCommand>(32);
    let handle = NotificationBusHandle { cmd_tx };

    let mut bus = NotificationBus::default();

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                NotificationCommand::Subscribe { address, response } => {
                    let (id, event_rx) = bus.subscribe(address);
                    let _ = response.send((id, event_rx));
                }
                NotificationCommand::Unsubscribe { id } => {
                    bus.unsubscribe(id);
                }
                NotificationCommand::Publish { event } => {
                    bus.publish(event);
                }
            }
        }
    });
    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_block_events_reach_all_subscribers() {
        let handle = start_notification_bus();
        let (_id_a, mut rx_a) = handle.subscribe(None).await.unwrap();
        let (_id_b, mut rx_b) = handle.subscribe(Some("addr_b".to_string())).await.unwrap();

        handle
            .publish(PoolEvent::BlockFound {
                hash: "hash1".to_string(),
                finder: "addr_a".to_string(),
            })
            .await;

        let payload = rx_a.recv().await.unwrap();
        assert_eq!(
            *payload,
            r#"{"type":"blockFound","hash":"hash1","finder":"addr_a"}"#
        );
        // Address-filtered subscribers still see block events
        assert!(rx_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_payment_events_respect_address_filter() {
        let handle = start_notification_bus();
        let (_id_a, mut rx_a) = handle.subscribe(Some("addr_a".to_string())).await.unwrap();
        let (_id_b, mut rx_b) = handle.subscribe(Some("addr_b".to_string())).await.unwrap();

        handle
            .publish(PoolEvent::PaymentSent {
                address: "addr_a".to_string(),
                amount: 100,
                tx_hash: "tx1".to_string(),
            })
            .await;
        handle
            .publish(PoolEvent::BlockOrphaned {
                hash: "hash1".to_string(),
            })
            .await;

        let payload = rx_a.recv().await.unwrap();
        assert!(payload.contains("paymentSent"));

        // addr_b skips the payment and receives only the block event
        let payload = rx_b.recv().await.unwrap();
        assert!(payload.contains("blockOrphaned"));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let handle = start_notification_bus();
        let (id, mut rx) = handle.subscribe(None).await.unwrap();
        handle.unsubscribe(id).await;

        handle
            .publish(PoolEvent::BlockConfirmed {
                hash: "hash1".to_string(),
                height: 10,
            })
            .await;

        // Channel closes once the actor drops the subscriber
        assert!(rx.recv().await.is_none());
    }
}
