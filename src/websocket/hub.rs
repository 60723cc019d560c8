use dashmap::DashMap;
use serde::Serialize;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;

pub type WsSender = mpsc::UnboundedSender<Arc<str>>;

/// Live delivery channel for notifications, keyed by recipient.
///
/// Delivery is best effort: a recipient without an open socket simply reads
/// the stored notification later.
#[derive(Clone)]
pub struct NotificationHub {
    connections: Arc<DashMap<i32, Vec<(u64, WsSender)>>>,
    next_conn_id: Arc<AtomicU64>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Envelope pushed over the socket.
#[derive(Serialize)]
struct HubEvent<'a, T: Serialize> {
    #[serde(rename = "type")]
    event_type: &'static str,
    data: &'a T,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            next_conn_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self, user_id: i32) -> (u64, mpsc::UnboundedReceiver<Arc<str>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.register(user_id, tx), rx)
    }

    /// Subscribe with `data` queued as the first event of this connection
    /// only. The user's other sockets do not see it.
    pub fn subscribe_with<T: Serialize>(
        &self,
        user_id: i32,
        event_type: &'static str,
        data: &T,
    ) -> (u64, mpsc::UnboundedReceiver<Arc<str>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(message) = encode(event_type, data) {
            // The receiver is alive, so this cannot fail.
            let _ = tx.send(message);
        }
        (self.register(user_id, tx), rx)
    }

    fn register(&self, user_id: i32, tx: WsSender) -> u64 {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .entry(user_id)
            .or_default()
            .push((conn_id, tx));
        conn_id
    }

    pub fn unsubscribe(&self, user_id: i32, conn_id: u64) {
        if let Some(mut senders) = self.connections.get_mut(&user_id) {
            senders.retain(|(id, _)| *id != conn_id);
            if senders.is_empty() {
                drop(senders);
                self.connections.remove(&user_id);
            }
        }
    }

    pub fn is_connected(&self, user_id: i32) -> bool {
        self.connections.contains_key(&user_id)
    }

    /// Serialize `data` once and push it to every socket of `user_id`.
    /// Returns how many sockets accepted the message.
    pub fn publish<T: Serialize>(&self, user_id: i32, event_type: &'static str, data: &T) -> usize {
        let Some(mut senders) = self.connections.get_mut(&user_id) else {
            return 0;
        };

        let Some(message) = encode(event_type, data) else {
            return 0;
        };

        // Closed channels are dropped while sending.
        senders.retain(|(_, sender)| sender.send(message.clone()).is_ok());
        let delivered = senders.len();
        if senders.is_empty() {
            drop(senders);
            self.connections.remove(&user_id);
        }
        delivered
    }
}

fn encode<T: Serialize>(event_type: &'static str, data: &T) -> Option<Arc<str>> {
    match serde_json::to_string(&HubEvent { event_type, data }) {
        Ok(json) => Some(json.into()),
        Err(e) => {
            tracing::warn!("Failed to serialize {} event: {}", event_type, e);
            None
        }
    }
}
