// ABOUTME: In-process publish/subscribe channel for data-changed notices.
// ABOUTME: Delivery is fire-and-forget: no subscribers or lagging subscribers never fail a write.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// The only signal observers receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    DataChanged,
}

/// A signal that committed data changed, carrying no payload beyond the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Unix milliseconds at publish time.
    pub timestamp: i64,
}

/// Broadcasts change notices to any number of subscribers.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeNotice>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new observer. It sees notices published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.tx.subscribe()
    }

    /// Publish a notice, returning how many observers were listening.
    pub fn publish(&self, kind: ChangeKind) -> usize {
        let notice = ChangeNotice {
            kind,
            timestamp: Utc::now().timestamp_millis(),
        };
        // No active subscribers is fine
        self.tx.send(notice).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_serializes_with_type_tag() {
        let notice = ChangeNotice {
            kind: ChangeKind::DataChanged,
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["type"], "DATA_CHANGED");
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let notifier = ChangeNotifier::default();
        assert_eq!(notifier.publish(ChangeKind::DataChanged), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_notice() {
        let notifier = ChangeNotifier::default();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        assert_eq!(notifier.publish(ChangeKind::DataChanged), 2);

        assert_eq!(a.recv().await.unwrap().kind, ChangeKind::DataChanged);
        assert_eq!(b.recv().await.unwrap().kind, ChangeKind::DataChanged);
    }
}
