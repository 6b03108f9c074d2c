use serde::Serialize;
use tokio::sync::broadcast;

/// Mirrors the datastore notification event types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change on a named table, published after the mutation has
/// committed. Consumers fold events into local state as a convenience; the
/// store stays authoritative and dropping events is always safe.
#[derive(Clone, Debug, Serialize)]
pub struct ChangeEvent {
    pub table: &'static str,
    pub event: ChangeKind,
    pub row: serde_json::Value,
}

#[derive(Clone, Debug)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget. A send with no live subscribers is not an error,
    /// and a row that fails to serialize is logged and dropped.
    pub fn publish(&self, table: &'static str, event: ChangeKind, row: &impl Serialize) {
        let row = match serde_json::to_value(row) {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(table, %err, "dropping unserializable change event");
                return;
            }
        };
        let _ = self.tx.send(ChangeEvent { table, event, row });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();

        feed.publish("tasks", ChangeKind::Insert, &serde_json::json!({"id": 1}));
        feed.publish("tasks", ChangeKind::Update, &serde_json::json!({"id": 1}));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.table, "tasks");
        assert_eq!(first.event, ChangeKind::Insert);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.event, ChangeKind::Update);
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let feed = ChangeFeed::new(8);
        feed.publish("tasks", ChangeKind::Delete, &serde_json::json!({"id": 2}));
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let feed = ChangeFeed::new(8);
        feed.publish("tasks", ChangeKind::Insert, &serde_json::json!({"id": 1}));

        let mut rx = feed.subscribe();
        feed.publish("tasks", ChangeKind::Delete, &serde_json::json!({"id": 1}));

        let only = rx.recv().await.unwrap();
        assert_eq!(only.event, ChangeKind::Delete);
    }
}
