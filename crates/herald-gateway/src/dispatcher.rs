use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use herald_types::events::FeedEvent;

/// Fan-out bus for feed events. Every mutation is published here; each
/// connected reader holds its own receiver. Delivery is best-effort,
/// at-most-once per subscriber: there is no backlog and no replay — a
/// reader that falls behind re-fetches a feed page instead.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    tx: broadcast::Sender<FeedEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { tx }),
        }
    }

    /// Subscribe from this point forward. The receiver's lifetime is the
    /// caller's connection lifetime; dropping it unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.tx.subscribe()
    }

    /// Publish to all current subscribers. A send with no subscribers is
    /// not an error.
    pub fn publish(&self, event: FeedEvent) {
        trace!("publishing feed event");
        let _ = self.inner.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_types::events::ReactionDigest;
    use herald_types::models::Reactions;

    #[tokio::test]
    async fn subscribers_receive_events_published_after_joining() {
        let dispatcher = Dispatcher::new();

        // published before anyone subscribes: dropped, not queued
        dispatcher.publish(FeedEvent::Reaction(ReactionDigest {
            id: 1,
            reactions: Reactions::new(),
        }));

        let mut rx = dispatcher.subscribe();
        dispatcher.publish(FeedEvent::Reaction(ReactionDigest {
            id: 2,
            reactions: Reactions::new(),
        }));

        match rx.recv().await.unwrap() {
            FeedEvent::Reaction(digest) => assert_eq!(digest.id, 2),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn each_subscriber_gets_an_independent_feed() {
        let dispatcher = Dispatcher::new();
        let mut a = dispatcher.subscribe();
        let mut b = dispatcher.subscribe();
        assert_eq!(dispatcher.subscriber_count(), 2);

        dispatcher.publish(FeedEvent::Reaction(ReactionDigest {
            id: 9,
            reactions: Reactions::new(),
        }));

        assert!(matches!(a.recv().await.unwrap(), FeedEvent::Reaction(_)));
        assert!(matches!(b.recv().await.unwrap(), FeedEvent::Reaction(_)));
    }
}
