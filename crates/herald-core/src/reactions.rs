use std::sync::Arc;

use herald_gateway::Dispatcher;
use herald_store::Store;
use herald_types::config::ConfigHandle;
use herald_types::events::{FeedEvent, ReactionDigest};
use herald_types::models::Reactions;

use crate::error::{CoreError, Result};
use crate::run_blocking;

/// Reaction toggling and aggregation. The toggle-and-recompute sequence is
/// one atomic store operation; concurrent reactors on the same message
/// serialize there, never in this process.
pub struct ReactionEngine {
    store: Arc<Store>,
    config: ConfigHandle,
    dispatcher: Dispatcher,
}

impl ReactionEngine {
    pub fn new(store: Arc<Store>, config: ConfigHandle, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            config,
            dispatcher,
        }
    }

    pub async fn set_reaction(
        &self,
        message_id: i64,
        emoji: String,
        user_id: String,
    ) -> Result<Reactions> {
        let config = self.config.current();

        if message_id <= 0 {
            return Err(CoreError::InvalidInput("invalid message id".into()));
        }
        if !config.is_allowed_emoji(&emoji) {
            return Err(CoreError::InvalidInput(
                "emoji is not in the allowed set".into(),
            ));
        }

        let store = self.store.clone();
        let aggregate = run_blocking(move || store.toggle_reaction(message_id, &user_id, &emoji))
            .await?
            .ok_or(CoreError::NotFound)?;

        // reaction events carry only the ID and the new aggregate
        self.dispatcher.publish(FeedEvent::Reaction(ReactionDigest {
            id: message_id,
            reactions: aggregate.clone(),
        }));

        Ok(aggregate)
    }
}
