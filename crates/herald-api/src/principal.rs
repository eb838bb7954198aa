use std::collections::HashMap;
use std::sync::Arc;

use herald_store::Store;
use herald_types::models::UserEntry;
use tokio::sync::RwLock;
use tracing::warn;

/// Read-through cache over the persisted privileged-users list, keyed by
/// email. The store stays the source of truth: every write to the list must
/// call `invalidate`, and the next lookup reloads.
#[derive(Default)]
pub struct PrincipalCache {
    entries: RwLock<Option<HashMap<String, UserEntry>>>,
}

impl PrincipalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lookup(&self, store: &Arc<Store>, email: &str) -> Option<UserEntry> {
        if let Some(map) = self.entries.read().await.as_ref() {
            return map.get(email).cloned();
        }

        let store = store.clone();
        let users = match tokio::task::spawn_blocking(move || store.get_users()).await {
            Ok(Ok(users)) => users,
            Ok(Err(err)) => {
                warn!("failed to load users list: {err:#}");
                return None;
            }
            Err(err) => {
                warn!("users list load task failed: {err}");
                return None;
            }
        };

        let map: HashMap<String, UserEntry> = users
            .into_iter()
            .map(|user| (user.email.clone(), user))
            .collect();
        let found = map.get(email).cloned();
        *self.entries.write().await = Some(map);
        found
    }

    pub async fn invalidate(&self) {
        *self.entries.write().await = None;
    }
}
