use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::storage::SnapshotStore;

pub use self::room::DrawingRoom;

mod room;

/// [RoomRegistry] owns every room in the process, keyed by the room slug.
///
/// Rooms are created lazily on their first reference and live for the process
/// lifetime. The registry lock is held across creation and hydration, so two
/// sessions racing for the same unseen slug always end up in the same room.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Arc<Mutex<DrawingRoom>>>>,
    store: Option<Arc<SnapshotStore>>,
}

impl RoomRegistry {
    pub fn new(store: Option<Arc<SnapshotStore>>) -> Self {
        RoomRegistry {
            rooms: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Fetch the room registered under the given slug, creating it if the
    /// slug has never been referenced. A newly created room is hydrated from
    /// the snapshot store when one is configured; a failed load logs a
    /// warning and yields an empty room.
    pub async fn get_or_create(&self, slug: &str) -> Arc<Mutex<DrawingRoom>> {
        let mut rooms = self.rooms.lock().await;

        if let Some(existing) = rooms.get(slug) {
            return Arc::clone(existing);
        }

        let mut created = DrawingRoom::new(slug, self.store.clone());
        if let Some(store) = &self.store {
            match store.load(slug).await {
                Ok(Some(operations)) => {
                    info!(
                        "restored {} operations for room '{}'",
                        operations.len(),
                        slug
                    );
                    created.restore_history(operations);
                }
                Ok(None) => {}
                Err(e) => warn!("could not restore room '{}': {:#}", slug, e),
            }
        }

        let created = Arc::new(Mutex::new(created));
        rooms.insert(String::from(slug), Arc::clone(&created));
        info!("created room '{}'", slug);

        created
    }
}
