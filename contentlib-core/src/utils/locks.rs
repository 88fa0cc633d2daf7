use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::keys::LibraryKey;

/// Per-library write locks. Every mutating gateway call holds the guard of
/// its library for the whole transaction, which linearizes writes within a
/// library while leaving other libraries and all readers untouched.
#[derive(Clone, Default)]
pub struct LibraryLocks {
    locks: Arc<RwLock<HashMap<LibraryKey, Arc<Mutex<()>>>>>,
}

impl LibraryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, library: &LibraryKey) -> OwnedMutexGuard<()> {
        self.get_or_create(library).await.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn get_or_create(&self, library: &LibraryKey) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(library) {
                return Arc::clone(lock);
            }
        }

        let mut locks = self.locks.write().await;
        Arc::clone(
            locks
                .entry(library.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
