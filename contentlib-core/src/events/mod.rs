//! Post-commit event dispatch.
//!
//! The gateway collects events while a transaction is open and hands them to
//! [`EventBus::publish_all`] only after `commit` succeeded. A crash between
//! commit and publish loses the events, so consumers reconcile instead of
//! trusting delivery. Within one entity key events arrive in emission order;
//! across keys there is no ordering.

mod projector;

pub use projector::{spawn_handler, EventHandler, TopicProjector};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::keys::{CollectionKey, ContainerKey, CourseKey, LibraryKey, OpaqueKey, UsageKey};
use crate::services::topic_service::TopicContext;
use crate::utils::EventBroadcaster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LibraryEvent {
    LibraryCreated {
        library_key: LibraryKey,
    },
    LibraryUpdated {
        library_key: LibraryKey,
    },
    LibraryDeleted {
        library_key: LibraryKey,
    },
    ComponentCreated {
        usage_key: UsageKey,
    },
    ComponentUpdated {
        usage_key: UsageKey,
    },
    ComponentDeleted {
        usage_key: UsageKey,
    },
    ComponentPublished {
        usage_key: UsageKey,
    },
    ContainerCreated {
        container_key: ContainerKey,
    },
    /// `background` marks updates caused indirectly, e.g. a child changed.
    ContainerUpdated {
        container_key: ContainerKey,
        background: bool,
    },
    ContainerDeleted {
        container_key: ContainerKey,
    },
    ContainerPublished {
        container_key: ContainerKey,
    },
    CollectionCreated {
        library_key: LibraryKey,
        collection_id: String,
    },
    CollectionUpdated {
        library_key: LibraryKey,
        collection_id: String,
    },
    /// The set of collections an entity belongs to changed.
    EntityCollectionsChanged {
        entity_key: OpaqueKey,
    },
    /// Synthesized by the course publishing collaborator; consumed by the
    /// topic projection.
    CourseDiscussionsChanged {
        course_key: CourseKey,
        provider_id: String,
        contexts: Vec<TopicContext>,
    },
}

impl LibraryEvent {
    pub fn collection_created(key: &CollectionKey) -> Self {
        LibraryEvent::CollectionCreated {
            library_key: key.library_key().clone(),
            collection_id: key.collection_id().to_string(),
        }
    }

    pub fn collection_updated(key: &CollectionKey) -> Self {
        LibraryEvent::CollectionUpdated {
            library_key: key.library_key().clone(),
            collection_id: key.collection_id().to_string(),
        }
    }

    /// `*_updated` event for either kind of entity.
    pub fn entity_updated(key: &OpaqueKey, background: bool) -> Option<Self> {
        match key {
            OpaqueKey::Component(usage_key) => Some(LibraryEvent::ComponentUpdated {
                usage_key: usage_key.clone(),
            }),
            OpaqueKey::Container(container_key) => Some(LibraryEvent::ContainerUpdated {
                container_key: container_key.clone(),
                background,
            }),
            OpaqueKey::Library(_) => None,
        }
    }

    pub fn entity_deleted(key: &OpaqueKey) -> Option<Self> {
        match key {
            OpaqueKey::Component(usage_key) => Some(LibraryEvent::ComponentDeleted {
                usage_key: usage_key.clone(),
            }),
            OpaqueKey::Container(container_key) => Some(LibraryEvent::ContainerDeleted {
                container_key: container_key.clone(),
            }),
            OpaqueKey::Library(_) => None,
        }
    }

    pub fn entity_created(key: &OpaqueKey) -> Option<Self> {
        match key {
            OpaqueKey::Component(usage_key) => Some(LibraryEvent::ComponentCreated {
                usage_key: usage_key.clone(),
            }),
            OpaqueKey::Container(container_key) => Some(LibraryEvent::ContainerCreated {
                container_key: container_key.clone(),
            }),
            OpaqueKey::Library(_) => None,
        }
    }

    pub fn entity_published(key: &OpaqueKey) -> Option<Self> {
        match key {
            OpaqueKey::Component(usage_key) => Some(LibraryEvent::ComponentPublished {
                usage_key: usage_key.clone(),
            }),
            OpaqueKey::Container(container_key) => Some(LibraryEvent::ContainerPublished {
                container_key: container_key.clone(),
            }),
            OpaqueKey::Library(_) => None,
        }
    }

    /// Key of the per-entity channel this event is delivered on.
    pub fn entity_key(&self) -> String {
        match self {
            LibraryEvent::LibraryCreated { library_key }
            | LibraryEvent::LibraryUpdated { library_key }
            | LibraryEvent::LibraryDeleted { library_key } => library_key.to_string(),
            LibraryEvent::ComponentCreated { usage_key }
            | LibraryEvent::ComponentUpdated { usage_key }
            | LibraryEvent::ComponentDeleted { usage_key }
            | LibraryEvent::ComponentPublished { usage_key } => usage_key.to_string(),
            LibraryEvent::ContainerCreated { container_key }
            | LibraryEvent::ContainerUpdated { container_key, .. }
            | LibraryEvent::ContainerDeleted { container_key }
            | LibraryEvent::ContainerPublished { container_key } => container_key.to_string(),
            LibraryEvent::CollectionCreated {
                library_key,
                collection_id,
            }
            | LibraryEvent::CollectionUpdated {
                library_key,
                collection_id,
            } => library_key
                .collection_key(collection_id)
                .map(|key| key.to_string())
                .unwrap_or_else(|_| format!("{}:{}", library_key, collection_id)),
            LibraryEvent::EntityCollectionsChanged { entity_key } => entity_key.to_string(),
            LibraryEvent::CourseDiscussionsChanged { course_key, .. } => course_key.to_string(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            LibraryEvent::LibraryCreated { .. } => "library_created",
            LibraryEvent::LibraryUpdated { .. } => "library_updated",
            LibraryEvent::LibraryDeleted { .. } => "library_deleted",
            LibraryEvent::ComponentCreated { .. } => "component_created",
            LibraryEvent::ComponentUpdated { .. } => "component_updated",
            LibraryEvent::ComponentDeleted { .. } => "component_deleted",
            LibraryEvent::ComponentPublished { .. } => "component_published",
            LibraryEvent::ContainerCreated { .. } => "container_created",
            LibraryEvent::ContainerUpdated { .. } => "container_updated",
            LibraryEvent::ContainerDeleted { .. } => "container_deleted",
            LibraryEvent::ContainerPublished { .. } => "container_published",
            LibraryEvent::CollectionCreated { .. } => "collection_created",
            LibraryEvent::CollectionUpdated { .. } => "collection_updated",
            LibraryEvent::EntityCollectionsChanged { .. } => "entity_collections_changed",
            LibraryEvent::CourseDiscussionsChanged { .. } => "course_discussions_changed",
        }
    }
}

/// In-process event bus: one firehose channel plus one channel per entity key.
#[derive(Clone)]
pub struct EventBus {
    all: broadcast::Sender<LibraryEvent>,
    by_key: EventBroadcaster<String, LibraryEvent>,
}

impl EventBus {
    pub fn new(buffer_size: usize) -> Self {
        let (all, _) = broadcast::channel(buffer_size);
        Self {
            all,
            by_key: EventBroadcaster::new(buffer_size),
        }
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<LibraryEvent> {
        self.all.subscribe()
    }

    pub async fn subscribe(
        &self,
        entity_key: impl Into<String>,
    ) -> broadcast::Receiver<LibraryEvent> {
        self.by_key.subscribe(entity_key.into()).await
    }

    pub async fn publish(&self, event: LibraryEvent) {
        let key = event.entity_key();
        debug!("Emitting {} for {}", event.event_type(), key);
        self.by_key.publish(&key, event.clone()).await;
        // no subscribers is fine
        let _ = self.all.send(event);
    }

    pub async fn publish_all(&self, events: Vec<LibraryEvent>) {
        for event in events {
            self.publish(event).await;
        }
    }

    /// Drop per-key channels nobody listens to anymore.
    pub async fn cleanup_idle(&self) -> usize {
        self.by_key.cleanup_idle().await
    }
}
