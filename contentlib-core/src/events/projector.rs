use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{EventBus, LibraryEvent};
use crate::errors::LibraryResult;
use crate::services::TopicService;

/// Consumer of bus events. Handlers must tolerate replays and gaps.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &LibraryEvent) -> LibraryResult<()>;
}

/// Drive `handler` from the firehose until the bus is dropped.
pub fn spawn_handler<H: EventHandler>(bus: &EventBus, handler: H) -> JoinHandle<()> {
    let mut receiver = bus.subscribe_all();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = handler.handle(&event).await {
                        error!("{} failed on {}: {}", handler.name(), event.event_type(), e);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(
                        "{} lagged and missed {} events; relying on reconciliation",
                        handler.name(),
                        missed
                    );
                }
                Err(RecvError::Closed) => {
                    debug!("{} stopping, event bus closed", handler.name());
                    break;
                }
            }
        }
    })
}

/// Applies `course_discussions_changed` events to the topic projection.
#[derive(Clone)]
pub struct TopicProjector {
    topics: TopicService,
}

impl TopicProjector {
    pub fn new(topics: TopicService) -> Self {
        Self { topics }
    }

    pub fn spawn(bus: &EventBus, topics: TopicService) -> JoinHandle<()> {
        spawn_handler(bus, Self::new(topics))
    }
}

#[async_trait]
impl EventHandler for TopicProjector {
    fn name(&self) -> &'static str {
        "topic-projector"
    }

    async fn handle(&self, event: &LibraryEvent) -> LibraryResult<()> {
        if let LibraryEvent::CourseDiscussionsChanged {
            course_key,
            provider_id,
            contexts,
        } = event
        {
            self.topics
                .update_course_discussion_config(course_key, contexts, provider_id)
                .await?;
        }
        Ok(())
    }
}
