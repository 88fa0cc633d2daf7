use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Keyed fan-out over tokio broadcast channels.
///
/// Channels are created lazily on first subscribe or publish and can be
/// reclaimed with [`EventBroadcaster::cleanup_idle`] once every receiver is
/// gone. Each key has its own channel, so ordering holds per key only.
pub struct EventBroadcaster<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    channels: Arc<RwLock<HashMap<K, broadcast::Sender<V>>>>,
    buffer_size: usize,
}

impl<K, V> EventBroadcaster<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            buffer_size,
        }
    }

    pub async fn subscribe(&self, key: K) -> broadcast::Receiver<V> {
        self.get_or_create(key).await.subscribe()
    }

    /// Publish to the subscribers of `key`. Only keys somebody subscribed to
    /// get a channel; publishing to an unknown key is a cheap no-op.
    pub async fn publish(&self, key: &K, event: V) -> usize {
        let channels = self.channels.read().await;
        match channels.get(key) {
            // send fails only when there are no receivers left
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    pub async fn receiver_count(&self, key: &K) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(key)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Remove all channels with no active receivers. Returns how many were dropped.
    pub async fn cleanup_idle(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Double-checked: read lock on the fast path, write lock only to insert.
    async fn get_or_create(&self, key: K) -> broadcast::Sender<V> {
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(&key) {
                return sender.clone();
            }
        }

        let mut channels = self.channels.write().await;
        if let Some(sender) = channels.get(&key) {
            sender.clone()
        } else {
            let (sender, _) = broadcast::channel(self.buffer_size);
            channels.insert(key, sender.clone());
            sender
        }
    }
}

impl<K, V> Clone for EventBroadcaster<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
            buffer_size: self.buffer_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let broadcaster = EventBroadcaster::<String, u32>::new(10);
        let mut receiver = broadcaster.subscribe("lb:Axim:Demo:html:a".to_string()).await;

        let delivered = broadcaster.publish(&"lb:Axim:Demo:html:a".to_string(), 7).await;
        assert_eq!(delivered, 1);
        assert_eq!(receiver.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_publish_without_channel_is_noop() {
        let broadcaster = EventBroadcaster::<String, u32>::new(10);
        assert_eq!(broadcaster.publish(&"nobody".to_string(), 1).await, 0);
        assert_eq!(broadcaster.channel_count().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_idle() {
        let broadcaster = EventBroadcaster::<i32, String>::new(10);
        {
            let _receiver = broadcaster.subscribe(1).await;
            assert_eq!(broadcaster.receiver_count(&1).await, 1);
        }
        assert_eq!(broadcaster.receiver_count(&1).await, 0);
        assert_eq!(broadcaster.cleanup_idle().await, 1);
        assert_eq!(broadcaster.channel_count().await, 0);
    }

    #[tokio::test]
    async fn test_per_key_ordering() {
        let broadcaster = EventBroadcaster::<i32, i32>::new(16);
        let mut receiver = broadcaster.subscribe(1).await;
        for i in 0..5 {
            broadcaster.publish(&1, i).await;
            broadcaster.publish(&2, i).await;
        }
        for i in 0..5 {
            assert_eq!(receiver.recv().await.unwrap(), i);
        }
    }
}
