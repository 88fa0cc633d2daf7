pub mod event_broadcaster;
pub mod locks;

pub use event_broadcaster::EventBroadcaster;
pub use locks::LibraryLocks;
