pub mod asset_service;
pub mod collection_service;
pub mod container_service;
pub mod entity_store;
pub mod lifecycle;
pub mod permission_service;
pub mod topic_service;
pub mod user_service;

pub use container_service::ChildrenAction;
pub use lifecycle::PublishState;
pub use permission_service::{
    AccessLevel, Action, Actor, LibraryPredicate, PermissionService, Principal,
};
pub use topic_service::{
    DiscussionConfig, DiscussionConfigPatch, ProjectionSummary, TopicContext, TopicService,
};
pub use user_service::{NewUser, UserService};
