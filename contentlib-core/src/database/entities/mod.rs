pub mod asset_contents;
pub mod collection_entities;
pub mod collections;
pub mod container_children;
pub mod content_libraries;
pub mod discussion_configs;
pub mod entity_versions;
pub mod group_memberships;
pub mod learning_packages;
pub mod library_permissions;
pub mod publish_log_records;
pub mod publish_logs;
pub mod publishable_entities;
pub mod topic_links;
pub mod user_groups;
pub mod users;
pub mod version_assets;
