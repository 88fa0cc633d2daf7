use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};

use crate::database::entities::publishable_entities;
use crate::errors::{LibraryError, LibraryResult};
use crate::keys::{ContainerKey, ContainerType, OpaqueKey};
use crate::services::entity_store;

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildrenAction {
    Append,
    Remove,
    /// Adopt the supplied list verbatim; also the reorder primitive
    Replace,
}

/// Check that every key may be a child of `container`: same library and
/// exactly one rank lower. Returns the live child rows in the given order.
pub async fn resolve_children<C: ConnectionTrait>(
    conn: &C,
    container: &ContainerKey,
    child_keys: &[OpaqueKey],
) -> LibraryResult<Vec<publishable_entities::Model>> {
    let expected = container.container_type().child_type();
    for key in child_keys {
        if key.library_key() != container.library_key() {
            return Err(LibraryError::InvalidScope(format!(
                "{} belongs to a different library than {}",
                key, container
            )));
        }
        let compatible = match (key, expected) {
            (OpaqueKey::Component(_), None) => true,
            (OpaqueKey::Container(child), Some(child_type)) => child.container_type() == child_type,
            _ => false,
        };
        if !compatible {
            return Err(LibraryError::IncompatibleTypes(format!(
                "{} cannot contain {}; expected {}",
                container.container_type(),
                key,
                expected.map(|t| t.as_str()).unwrap_or("components")
            )));
        }
    }

    let mut children = Vec::with_capacity(child_keys.len());
    for key in child_keys {
        children.push(entity_store::get_live_entity(conn, key).await?);
    }
    Ok(children)
}

pub fn apply_action(current: &[i32], action: ChildrenAction, ids: &[i32]) -> Vec<i32> {
    match action {
        ChildrenAction::Append => current.iter().chain(ids.iter()).copied().collect(),
        ChildrenAction::Remove => current
            .iter()
            .copied()
            .filter(|id| !ids.contains(id))
            .collect(),
        ChildrenAction::Replace => ids.to_vec(),
    }
}

/// Children of a container as seen in the draft or published view, each with
/// the version that view shows. Children without a version in that view are
/// left out.
pub async fn children_view<C: ConnectionTrait>(
    conn: &C,
    container: &publishable_entities::Model,
    published: bool,
) -> LibraryResult<Vec<(publishable_entities::Model, i32)>> {
    let pointer = if published {
        container.published_version_num
    } else {
        container.draft_version_num
    };
    let Some(version_num) = pointer else {
        return Ok(Vec::new());
    };
    let version = entity_store::load_version(conn, container.id, version_num).await?;
    let ids = entity_store::children_ids(conn, version.id).await?;
    let by_id = entity_store::entities_by_ids(conn, &ids).await?;

    let mut view = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(child) = by_id.get(&id) else {
            continue;
        };
        let child_pointer = if published {
            child.published_version_num
        } else {
            child.draft_version_num
        };
        if let Some(child_version) = child_pointer {
            view.push((child.clone(), child_version));
        }
    }
    Ok(view)
}

/// Local id for a container created without one: slugified title plus a
/// short random suffix.
pub fn generate_local_id(container_type: ContainerType, title: &str) -> String {
    let lowered = title.to_lowercase();
    let slug = NON_SLUG_RE.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    if slug.is_empty() {
        format!("{}-{}", container_type.as_str(), suffix)
    } else {
        format!("{}-{}", slug, suffix)
    }
}
