//! Library permission rules.
//!
//! Every rule is expressed once, as a [`LibraryPredicate`] for a given actor
//! and action. The predicate answers single-library checks with
//! [`LibraryPredicate::matches`] and filters listings in SQL with
//! [`LibraryPredicate::to_condition`], so a listing returns exactly the
//! libraries a per-row check would admit without issuing per-row queries.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};

use crate::config::LibraryConfig;
use crate::database::entities::{content_libraries, library_permissions, users};
use crate::errors::{LibraryError, LibraryResult};

/// Who is calling. Anonymous callers never hold grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(Principal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i32,
    pub username: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_course_creator: bool,
    pub group_ids: Vec<i32>,
}

impl Principal {
    pub fn from_user(user: &users::Model, group_ids: Vec<i32>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_course_creator: user.is_course_creator,
            group_ids,
        }
    }
}

impl Actor {
    pub fn user_id(&self) -> Option<i32> {
        match self {
            Actor::User(principal) => Some(principal.id),
            Actor::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User(_))
    }

    fn active_principal(&self) -> Option<&Principal> {
        match self {
            Actor::User(principal) if principal.is_active => Some(principal),
            _ => None,
        }
    }

    pub fn is_global_staff(&self) -> bool {
        self.active_principal().is_some_and(|p| p.is_staff)
    }

    fn name(&self) -> &str {
        match self {
            Actor::User(principal) => &principal.username,
            Actor::Anonymous => "anonymous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Learn,
    Edit,
    Delete,
    ViewTeam,
    EditTeam,
    CreateLibrary,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Learn => "learn",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::ViewTeam => "view_team",
            Action::EditTeam => "edit_team",
            Action::CreateLibrary => "create_library",
        }
    }

    /// Minimum grant that satisfies the action, if grants matter for it.
    fn required_level(&self) -> Option<AccessLevel> {
        match self {
            Action::View | Action::Learn => Some(AccessLevel::Read),
            Action::Edit | Action::ViewTeam => Some(AccessLevel::Author),
            Action::Delete | Action::EditTeam => Some(AccessLevel::Admin),
            Action::CreateLibrary => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Library access level with permission hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Read,
    Author,
    Admin,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Author => "author",
            AccessLevel::Admin => "admin",
        }
    }

    /// Check if this level has the permissions of another level
    pub fn has_permission(&self, required: &AccessLevel) -> bool {
        self >= required
    }
}

impl FromStr for AccessLevel {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(AccessLevel::Read),
            "author" => Ok(AccessLevel::Author),
            "admin" => Ok(AccessLevel::Admin),
            _ => Err(LibraryError::Validation(format!("Invalid access level: {}", s))),
        }
    }
}

/// The set of libraries on which an actor may perform one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryPredicate {
    everything: bool,
    public_read: bool,
    public_learning: bool,
    granted: HashSet<i32>,
}

impl LibraryPredicate {
    pub fn everything() -> Self {
        Self {
            everything: true,
            ..Default::default()
        }
    }

    pub fn nothing() -> Self {
        Self::default()
    }

    pub fn matches(&self, library: &content_libraries::Model) -> bool {
        self.everything
            || self.granted.contains(&library.id)
            || (self.public_read && library.allow_public_read)
            || (self.public_learning && library.allow_public_learning)
    }

    /// SQL form of [`Self::matches`]. `None` means unrestricted.
    pub fn to_condition(&self) -> Option<Condition> {
        if self.everything {
            return None;
        }
        let mut ids: Vec<i32> = self.granted.iter().copied().collect();
        ids.sort_unstable();
        let mut condition = Condition::any().add(content_libraries::Column::Id.is_in(ids));
        if self.public_read {
            condition = condition.add(content_libraries::Column::AllowPublicRead.eq(true));
        }
        if self.public_learning {
            condition = condition.add(content_libraries::Column::AllowPublicLearning.eq(true));
        }
        Some(condition)
    }
}

#[derive(Clone, Debug)]
pub struct PermissionService {
    db: DatabaseConnection,
    public_read_for_authors: bool,
}

impl PermissionService {
    pub fn new(db: DatabaseConnection, config: &LibraryConfig) -> Self {
        Self {
            db,
            public_read_for_authors: config.public_read_for_authors,
        }
    }

    pub fn can_create_library(&self, actor: &Actor) -> bool {
        actor
            .active_principal()
            .is_some_and(|p| p.is_staff || p.is_course_creator)
    }

    pub async fn predicate(
        &self,
        actor: &Actor,
        action: Action,
    ) -> LibraryResult<LibraryPredicate> {
        if actor.is_global_staff() {
            return Ok(LibraryPredicate::everything());
        }
        let Some(required) = action.required_level() else {
            return Ok(if self.can_create_library(actor) {
                LibraryPredicate::everything()
            } else {
                LibraryPredicate::nothing()
            });
        };

        let principal = actor.active_principal();
        let granted = match principal {
            Some(principal) => effective_levels(&self.db, principal.id, &principal.group_ids)
                .await?
                .into_iter()
                .filter(|(_, level)| level.has_permission(&required))
                .map(|(library_id, _)| library_id)
                .collect(),
            None => HashSet::new(),
        };

        let public_read = action == Action::View
            && principal.is_some_and(|p| p.is_course_creator || self.public_read_for_authors);
        let public_learning = action == Action::Learn;

        Ok(LibraryPredicate {
            everything: false,
            public_read,
            public_learning,
            granted,
        })
    }

    pub async fn check(
        &self,
        actor: &Actor,
        action: Action,
        library: &content_libraries::Model,
    ) -> LibraryResult<bool> {
        Ok(self.predicate(actor, action).await?.matches(library))
    }

    /// Fail unless `actor` may perform `action`. Anonymous callers get
    /// `NotFound` so the library's existence does not leak.
    pub async fn ensure(
        &self,
        actor: &Actor,
        action: Action,
        library: &content_libraries::Model,
        library_key: &str,
    ) -> LibraryResult<()> {
        if self.check(actor, action, library).await? {
            return Ok(());
        }
        if actor.is_authenticated() {
            Err(LibraryError::PermissionDenied(format!(
                "{} may not {} {}",
                actor.name(),
                action,
                library_key
            )))
        } else {
            Err(LibraryError::not_found("library", library_key))
        }
    }

    pub fn ensure_can_create_library(&self, actor: &Actor) -> LibraryResult<()> {
        if self.can_create_library(actor) {
            Ok(())
        } else {
            Err(LibraryError::PermissionDenied(format!(
                "{} may not create libraries",
                actor.name()
            )))
        }
    }
}

/// Highest access level per library for a user, counting direct and group grants.
pub async fn effective_levels<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    group_ids: &[i32],
) -> LibraryResult<HashMap<i32, AccessLevel>> {
    let mut condition = Condition::any().add(library_permissions::Column::UserId.eq(user_id));
    if !group_ids.is_empty() {
        condition = condition.add(library_permissions::Column::GroupId.is_in(group_ids.to_vec()));
    }
    let grants = library_permissions::Entity::find()
        .filter(condition)
        .all(conn)
        .await?;

    let mut levels: HashMap<i32, AccessLevel> = HashMap::new();
    for grant in grants {
        let level: AccessLevel = grant.access_level.parse()?;
        levels
            .entry(grant.library_id)
            .and_modify(|current| *current = (*current).max(level))
            .or_insert(level);
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn library(id: i32, public_read: bool, public_learning: bool) -> content_libraries::Model {
        content_libraries::Model {
            id,
            org: "Axim".to_string(),
            slug: format!("lib{}", id),
            library_type: "complex".to_string(),
            learning_package_id: id,
            allow_public_read: public_read,
            allow_public_learning: public_learning,
            allow_lti: false,
            license: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_access_level_hierarchy() {
        assert!(AccessLevel::Admin.has_permission(&AccessLevel::Author));
        assert!(AccessLevel::Author.has_permission(&AccessLevel::Read));
        assert!(!AccessLevel::Read.has_permission(&AccessLevel::Author));
        assert_eq!("ADMIN".parse::<AccessLevel>().unwrap(), AccessLevel::Admin);
        assert!("owner".parse::<AccessLevel>().is_err());
    }

    #[test]
    fn test_predicate_matches() {
        let predicate = LibraryPredicate {
            everything: false,
            public_read: true,
            public_learning: false,
            granted: [2].into_iter().collect(),
        };
        assert!(predicate.matches(&library(1, true, false)));
        assert!(predicate.matches(&library(2, false, false)));
        assert!(!predicate.matches(&library(3, false, true)));

        assert!(LibraryPredicate::everything().matches(&library(9, false, false)));
        assert!(!LibraryPredicate::nothing().matches(&library(9, true, true)));
        assert!(LibraryPredicate::everything().to_condition().is_none());
        assert!(LibraryPredicate::nothing().to_condition().is_some());
    }

    #[test]
    fn test_inactive_staff_is_not_global_staff() {
        let principal = Principal {
            id: 1,
            username: "root".to_string(),
            is_active: false,
            is_staff: true,
            is_course_creator: true,
            group_ids: vec![],
        };
        assert!(!Actor::User(principal.clone()).is_global_staff());
        assert!(Actor::User(Principal {
            is_active: true,
            ..principal
        })
        .is_global_staff());
    }
}
