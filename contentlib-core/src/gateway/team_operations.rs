use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::info;

use super::{LibraryGateway, TeamGrant};
use crate::database::entities::{library_permissions, user_groups, users};
use crate::errors::{LibraryError, LibraryResult};
use crate::keys::LibraryKey;
use crate::services::{AccessLevel, Action, Actor};

/// Who a grant row is for.
#[derive(Debug, Clone, Copy)]
enum Grantee {
    User(i32),
    Group(i32),
}

impl Grantee {
    fn column(&self) -> (library_permissions::Column, i32) {
        match *self {
            Grantee::User(id) => (library_permissions::Column::UserId, id),
            Grantee::Group(id) => (library_permissions::Column::GroupId, id),
        }
    }
}

async fn find_grant<C: ConnectionTrait>(
    conn: &C,
    library_id: i32,
    grantee: Grantee,
) -> LibraryResult<Option<library_permissions::Model>> {
    let (column, id) = grantee.column();
    Ok(library_permissions::Entity::find()
        .filter(library_permissions::Column::LibraryId.eq(library_id))
        .filter(column.eq(id))
        .one(conn)
        .await?)
}

async fn admin_user_count<C: ConnectionTrait>(conn: &C, library_id: i32) -> LibraryResult<u64> {
    Ok(library_permissions::Entity::find()
        .filter(library_permissions::Column::LibraryId.eq(library_id))
        .filter(library_permissions::Column::UserId.is_not_null())
        .filter(library_permissions::Column::AccessLevel.eq(AccessLevel::Admin.as_str()))
        .count(conn)
        .await?)
}

/// Insert, change or drop one grant. Returns whether anything changed.
async fn write_grant<C: ConnectionTrait>(
    conn: &C,
    library_id: i32,
    grantee: Grantee,
    level: Option<AccessLevel>,
) -> LibraryResult<bool> {
    let existing = find_grant(conn, library_id, grantee).await?;
    match (existing, level) {
        (None, None) => Ok(false),
        (Some(grant), None) => {
            library_permissions::Entity::delete_by_id(grant.id).exec(conn).await?;
            Ok(true)
        }
        (Some(grant), Some(level)) if grant.access_level == level.as_str() => Ok(false),
        (Some(grant), Some(level)) => {
            let mut active: library_permissions::ActiveModel = grant.into();
            active.access_level = Set(level.as_str().to_string());
            active.update(conn).await?;
            Ok(true)
        }
        (None, Some(level)) => {
            let (user_id, group_id) = match grantee {
                Grantee::User(id) => (Some(id), None),
                Grantee::Group(id) => (None, Some(id)),
            };
            library_permissions::ActiveModel {
                library_id: Set(library_id),
                user_id: Set(user_id),
                group_id: Set(group_id),
                access_level: Set(level.as_str().to_string()),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(conn)
            .await?;
            Ok(true)
        }
    }
}

impl LibraryGateway {
    // ----- Team helpers ----------------------------------------------------

    /// Every grant on the library: users sorted by username, then groups by name.
    pub async fn get_library_team(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
    ) -> LibraryResult<Vec<TeamGrant>> {
        let record = self.authorize(actor, Action::ViewTeam, library_key, true).await?;
        let grants = library_permissions::Entity::find()
            .filter(library_permissions::Column::LibraryId.eq(record.library.id))
            .all(&self.db)
            .await?;

        let user_ids: Vec<i32> = grants.iter().filter_map(|g| g.user_id).collect();
        let group_ids: Vec<i32> = grants.iter().filter_map(|g| g.group_id).collect();
        let usernames: HashMap<i32, String> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            users::Entity::find()
                .filter(users::Column::Id.is_in(user_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|user| (user.id, user.username))
                .collect()
        };
        let group_names: HashMap<i32, String> = if group_ids.is_empty() {
            HashMap::new()
        } else {
            user_groups::Entity::find()
                .filter(user_groups::Column::Id.is_in(group_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|group| (group.id, group.name))
                .collect()
        };

        let mut team = Vec::with_capacity(grants.len());
        for grant in grants {
            let access_level: AccessLevel = grant.access_level.parse()?;
            let username = grant.user_id.and_then(|id| usernames.get(&id).cloned());
            let group_name = grant.group_id.and_then(|id| group_names.get(&id).cloned());
            if username.is_none() && group_name.is_none() {
                continue;
            }
            team.push(TeamGrant {
                username,
                group_name,
                access_level,
            });
        }
        team.sort_by(|a, b| {
            (a.username.is_none(), &a.username, &a.group_name).cmp(&(
                b.username.is_none(),
                &b.username,
                &b.group_name,
            ))
        });
        Ok(team)
    }

    /// The direct grant of one user, if any. Group grants are not included.
    pub async fn get_library_user_permissions(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        username: &str,
    ) -> LibraryResult<Option<TeamGrant>> {
        let record = self.authorize(actor, Action::ViewTeam, library_key, true).await?;
        let user = self.users.get_by_username(username).await?;
        let grant = find_grant(&self.db, record.library.id, Grantee::User(user.id)).await?;
        grant
            .map(|grant| {
                Ok(TeamGrant {
                    username: Some(user.username.clone()),
                    group_name: None,
                    access_level: grant.access_level.parse()?,
                })
            })
            .transpose()
    }

    /// Grant, change or with `None` revoke a user's access. The last admin
    /// user of a library cannot be removed or downgraded.
    pub async fn set_library_user_permissions(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        username: &str,
        level: Option<AccessLevel>,
    ) -> LibraryResult<()> {
        let record = self.authorize(actor, Action::EditTeam, library_key, false).await?;
        let user = self.users.get_by_username(username).await?;
        let library_id = record.library.id;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let existing = find_grant(&txn, library_id, Grantee::User(user.id)).await?;
        let was_admin = existing
            .as_ref()
            .is_some_and(|grant| grant.access_level == AccessLevel::Admin.as_str());
        if was_admin
            && level != Some(AccessLevel::Admin)
            && admin_user_count(&txn, library_id).await? <= 1
        {
            return Err(LibraryError::Validation(format!(
                "{} is the only admin of {}",
                username, library_key
            )));
        }
        let changed = write_grant(&txn, library_id, Grantee::User(user.id), level).await?;
        txn.commit().await?;

        if changed {
            info!(
                "Set {} access on {} to {}",
                username,
                library_key,
                level.map_or("none", |level| level.as_str())
            );
        }
        Ok(())
    }

    pub async fn set_library_group_permissions(
        &self,
        actor: &Actor,
        library_key: &LibraryKey,
        group_name: &str,
        level: Option<AccessLevel>,
    ) -> LibraryResult<()> {
        let record = self.authorize(actor, Action::EditTeam, library_key, false).await?;
        let group = self
            .users
            .find_group(group_name)
            .await?
            .ok_or_else(|| LibraryError::not_found("group", group_name))?;

        let _guard = self.locks.acquire(library_key).await;
        let txn = self.db.begin().await?;
        let changed = write_grant(&txn, record.library.id, Grantee::Group(group.id), level).await?;
        txn.commit().await?;

        if changed {
            info!(
                "Set group {} access on {} to {}",
                group_name,
                library_key,
                level.map_or("none", |level| level.as_str())
            );
        }
        Ok(())
    }
}
