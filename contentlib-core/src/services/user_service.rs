use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::{info, warn};

use crate::database::entities::{group_memberships, user_groups, users};
use crate::errors::{LibraryError, LibraryResult};
use crate::services::permission_service::{Actor, Principal};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_course_creator: bool,
}

impl NewUser {
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            email: format!("{}@example.com", username),
            username,
            is_staff: false,
            is_course_creator: false,
        }
    }

    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    pub fn course_creator(mut self) -> Self {
        self.is_course_creator = true;
        self
    }
}

/// Minimal principal store: users, groups and group membership.
#[derive(Clone, Debug)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_user(&self, new_user: NewUser) -> LibraryResult<users::Model> {
        let user = users::ActiveModel {
            username: Set(new_user.username.clone()),
            email: Set(new_user.email),
            is_staff: Set(new_user.is_staff),
            is_course_creator: Set(new_user.is_course_creator),
            ..users::ActiveModel::new()
        }
        .insert(&self.db)
        .await
        .map_err(|e| LibraryError::from_db("create user", e))?;

        info!("Created user {}", user.username);
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> LibraryResult<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    pub async fn get_by_username(&self, username: &str) -> LibraryResult<users::Model> {
        self.find_by_username(username)
            .await?
            .ok_or_else(|| LibraryError::not_found("user", username))
    }

    pub async fn set_active(&self, username: &str, is_active: bool) -> LibraryResult<users::Model> {
        let user = self.get_by_username(username).await?;
        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    pub async fn create_group(&self, name: &str) -> LibraryResult<user_groups::Model> {
        let group = user_groups::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| LibraryError::from_db("create group", e))?;
        Ok(group)
    }

    pub async fn find_group(&self, name: &str) -> LibraryResult<Option<user_groups::Model>> {
        Ok(user_groups::Entity::find()
            .filter(user_groups::Column::Name.eq(name))
            .one(&self.db)
            .await?)
    }

    pub async fn add_group_member(&self, group_name: &str, username: &str) -> LibraryResult<()> {
        let group = self
            .find_group(group_name)
            .await?
            .ok_or_else(|| LibraryError::not_found("group", group_name))?;
        let user = self.get_by_username(username).await?;

        group_memberships::ActiveModel {
            group_id: Set(group.id),
            user_id: Set(user.id),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| LibraryError::from_db("add group member", e))?;
        Ok(())
    }

    pub async fn group_ids_for(&self, user_id: i32) -> LibraryResult<Vec<i32>> {
        let memberships = group_memberships::Entity::find()
            .filter(group_memberships::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;
        Ok(memberships.into_iter().map(|m| m.group_id).collect())
    }

    /// Build the acting principal for a request. Unknown usernames act as
    /// anonymous callers.
    pub async fn resolve_actor(&self, username: Option<&str>) -> LibraryResult<Actor> {
        let Some(username) = username else {
            return Ok(Actor::Anonymous);
        };
        match self.find_by_username(username).await? {
            Some(user) => {
                let group_ids = self.group_ids_for(user.id).await?;
                Ok(Actor::User(Principal::from_user(&user, group_ids)))
            }
            None => {
                warn!("Unknown user '{}' treated as anonymous", username);
                Ok(Actor::Anonymous)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_resolve_actor_with_groups() {
        let service = UserService::new(setup_test_db().await);
        service.create_user(NewUser::new("ana").course_creator()).await.unwrap();
        service.create_group("authors").await.unwrap();
        service.add_group_member("authors", "ana").await.unwrap();

        let actor = service.resolve_actor(Some("ana")).await.unwrap();
        let Actor::User(principal) = actor else {
            panic!("expected a user");
        };
        assert_eq!(principal.username, "ana");
        assert!(principal.is_course_creator);
        assert_eq!(principal.group_ids.len(), 1);

        assert_eq!(service.resolve_actor(None).await.unwrap(), Actor::Anonymous);
        assert_eq!(service.resolve_actor(Some("ghost")).await.unwrap(), Actor::Anonymous);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_already_exists() {
        let service = UserService::new(setup_test_db().await);
        service.create_user(NewUser::new("ana")).await.unwrap();
        let err = service.create_user(NewUser::new("ana")).await.unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_EXISTS");
    }
}
