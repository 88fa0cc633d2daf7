//! Discussion topic links projected from a course's structure.
//!
//! A projection run is a pure function of its inputs and the stored rows:
//! running it twice with the same inputs leaves every row byte-identical,
//! which is what lets event consumers replay or skip runs safely.

use chrono::Utc;
use indexmap::IndexMap;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::LibraryConfig;
use crate::database::entities::{discussion_configs, topic_links};
use crate::errors::{LibraryError, LibraryResult};
use crate::keys::{CourseKey, CourseUsageKey};

pub const DEFAULT_PROVIDER: &str = "legacy";

/// One topic-bearing piece of a course as reported by the course publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicContext {
    /// `None` for general, course-wide topics
    #[serde(default)]
    pub usage_key: Option<CourseUsageKey>,
    #[serde(default)]
    pub external_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub ordering: i32,
    /// Breadcrumb snapshot, e.g. `{"section": .., "subsection": .., "unit": ..}`
    #[serde(default)]
    pub context: Value,
}

impl TopicContext {
    pub fn general(title: impl Into<String>, ordering: i32) -> Self {
        Self {
            usage_key: None,
            external_id: None,
            title: title.into(),
            ordering,
            context: Value::Object(Default::default()),
        }
    }

    pub fn unit(
        usage_key: CourseUsageKey,
        title: impl Into<String>,
        ordering: i32,
        context: Value,
    ) -> Self {
        Self {
            usage_key: Some(usage_key),
            external_id: None,
            title: title.into(),
            ordering,
            context,
        }
    }

    fn match_key(&self) -> String {
        match (&self.usage_key, &self.external_id) {
            (Some(usage_key), _) => format!("usage:{}", usage_key),
            (None, Some(external_id)) => format!("ext:{}", external_id),
            (None, None) => format!("title:{}", self.title),
        }
    }
}

/// Keys under which an existing link may be matched, most specific first.
fn link_match_keys(link: &topic_links::Model) -> Vec<String> {
    match &link.usage_key {
        Some(usage_key) => vec![format!("usage:{}", usage_key)],
        None => vec![
            format!("ext:{}", link.external_id),
            format!("title:{}", link.title),
        ],
    }
}

/// `"{section}|{subsection}|{unit}"` when the snapshot has all three names.
fn breadcrumb_title(context: &str) -> Option<String> {
    let snapshot: Value = serde_json::from_str(context).ok()?;
    let part = |name: &str| snapshot.get(name).and_then(Value::as_str).map(str::to_string);
    Some(format!(
        "{}|{}|{}",
        part("section")?,
        part("subsection")?,
        part("unit")?
    ))
}

/// General topics take 0..N-1 and structural topics start at `reserve`, each
/// group keeping the order the caller supplied.
fn assign_ordering(contexts: &[TopicContext], reserve: i32) -> Vec<i32> {
    let mut general: Vec<usize> = Vec::new();
    let mut structural: Vec<usize> = Vec::new();
    for (index, context) in contexts.iter().enumerate() {
        if context.usage_key.is_some() {
            structural.push(index);
        } else {
            general.push(index);
        }
    }
    general.sort_by_key(|&i| contexts[i].ordering);
    structural.sort_by_key(|&i| contexts[i].ordering);

    let mut assigned = vec![0; contexts.len()];
    for (position, index) in general.into_iter().enumerate() {
        assigned[index] = position as i32;
    }
    for (position, index) in structural.into_iter().enumerate() {
        assigned[index] = reserve + position as i32;
    }
    assigned
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionSummary {
    pub created: usize,
    pub updated: usize,
    pub disabled: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionConfig {
    pub context_key: String,
    pub enabled: bool,
    pub provider_id: String,
    pub provider_type: String,
    pub enable_in_context: bool,
    pub enable_graded_units: bool,
    pub unit_level_visibility: bool,
    pub plugin_configuration: Value,
}

impl TryFrom<discussion_configs::Model> for DiscussionConfig {
    type Error = LibraryError;

    fn try_from(model: discussion_configs::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            plugin_configuration: serde_json::from_str(&model.plugin_configuration)?,
            context_key: model.context_key,
            enabled: model.enabled,
            provider_id: model.provider_id,
            provider_type: model.provider_type,
            enable_in_context: model.enable_in_context,
            enable_graded_units: model.enable_graded_units,
            unit_level_visibility: model.unit_level_visibility,
        })
    }
}

/// Partial update for a course's discussion configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscussionConfigPatch {
    pub enabled: Option<bool>,
    pub provider_id: Option<String>,
    pub provider_type: Option<String>,
    pub enable_in_context: Option<bool>,
    pub enable_graded_units: Option<bool>,
    pub unit_level_visibility: Option<bool>,
    pub plugin_configuration: Option<Value>,
}

fn default_config(course_key: &CourseKey, provider_id: &str) -> discussion_configs::ActiveModel {
    let now = Utc::now();
    discussion_configs::ActiveModel {
        context_key: Set(course_key.to_string()),
        enabled: Set(true),
        provider_id: Set(provider_id.to_string()),
        provider_type: Set(provider_id.to_string()),
        enable_in_context: Set(true),
        enable_graded_units: Set(false),
        unit_level_visibility: Set(true),
        plugin_configuration: Set("{}".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[derive(Clone, Debug)]
pub struct TopicService {
    db: DatabaseConnection,
    general_topic_reserve: i32,
}

impl TopicService {
    pub fn new(db: DatabaseConnection, config: &LibraryConfig) -> Self {
        Self {
            db,
            general_topic_reserve: config.general_topic_reserve,
        }
    }

    /// Reproject the topic links of one course for one provider.
    pub async fn update_course_discussion_config(
        &self,
        course_key: &CourseKey,
        contexts: &[TopicContext],
        provider_id: &str,
    ) -> LibraryResult<ProjectionSummary> {
        let context_key = course_key.to_string();
        let assigned = assign_ordering(contexts, self.general_topic_reserve);
        let mut incoming: IndexMap<String, (&TopicContext, i32)> = IndexMap::new();
        for (context, ordering) in contexts.iter().zip(assigned) {
            incoming.insert(context.match_key(), (context, ordering));
        }

        let txn = self.db.begin().await?;
        let existing = topic_links::Entity::find()
            .filter(topic_links::Column::ContextKey.eq(context_key.as_str()))
            .filter(topic_links::Column::ProviderId.eq(provider_id))
            .order_by_asc(topic_links::Column::Id)
            .all(&txn)
            .await?;

        let mut summary = ProjectionSummary::default();
        for link in existing {
            let matched = link_match_keys(&link)
                .into_iter()
                .find_map(|key| incoming.shift_remove(&key));

            let mut active: topic_links::ActiveModel = link.clone().into();
            let mut changed = false;
            match matched {
                None => {
                    if link.enabled_in_context {
                        active.enabled_in_context = Set(false);
                        summary.disabled += 1;
                        changed = true;
                    }
                    if let Some(title) = breadcrumb_title(&link.context) {
                        if title != link.title {
                            active.title = Set(title);
                            changed = true;
                        }
                    }
                }
                Some((context, ordering)) => {
                    let snapshot = serde_json::to_string(&context.context)?;
                    let external_id = context
                        .external_id
                        .clone()
                        .unwrap_or_else(|| link.external_id.clone());
                    if !link.enabled_in_context
                        || link.ordering != ordering
                        || link.title != context.title
                        || link.external_id != external_id
                        || link.context != snapshot
                    {
                        active.enabled_in_context = Set(true);
                        active.ordering = Set(ordering);
                        active.title = Set(context.title.clone());
                        active.external_id = Set(external_id);
                        active.context = Set(snapshot);
                        summary.updated += 1;
                        changed = true;
                    }
                }
            }
            if changed {
                active.update(&txn).await?;
            }
        }

        for (context, ordering) in incoming.values() {
            topic_links::ActiveModel {
                context_key: Set(context_key.clone()),
                usage_key: Set(context.usage_key.as_ref().map(|k| k.to_string())),
                provider_id: Set(provider_id.to_string()),
                external_id: Set(context
                    .external_id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())),
                title: Set(context.title.clone()),
                ordering: Set(*ordering),
                context: Set(serde_json::to_string(&context.context)?),
                ..topic_links::ActiveModel::new()
            }
            .insert(&txn)
            .await
            .map_err(|e| LibraryError::from_db("create topic link", e))?;
            summary.created += 1;
        }

        let config = discussion_configs::Entity::find_by_id(context_key.clone())
            .one(&txn)
            .await?;
        if config.is_none() {
            default_config(course_key, provider_id).insert(&txn).await?;
        }
        txn.commit().await?;

        info!(
            "Projected topics for {} ({}): {} created, {} updated, {} disabled",
            course_key, provider_id, summary.created, summary.updated, summary.disabled
        );
        Ok(summary)
    }

    pub async fn list_topic_links(
        &self,
        course_key: &CourseKey,
        provider_id: &str,
    ) -> LibraryResult<Vec<topic_links::Model>> {
        Ok(topic_links::Entity::find()
            .filter(topic_links::Column::ContextKey.eq(course_key.to_string()))
            .filter(topic_links::Column::ProviderId.eq(provider_id))
            .order_by_asc(topic_links::Column::Ordering)
            .order_by_asc(topic_links::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_discussion_config(
        &self,
        course_key: &CourseKey,
    ) -> LibraryResult<DiscussionConfig> {
        discussion_configs::Entity::find_by_id(course_key.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| LibraryError::not_found("discussion config", course_key))?
            .try_into()
    }

    /// Apply `patch`, creating the configuration with defaults if the course
    /// has none yet.
    pub async fn update_discussion_config(
        &self,
        course_key: &CourseKey,
        patch: DiscussionConfigPatch,
    ) -> LibraryResult<DiscussionConfig> {
        let txn = self.db.begin().await?;
        let existing = discussion_configs::Entity::find_by_id(course_key.to_string())
            .one(&txn)
            .await?;
        let (mut active, is_new) = match existing {
            Some(model) => (discussion_configs::ActiveModel::from(model), false),
            None => {
                let provider = patch.provider_id.as_deref().unwrap_or(DEFAULT_PROVIDER);
                (default_config(course_key, provider), true)
            }
        };

        if let Some(enabled) = patch.enabled {
            active.enabled = Set(enabled);
        }
        if let Some(provider_id) = patch.provider_id {
            active.provider_id = Set(provider_id);
        }
        if let Some(provider_type) = patch.provider_type {
            active.provider_type = Set(provider_type);
        }
        if let Some(enable_in_context) = patch.enable_in_context {
            active.enable_in_context = Set(enable_in_context);
        }
        if let Some(enable_graded_units) = patch.enable_graded_units {
            active.enable_graded_units = Set(enable_graded_units);
        }
        if let Some(unit_level_visibility) = patch.unit_level_visibility {
            active.unit_level_visibility = Set(unit_level_visibility);
        }
        if let Some(plugin_configuration) = patch.plugin_configuration {
            active.plugin_configuration = Set(serde_json::to_string(&plugin_configuration)?);
        }
        active.updated_at = Set(Utc::now());

        let model = if is_new {
            active.insert(&txn).await?
        } else {
            active.update(&txn).await?
        };
        txn.commit().await?;
        info!("Updated discussion config for {}", course_key);
        model.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use serde_json::json;

    fn course() -> CourseKey {
        "course-v1:Axim+Demo+2025".parse().unwrap()
    }

    fn unit(id: &str, title: &str, ordering: i32) -> TopicContext {
        TopicContext::unit(
            course().make_usage_key("vertical", id).unwrap(),
            title,
            ordering,
            json!({"section": "Week 1", "subsection": "Lesson", "unit": title}),
        )
    }

    async fn service() -> TopicService {
        TopicService::new(setup_test_db().await, &LibraryConfig::default())
    }

    #[test]
    fn test_assign_ordering() {
        let contexts = vec![
            unit("u2", "Two", 2),
            TopicContext::general("General", 5),
            unit("u1", "One", 1),
            TopicContext::general("Announcements", 1),
        ];
        assert_eq!(assign_ordering(&contexts, 100), vec![101, 1, 100, 0]);
    }

    #[test]
    fn test_breadcrumb_title() {
        let ctx = r#"{"section":"S","subsection":"SS","unit":"U"}"#;
        assert_eq!(breadcrumb_title(ctx).as_deref(), Some("S|SS|U"));
        assert_eq!(breadcrumb_title(r#"{"section":"S"}"#), None);
    }

    #[tokio::test]
    async fn test_projection_is_idempotent() {
        let service = service().await;
        let contexts = vec![TopicContext::general("General", 0), unit("u1", "One", 1)];

        let first = service
            .update_course_discussion_config(&course(), &contexts, "openedx")
            .await
            .unwrap();
        assert_eq!(first.created, 2);
        let before = service.list_topic_links(&course(), "openedx").await.unwrap();

        let second = service
            .update_course_discussion_config(&course(), &contexts, "openedx")
            .await
            .unwrap();
        assert_eq!(second, ProjectionSummary::default());
        let after = service.list_topic_links(&course(), "openedx").await.unwrap();
        assert_eq!(before, after);

        let config = service.get_discussion_config(&course()).await.unwrap();
        assert_eq!(config.provider_id, "openedx");
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn test_removed_unit_is_disabled_and_reactivated() {
        let service = service().await;
        service
            .update_course_discussion_config(
                &course(),
                &[unit("u1", "One", 1), unit("u2", "Two", 2)],
                "openedx",
            )
            .await
            .unwrap();
        let original_id = service.list_topic_links(&course(), "openedx").await.unwrap()[1]
            .external_id
            .clone();

        let summary = service
            .update_course_discussion_config(&course(), &[unit("u1", "One", 1)], "openedx")
            .await
            .unwrap();
        assert_eq!(summary.disabled, 1);
        let links = service.list_topic_links(&course(), "openedx").await.unwrap();
        let removed = links.iter().find(|l| l.external_id == original_id).unwrap();
        assert!(!removed.enabled_in_context);
        assert_eq!(removed.title, "Week 1|Lesson|Two");

        service
            .update_course_discussion_config(
                &course(),
                &[unit("u1", "One", 1), unit("u2", "Two", 2)],
                "openedx",
            )
            .await
            .unwrap();
        let links = service.list_topic_links(&course(), "openedx").await.unwrap();
        assert_eq!(links.len(), 2);
        let back = links.iter().find(|l| l.external_id == original_id).unwrap();
        assert!(back.enabled_in_context);
        assert_eq!(back.title, "Two");
    }

    #[tokio::test]
    async fn test_update_discussion_config_creates_and_patches() {
        let service = service().await;
        assert!(service.get_discussion_config(&course()).await.unwrap_err().is_not_found());

        let config = service
            .update_discussion_config(
                &course(),
                DiscussionConfigPatch {
                    enable_graded_units: Some(true),
                    plugin_configuration: Some(json!({"key": "value"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(config.provider_id, DEFAULT_PROVIDER);
        assert!(config.enable_graded_units);
        assert_eq!(config.plugin_configuration["key"], "value");

        let config = service
            .update_discussion_config(
                &course(),
                DiscussionConfigPatch {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!config.enabled);
        assert!(config.enable_graded_units);
    }
}
