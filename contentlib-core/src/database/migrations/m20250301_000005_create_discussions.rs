use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TopicLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TopicLinks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TopicLinks::ContextKey).string().not_null())
                    .col(ColumnDef::new(TopicLinks::UsageKey).string())
                    .col(ColumnDef::new(TopicLinks::ProviderId).string().not_null())
                    .col(ColumnDef::new(TopicLinks::ExternalId).string().not_null())
                    .col(ColumnDef::new(TopicLinks::Title).string().not_null())
                    .col(ColumnDef::new(TopicLinks::Ordering).integer().not_null())
                    .col(
                        ColumnDef::new(TopicLinks::EnabledInContext)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(TopicLinks::Context).text().not_null().default("{}"))
                    .col(ColumnDef::new(TopicLinks::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-topic-links-context-usage-provider")
                    .table(TopicLinks::Table)
                    .col(TopicLinks::ContextKey)
                    .col(TopicLinks::UsageKey)
                    .col(TopicLinks::ProviderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DiscussionConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiscussionConfigs::ContextKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DiscussionConfigs::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(DiscussionConfigs::ProviderId).string().not_null())
                    .col(ColumnDef::new(DiscussionConfigs::ProviderType).string().not_null())
                    .col(
                        ColumnDef::new(DiscussionConfigs::EnableInContext)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DiscussionConfigs::EnableGradedUnits)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(DiscussionConfigs::UnitLevelVisibility)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DiscussionConfigs::PluginConfiguration)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(DiscussionConfigs::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(DiscussionConfigs::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DiscussionConfigs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TopicLinks::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum TopicLinks {
    Table,
    Id,
    ContextKey,
    UsageKey,
    ProviderId,
    ExternalId,
    Title,
    Ordering,
    EnabledInContext,
    Context,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DiscussionConfigs {
    Table,
    ContextKey,
    Enabled,
    ProviderId,
    ProviderType,
    EnableInContext,
    EnableGradedUnits,
    UnitLevelVisibility,
    PluginConfiguration,
    CreatedAt,
    UpdatedAt,
}
