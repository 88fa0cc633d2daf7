use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PublishableEntities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PublishableEntities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PublishableEntities::LearningPackageId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PublishableEntities::EntityKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PublishableEntities::EntityKind).string().not_null())
                    .col(ColumnDef::new(PublishableEntities::TypeName).string().not_null())
                    .col(ColumnDef::new(PublishableEntities::LocalId).string().not_null())
                    .col(ColumnDef::new(PublishableEntities::Title).string().not_null())
                    .col(ColumnDef::new(PublishableEntities::DraftVersionNum).integer())
                    .col(ColumnDef::new(PublishableEntities::PublishedVersionNum).integer())
                    .col(ColumnDef::new(PublishableEntities::DeletedDraftVersionNum).integer())
                    .col(
                        ColumnDef::new(PublishableEntities::LatestVersionNum)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PublishableEntities::SoftDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PublishableEntities::CreatedBy).integer())
                    .col(ColumnDef::new(PublishableEntities::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(PublishableEntities::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-publishable-entities-package-kind")
                    .table(PublishableEntities::Table)
                    .col(PublishableEntities::LearningPackageId)
                    .col(PublishableEntities::EntityKind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EntityVersions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EntityVersions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EntityVersions::EntityId).integer().not_null())
                    .col(ColumnDef::new(EntityVersions::VersionNum).integer().not_null())
                    .col(ColumnDef::new(EntityVersions::Title).string().not_null())
                    .col(ColumnDef::new(EntityVersions::Olx).text())
                    .col(
                        ColumnDef::new(EntityVersions::Fields)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(EntityVersions::CreatedBy).integer())
                    .col(ColumnDef::new(EntityVersions::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entity-versions-entity-version")
                    .table(EntityVersions::Table)
                    .col(EntityVersions::EntityId)
                    .col(EntityVersions::VersionNum)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContainerChildren::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContainerChildren::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContainerChildren::VersionId).integer().not_null())
                    .col(ColumnDef::new(ContainerChildren::Position).integer().not_null())
                    .col(
                        ColumnDef::new(ContainerChildren::ChildEntityId)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-container-children-version-position")
                    .table(ContainerChildren::Table)
                    .col(ContainerChildren::VersionId)
                    .col(ContainerChildren::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-container-children-child")
                    .table(ContainerChildren::Table)
                    .col(ContainerChildren::ChildEntityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AssetContents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AssetContents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AssetContents::LearningPackageId).integer().not_null())
                    .col(ColumnDef::new(AssetContents::ContentHash).string().not_null())
                    .col(ColumnDef::new(AssetContents::Size).big_integer().not_null())
                    .col(ColumnDef::new(AssetContents::Data).binary().not_null())
                    .col(ColumnDef::new(AssetContents::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-asset-contents-package-hash")
                    .table(AssetContents::Table)
                    .col(AssetContents::LearningPackageId)
                    .col(AssetContents::ContentHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VersionAssets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VersionAssets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VersionAssets::VersionId).integer().not_null())
                    .col(ColumnDef::new(VersionAssets::Path).string().not_null())
                    .col(ColumnDef::new(VersionAssets::ContentId).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-version-assets-version-path")
                    .table(VersionAssets::Table)
                    .col(VersionAssets::VersionId)
                    .col(VersionAssets::Path)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PublishLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PublishLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PublishLogs::LearningPackageId).integer().not_null())
                    .col(ColumnDef::new(PublishLogs::Message).string().not_null().default(""))
                    .col(ColumnDef::new(PublishLogs::PublishedBy).integer())
                    .col(ColumnDef::new(PublishLogs::PublishedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PublishLogRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PublishLogRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PublishLogRecords::PublishLogId).integer().not_null())
                    .col(ColumnDef::new(PublishLogRecords::EntityId).integer().not_null())
                    .col(ColumnDef::new(PublishLogRecords::OldVersionNum).integer())
                    .col(ColumnDef::new(PublishLogRecords::NewVersionNum).integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-publish-log-records-log")
                    .table(PublishLogRecords::Table)
                    .col(PublishLogRecords::PublishLogId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PublishLogRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PublishLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VersionAssets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AssetContents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContainerChildren::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EntityVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PublishableEntities::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum PublishableEntities {
    Table,
    Id,
    LearningPackageId,
    EntityKey,
    EntityKind,
    TypeName,
    LocalId,
    Title,
    DraftVersionNum,
    PublishedVersionNum,
    DeletedDraftVersionNum,
    LatestVersionNum,
    SoftDeleted,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EntityVersions {
    Table,
    Id,
    EntityId,
    VersionNum,
    Title,
    Olx,
    Fields,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ContainerChildren {
    Table,
    Id,
    VersionId,
    Position,
    ChildEntityId,
}

#[derive(DeriveIden)]
enum AssetContents {
    Table,
    Id,
    LearningPackageId,
    ContentHash,
    Size,
    Data,
    CreatedAt,
}

#[derive(DeriveIden)]
enum VersionAssets {
    Table,
    Id,
    VersionId,
    Path,
    ContentId,
}

#[derive(DeriveIden)]
enum PublishLogs {
    Table,
    Id,
    LearningPackageId,
    Message,
    PublishedBy,
    PublishedAt,
}

#[derive(DeriveIden)]
enum PublishLogRecords {
    Table,
    Id,
    PublishLogId,
    EntityId,
    OldVersionNum,
    NewVersionNum,
}
