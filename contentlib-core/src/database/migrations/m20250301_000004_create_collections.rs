use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Collections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Collections::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Collections::LearningPackageId).integer().not_null())
                    .col(ColumnDef::new(Collections::Key).string().not_null())
                    .col(ColumnDef::new(Collections::Title).string().not_null())
                    .col(
                        ColumnDef::new(Collections::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Collections::Enabled).boolean().not_null().default(true))
                    .col(ColumnDef::new(Collections::CreatedBy).integer())
                    .col(ColumnDef::new(Collections::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Collections::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-collections-package-key")
                    .table(Collections::Table)
                    .col(Collections::LearningPackageId)
                    .col(Collections::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CollectionEntities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CollectionEntities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CollectionEntities::CollectionId).integer().not_null())
                    .col(ColumnDef::new(CollectionEntities::EntityId).integer().not_null())
                    .col(ColumnDef::new(CollectionEntities::CreatedBy).integer())
                    .col(ColumnDef::new(CollectionEntities::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-collection-entities-collection-entity")
                    .table(CollectionEntities::Table)
                    .col(CollectionEntities::CollectionId)
                    .col(CollectionEntities::EntityId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CollectionEntities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Collections::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Collections {
    Table,
    Id,
    LearningPackageId,
    Key,
    Title,
    Description,
    Enabled,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CollectionEntities {
    Table,
    Id,
    CollectionId,
    EntityId,
    CreatedBy,
    CreatedAt,
}
