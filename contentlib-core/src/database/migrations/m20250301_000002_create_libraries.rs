use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LearningPackages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LearningPackages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LearningPackages::Key).string().not_null().unique_key())
                    .col(ColumnDef::new(LearningPackages::Title).string().not_null())
                    .col(
                        ColumnDef::new(LearningPackages::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(LearningPackages::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(LearningPackages::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(LearningPackages::DeletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContentLibraries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContentLibraries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContentLibraries::Org).string().not_null())
                    .col(ColumnDef::new(ContentLibraries::Slug).string().not_null())
                    .col(
                        ColumnDef::new(ContentLibraries::LibraryType)
                            .string()
                            .not_null()
                            .default("complex"),
                    )
                    .col(
                        ColumnDef::new(ContentLibraries::LearningPackageId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContentLibraries::AllowPublicRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ContentLibraries::AllowPublicLearning)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ContentLibraries::AllowLti)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ContentLibraries::License)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(ContentLibraries::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(ContentLibraries::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(ContentLibraries::DeletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-content-libraries-learning-package")
                            .from(ContentLibraries::Table, ContentLibraries::LearningPackageId)
                            .to(LearningPackages::Table, LearningPackages::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-content-libraries-org-slug")
                    .table(ContentLibraries::Table)
                    .col(ContentLibraries::Org)
                    .col(ContentLibraries::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LibraryPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LibraryPermissions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LibraryPermissions::LibraryId).integer().not_null())
                    .col(ColumnDef::new(LibraryPermissions::UserId).integer())
                    .col(ColumnDef::new(LibraryPermissions::GroupId).integer())
                    .col(
                        ColumnDef::new(LibraryPermissions::AccessLevel)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LibraryPermissions::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-library-permissions-library-user")
                    .table(LibraryPermissions::Table)
                    .col(LibraryPermissions::LibraryId)
                    .col(LibraryPermissions::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-library-permissions-library-group")
                    .table(LibraryPermissions::Table)
                    .col(LibraryPermissions::LibraryId)
                    .col(LibraryPermissions::GroupId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LibraryPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContentLibraries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LearningPackages::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum LearningPackages {
    Table,
    Id,
    Key,
    Title,
    Description,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum ContentLibraries {
    Table,
    Id,
    Org,
    Slug,
    LibraryType,
    LearningPackageId,
    AllowPublicRead,
    AllowPublicLearning,
    AllowLti,
    License,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum LibraryPermissions {
    Table,
    Id,
    LibraryId,
    UserId,
    GroupId,
    AccessLevel,
    CreatedAt,
}
