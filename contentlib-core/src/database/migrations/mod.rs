pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_principals;
mod m20250301_000002_create_libraries;
mod m20250301_000003_create_publishable_entities;
mod m20250301_000004_create_collections;
mod m20250301_000005_create_discussions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_principals::Migration),
            Box::new(m20250301_000002_create_libraries::Migration),
            Box::new(m20250301_000003_create_publishable_entities::Migration),
            Box::new(m20250301_000004_create_collections::Migration),
            Box::new(m20250301_000005_create_discussions::Migration),
        ]
    }
}
