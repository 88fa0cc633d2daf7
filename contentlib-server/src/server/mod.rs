pub mod app;
pub mod error;
pub mod extract;
pub mod handlers;

use anyhow::Result;
use clap::Subcommand;
use contentlib::database::connection::{establish_connection, get_database_url};
use contentlib::database::migrations::Migrator;
use contentlib::events::TopicProjector;
use contentlib::{LibraryConfig, LibraryGateway};
use sea_orm_migration::prelude::*;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum MigrateDirection {
    /// Apply all pending migrations
    Up,
    /// Rollback all migrations
    Down,
    /// Rollback then re-apply all migrations
    Fresh,
}

pub async fn start_server(port: u16, database_path: &str, cors_origin: Option<&str>) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    Migrator::up(&db, None).await?;
    info!("Database migrations applied");

    let gateway = LibraryGateway::new(db, LibraryConfig::from_env());
    let projector = TopicProjector::spawn(gateway.events(), gateway.topics().as_ref().clone());

    let app = app::create_app(gateway, cors_origin)?;
    log_routes(port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server listening on port {}", port);
    let served = axum::serve(listener, app).await;

    projector.abort();
    served?;
    Ok(())
}

fn log_routes(port: u16) {
    let base = format!("http://localhost:{}", port);
    info!("Health check: {}/health", base);
    info!("Libraries:     {}/libraries/v2/", base);
    info!("Components:    {}/libraries/v2/blocks/{{usage_key}}/", base);
    info!("Containers:    {}/libraries/v2/containers/{{container_key}}/", base);
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Applying migrations to {}", database_url);
            Migrator::up(&db, None).await?;
            info!("Migrations applied successfully");
        }
        MigrateDirection::Down => {
            info!("Rolling back migrations on {}", database_url);
            Migrator::down(&db, None).await?;
            info!("Migrations rolled back successfully");
        }
        MigrateDirection::Fresh => {
            info!("Recreating schema on {}", database_url);
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
            info!("Fresh migration completed successfully");
        }
    }

    Ok(())
}
