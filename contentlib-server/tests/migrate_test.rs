use anyhow::Result;
use contentlib::database::connection::{establish_connection, get_database_url};
use contentlib_server::server::{migrate_database, MigrateDirection};
use sea_orm::{ConnectionTrait, Statement};
use tempfile::TempDir;

async fn table_names(path: &str) -> Result<Vec<String>> {
    let db = establish_connection(&get_database_url(Some(path))).await?;
    let rows = db
        .query_all(Statement::from_string(
            db.get_database_backend(),
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'seaql_%' AND name NOT LIKE 'sqlite_%' ORDER BY name"
                .to_string(),
        ))
        .await?;
    let mut names = Vec::new();
    for row in rows {
        names.push(row.try_get::<String>("", "name")?);
    }
    Ok(names)
}

#[tokio::test]
async fn test_migrate_up_down_fresh() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("contentlib.db");
    let path = path.to_string_lossy().to_string();

    migrate_database(&path, MigrateDirection::Up).await?;
    let tables = table_names(&path).await?;
    assert!(tables.contains(&"content_libraries".to_string()));
    assert!(tables.contains(&"publishable_entities".to_string()));

    migrate_database(&path, MigrateDirection::Fresh).await?;
    assert_eq!(table_names(&path).await?, tables);

    migrate_database(&path, MigrateDirection::Down).await?;
    assert!(table_names(&path).await?.is_empty());
    Ok(())
}
