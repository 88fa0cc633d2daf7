#[cfg(test)]
use sea_orm::DatabaseConnection;

#[cfg(test)]
pub async fn setup_test_db() -> DatabaseConnection {
    super::connection::setup_database("sqlite::memory:")
        .await
        .expect("Failed to set up test database")
}
