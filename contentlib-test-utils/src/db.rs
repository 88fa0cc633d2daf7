use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Database handle for tests. Migrations are left to the caller so this
/// crate stays independent of the schema.
pub struct TestDb {
    url: String,
}

impl TestDb {
    pub fn new_in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }

    pub fn new_file(path: impl AsRef<std::path::Path>) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path.as_ref().display()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        let mut opt = ConnectOptions::new(self.url.clone());
        opt.sqlx_logging(false);
        if self.url.contains(":memory:") {
            opt.max_connections(1).min_connections(1);
        }
        Database::connect(opt).await
    }
}
