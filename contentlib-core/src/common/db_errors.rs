//! Classification of storage failures raised by gateway writes.
//!
//! Unique indexes back most naming rules (library slugs, component local ids,
//! collection keys), so a unique violation is a caller mistake rather than an
//! infrastructure failure.

use sea_orm::{DbErr, SqlErr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbFailure {
    UniqueViolation,
    ForeignKeyViolation,
    Other,
}

impl DbFailure {
    /// ```
    /// use contentlib::common::db_errors::DbFailure;
    /// use sea_orm::DbErr;
    ///
    /// let err = DbErr::RecordNotFound("library".to_string());
    /// assert_eq!(DbFailure::classify(&err), DbFailure::Other);
    /// ```
    pub fn classify(err: &DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => return Self::UniqueViolation,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Self::ForeignKeyViolation,
            _ => {}
        }

        // sqlx does not always surface a typed error for sqlite
        let text = match err {
            DbErr::Exec(msg) | DbErr::Query(msg) => msg.to_string().to_lowercase(),
            _ => return Self::Other,
        };
        if text.contains("unique constraint") {
            Self::UniqueViolation
        } else if text.contains("foreign key") {
            Self::ForeignKeyViolation
        } else {
            Self::Other
        }
    }
}

/// Message for a failed write, prefixed with what was being attempted.
pub fn describe(operation: &str, failure: DbFailure, err: &DbErr) -> String {
    match failure {
        DbFailure::UniqueViolation => format!("{}: duplicate key", operation),
        DbFailure::ForeignKeyViolation => format!("{}: dangling reference", operation),
        DbFailure::Other => format!("{}: {}", operation, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    fn exec_err(message: &str) -> DbErr {
        DbErr::Exec(RuntimeErr::Internal(message.to_string()))
    }

    #[test]
    fn test_unique_violation_from_sqlite_message() {
        let err = exec_err("UNIQUE constraint failed: publishable_entities.entity_key");
        let failure = DbFailure::classify(&err);
        assert_eq!(failure, DbFailure::UniqueViolation);
        assert_eq!(describe("create component", failure, &err), "create component: duplicate key");
    }

    #[test]
    fn test_foreign_key_violation() {
        let err = exec_err("FOREIGN KEY constraint failed");
        assert_eq!(DbFailure::classify(&err), DbFailure::ForeignKeyViolation);
    }

    #[test]
    fn test_other_failures_keep_details() {
        let err = exec_err("disk I/O error");
        let failure = DbFailure::classify(&err);
        assert_eq!(failure, DbFailure::Other);
        assert!(describe("publish", failure, &err).contains("disk I/O error"));

        let conn = DbErr::Conn(RuntimeErr::Internal("Connection refused".to_string()));
        assert_eq!(DbFailure::classify(&conn), DbFailure::Other);
    }
}
