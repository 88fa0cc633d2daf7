use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set, Statement, Value,
};
use sha2::{Digest, Sha256};

use crate::database::entities::asset_contents;
use crate::errors::{LibraryError, LibraryResult};

const RESERVED_CHARS: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

/// Canonical form of a static asset path.
///
/// Spaces become underscores. Paths may contain `/` separators but must not
/// start or end with one, must not contain empty, `.` or `..` segments, and
/// must not contain reserved or control characters.
pub fn normalize_asset_path(path: &str) -> LibraryResult<String> {
    let invalid = |reason: &str| LibraryError::InvalidPath(format!("'{}': {}", path, reason));

    if path.is_empty() {
        return Err(invalid("path is empty"));
    }
    if path != path.trim() {
        return Err(invalid("path cannot start or end with whitespace"));
    }
    let normalized = path.replace(' ', "_");
    if normalized.starts_with('/') || normalized.ends_with('/') {
        return Err(invalid("path cannot start or end with '/'"));
    }
    if normalized.contains("//") || normalized.contains("..") {
        return Err(invalid("invalid sequence (// or ..) in path"));
    }
    if normalized.split('/').any(|segment| segment == ".") {
        return Err(invalid("path cannot contain '.' segments"));
    }
    if let Some(c) = normalized
        .chars()
        .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
    {
        return Err(invalid(&format!("reserved character {:?}", c)));
    }
    Ok(normalized)
}

pub fn check_asset_size(size: usize, max_size: usize) -> LibraryResult<()> {
    if size > max_size {
        return Err(LibraryError::QuotaExceeded(format!(
            "asset of {} bytes exceeds the {} byte limit",
            size, max_size
        )));
    }
    Ok(())
}

pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Media type from the file extension, `application/octet-stream` when unknown.
pub fn guess_media_type(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "txt" => "text/plain",
        "srt" => "application/x-subrip",
        "vtt" => "text/vtt",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" | "olx" => "application/xml",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Store `data` in the package, reusing an existing row with the same hash.
pub async fn store_content<C: ConnectionTrait>(
    conn: &C,
    learning_package_id: i32,
    data: Vec<u8>,
) -> LibraryResult<asset_contents::Model> {
    let hash = content_hash(&data);
    let existing = asset_contents::Entity::find()
        .filter(asset_contents::Column::LearningPackageId.eq(learning_package_id))
        .filter(asset_contents::Column::ContentHash.eq(hash.as_str()))
        .one(conn)
        .await?;
    if let Some(existing) = existing {
        return Ok(existing);
    }

    let content = asset_contents::ActiveModel {
        learning_package_id: Set(learning_package_id),
        content_hash: Set(hash),
        size: Set(data.len() as i64),
        data: Set(data),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(content)
}

fn missing_content(content_id: i32) -> LibraryError {
    LibraryError::Internal(format!("asset content {} is missing", content_id))
}

pub async fn load_content<C: ConnectionTrait>(
    conn: &C,
    content_id: i32,
) -> LibraryResult<asset_contents::Model> {
    asset_contents::Entity::find_by_id(content_id)
        .one(conn)
        .await?
        .ok_or_else(|| missing_content(content_id))
}

/// Size and hash of a stored blob, without reading its bytes.
pub async fn content_summary<C: ConnectionTrait>(
    conn: &C,
    content_id: i32,
) -> LibraryResult<(i64, String)> {
    asset_contents::Entity::find_by_id(content_id)
        .select_only()
        .column(asset_contents::Column::Size)
        .column(asset_contents::Column::ContentHash)
        .into_tuple()
        .one(conn)
        .await?
        .ok_or_else(|| missing_content(content_id))
}

/// `len` bytes of a stored blob starting at the zero-based `offset`.
pub async fn read_content_range<C: ConnectionTrait>(
    conn: &C,
    content_id: i32,
    offset: usize,
    len: usize,
) -> LibraryResult<Vec<u8>> {
    let statement = Statement::from_sql_and_values(
        conn.get_database_backend(),
        "SELECT substr(data, ?, ?) AS chunk FROM asset_contents WHERE id = ?",
        [
            Value::from((offset + 1) as i64),
            Value::from(len as i64),
            Value::from(content_id),
        ],
    );
    let row = conn
        .query_one(statement)
        .await?
        .ok_or_else(|| missing_content(content_id))?;
    Ok(row.try_get::<Vec<u8>>("", "chunk")?)
}

/// Stored asset bytes read in fixed-size pieces, one query per piece.
#[derive(Debug, Clone)]
pub struct AssetChunks {
    db: DatabaseConnection,
    content_id: i32,
    size: usize,
    chunk_size: usize,
    offset: usize,
}

impl AssetChunks {
    pub fn new(db: DatabaseConnection, content_id: i32, size: usize, chunk_size: usize) -> Self {
        Self {
            db,
            content_id,
            size,
            chunk_size: chunk_size.max(1),
            offset: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Next piece, or `None` once every byte has been handed out.
    pub async fn next_chunk(&mut self) -> LibraryResult<Option<Vec<u8>>> {
        if self.offset >= self.size {
            return Ok(None);
        }
        let len = self.chunk_size.min(self.size - self.offset);
        let chunk = read_content_range(&self.db, self.content_id, self.offset, len).await?;
        if chunk.is_empty() {
            return Err(LibraryError::Internal(format!(
                "asset content {} ended at byte {} of {}",
                self.content_id, self.offset, self.size
            )));
        }
        self.offset += chunk.len();
        Ok(Some(chunk))
    }
}
