use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{FeedError, Result};
use crate::model::{BookmarkRecord, VideoEntry};
use crate::store::BookmarkStore;

const SCHEMA_VERSION: &str = "1";

/// SQLite implementation of [`BookmarkStore`]
///
/// The video snapshot is kept as a JSON array in a single column, bookmarks
/// are small and always read whole.
pub struct SqliteBookmarkStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteBookmarkStore {
    /// Open (creating if needed) the database file and its tables
    pub async fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FeedError::Storage(e.to_string()))?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePool::connect(&database_url).await?;

        let store = Self { pool, db_path };
        store.initialize().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await?;

        self.create_tables().await
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS playlist_bookmarks (
                playlist_id TEXT PRIMARY KEY NOT NULL,
                playlist_name TEXT NOT NULL,
                thumbnail_url TEXT NOT NULL,
                uploader TEXT,
                uploader_url TEXT,
                total_videos INTEGER NOT NULL,
                videos TEXT NOT NULL,
                saved_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS database_metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO database_metadata (key, value, updated_at) VALUES (?, ?, ?)",
        )
        .bind("schema_version")
        .bind(SCHEMA_VERSION)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<BookmarkRecord> {
        let videos_json: String = row.try_get("videos")?;
        let videos: Vec<VideoEntry> = serde_json::from_str(&videos_json)?;

        Ok(BookmarkRecord {
            playlist_id: row.try_get("playlist_id")?,
            playlist_name: row.try_get("playlist_name")?,
            thumbnail_url: row.try_get("thumbnail_url")?,
            uploader: row.try_get("uploader")?,
            uploader_url: row.try_get("uploader_url")?,
            total_videos: row.try_get::<i64, _>("total_videos")?.max(0) as u64,
            videos,
            saved_at: row.try_get("saved_at")?,
        })
    }
}

#[async_trait]
impl BookmarkStore for SqliteBookmarkStore {
    async fn contains(&self, playlist_id: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM playlist_bookmarks WHERE playlist_id = ?")
                .bind(playlist_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    async fn insert(&self, record: &BookmarkRecord) -> Result<()> {
        let videos = serde_json::to_string(&record.videos)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO playlist_bookmarks
            (playlist_id, playlist_name, thumbnail_url, uploader, uploader_url, total_videos, videos, saved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.playlist_id)
        .bind(&record.playlist_name)
        .bind(&record.thumbnail_url)
        .bind(&record.uploader)
        .bind(&record.uploader_url)
        .bind(record.total_videos as i64)
        .bind(&videos)
        .bind(record.saved_at)
        .execute(&self.pool)
        .await?;

        debug!(playlist_id = %record.playlist_id, "Stored bookmark");
        Ok(())
    }

    async fn delete_by_id(&self, playlist_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM playlist_bookmarks WHERE playlist_id = ?")
            .bind(playlist_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_all(&self) -> Result<Vec<BookmarkRecord>> {
        let rows = sqlx::query(
            "SELECT playlist_id, playlist_name, thumbnail_url, uploader, uploader_url, total_videos, videos, saved_at FROM playlist_bookmarks ORDER BY saved_at DESC, playlist_name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(Self::from_row(&row)?);
        }

        Ok(records)
    }

    async fn update(&self, record: &BookmarkRecord) -> Result<()> {
        let videos = serde_json::to_string(&record.videos)?;

        let result = sqlx::query(
            r#"
            UPDATE playlist_bookmarks
            SET playlist_name = ?, thumbnail_url = ?, uploader = ?, uploader_url = ?,
                total_videos = ?, videos = ?
            WHERE playlist_id = ?
            "#,
        )
        .bind(&record.playlist_name)
        .bind(&record.thumbnail_url)
        .bind(&record.uploader)
        .bind(&record.uploader_url)
        .bind(record.total_videos as i64)
        .bind(&videos)
        .bind(&record.playlist_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(FeedError::NotFound);
        }

        Ok(())
    }

    async fn get(&self, playlist_id: &str) -> Result<Option<BookmarkRecord>> {
        let row = sqlx::query(
            "SELECT playlist_id, playlist_name, thumbnail_url, uploader, uploader_url, total_videos, videos, saved_at FROM playlist_bookmarks WHERE playlist_id = ?",
        )
        .bind(playlist_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::from_row(&row)?)),
            None => Ok(None),
        }
    }
}
