use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::SavedAnalysis;
use crate::error::Result;
use crate::material::Material;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join("packscan.db"))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS saved_analyses (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                image_path TEXT NOT NULL,
                materials TEXT NOT NULL,
                overall_analysis TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS saved_analyses_user
                ON saved_analyses (user_id, created_at);
            ",
        )?;
        Ok(())
    }

    pub(super) fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves the connection itself usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, analysis: &SavedAnalysis) -> Result<()> {
        let materials = serde_json::to_string(&analysis.materials)?;
        self.lock().execute(
            "INSERT INTO saved_analyses
                 (id, user_id, image_path, materials, overall_analysis, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                analysis.id.to_string(),
                analysis.user_id.to_string(),
                analysis.image_path,
                materials,
                analysis.overall_analysis,
                analysis.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ],
        )?;
        Ok(())
    }

    /// The user's analyses, newest first.
    pub fn list(&self, user_id: Uuid) -> Result<Vec<SavedAnalysis>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, image_path, materials, overall_analysis, created_at
             FROM saved_analyses WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], read_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<SavedAnalysis>> {
        let row = self
            .lock()
            .query_row(
                "SELECT id, user_id, image_path, materials, overall_analysis, created_at
                 FROM saved_analyses WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
                read_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Returns whether a row owned by `user_id` was removed.
    pub fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let removed = self.lock().execute(
            "DELETE FROM saved_analyses WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.to_string()],
        )?;
        Ok(removed > 0)
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<SavedAnalysis> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let materials: String = row.get(3)?;
    let created_at: String = row.get(5)?;

    Ok(SavedAnalysis {
        id: Uuid::parse_str(&id).map_err(|e| conversion(0, e))?,
        user_id: Uuid::parse_str(&user_id).map_err(|e| conversion(1, e))?,
        image_path: row.get(2)?,
        materials: serde_json::from_str::<Vec<Material>>(&materials).map_err(|e| conversion(3, e))?,
        overall_analysis: row.get(4)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| conversion(5, e))?
            .with_timezone(&Utc),
        image_url: None,
    })
}

fn conversion<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}
