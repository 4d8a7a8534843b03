use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::models::{MindMapContent, MindMapRecord};
use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub struct Database {
    conn: Mutex<Connection>,
    path: String,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let conn = Connection::open(&path)?;
        let db = Database { conn: Mutex::new(conn), path: path_str };
        db.init()?;
        info!(path = %db.path, "mind map store opened");
        Ok(db)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn: Mutex::new(conn), path: ":memory:".to_string() };
        db.init()?;
        Ok(db)
    }

    pub fn get_path(&self) -> String {
        self.path.clone()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    fn init(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS mind_maps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                tags TEXT NOT NULL DEFAULT '[]',     -- JSON array of strings
                starred INTEGER NOT NULL DEFAULT 0,
                shared INTEGER NOT NULL DEFAULT 0,
                creator TEXT,
                view_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,            -- RFC3339
                content TEXT NOT NULL                -- JSON {nodes, edges, version}
            );

            CREATE INDEX IF NOT EXISTS idx_mind_maps_updated ON mind_maps(updated_at);
            CREATE INDEX IF NOT EXISTS idx_mind_maps_starred ON mind_maps(starred);
            ",
        )?;
        Ok(())
    }

    const COLUMNS: &'static str =
        "id, title, description, tags, starred, shared, creator, view_count, updated_at, content";

    fn row_to_record(row: &Row) -> rusqlite::Result<(MindMapRecord, String, String, String)> {
        // JSON/date columns are decoded outside the row closure so their
        // errors surface as StoreError instead of rusqlite conversion errors.
        let record = MindMapRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            tags: Vec::new(),
            starred: row.get::<_, i64>(4)? != 0,
            shared: row.get::<_, i64>(5)? != 0,
            creator: row.get(6)?,
            view_count: row.get(7)?,
            updated_at: Utc::now(),
            content: MindMapContent::new(Default::default()),
        };
        Ok((record, row.get(3)?, row.get(8)?, row.get(9)?))
    }

    fn decode(raw: (MindMapRecord, String, String, String)) -> StoreResult<MindMapRecord> {
        let (mut record, tags, updated_at, content) = raw;
        record.tags = serde_json::from_str(&tags)?;
        record.content = serde_json::from_str(&content)?;
        record.updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| StoreError::InvalidDocument(format!("bad updated_at {}: {}", updated_at, e)))?;
        Ok(record)
    }

    fn query_records(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> StoreResult<Vec<MindMapRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let raw = stmt
            .query_map(args, Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(Self::decode).collect()
    }

    /// Store a new record and return its id. `record.id` is ignored.
    pub fn insert(&self, record: &MindMapRecord) -> StoreResult<i64> {
        let tags = serde_json::to_string(&record.tags)?;
        let content = serde_json::to_string(&record.content)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO mind_maps (title, description, tags, starred, shared, creator, view_count, updated_at, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.title,
                record.description,
                tags,
                record.starred as i64,
                record.shared as i64,
                record.creator,
                record.view_count,
                record.updated_at.to_rfc3339(),
                content,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, title = %record.title, "mind map inserted");
        Ok(id)
    }

    /// Overwrite an existing record and bump its `updated_at`.
    pub fn update(&self, record: &MindMapRecord) -> StoreResult<()> {
        let tags = serde_json::to_string(&record.tags)?;
        let content = serde_json::to_string(&record.content)?;
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE mind_maps SET title = ?2, description = ?3, tags = ?4, starred = ?5, shared = ?6,
                creator = ?7, view_count = ?8, updated_at = ?9, content = ?10
             WHERE id = ?1",
            params![
                record.id,
                record.title,
                record.description,
                tags,
                record.starred as i64,
                record.shared as i64,
                record.creator,
                record.view_count,
                Utc::now().to_rfc3339(),
                content,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(record.id));
        }
        debug!(id = record.id, "mind map updated");
        Ok(())
    }

    /// Insert when the record has never been stored, otherwise update.
    /// Writes the assigned id back into `record`.
    pub fn save(&self, record: &mut MindMapRecord) -> StoreResult<i64> {
        if record.id > 0 && self.get(record.id)?.is_some() {
            self.update(record)?;
        } else {
            record.id = self.insert(record)?;
        }
        Ok(record.id)
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<MindMapRecord>> {
        let raw = {
            let conn = self.lock()?;
            conn.query_row(
                &format!("SELECT {} FROM mind_maps WHERE id = ?1", Self::COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()?
        };
        raw.map(Self::decode).transpose()
    }

    /// All records, most recently updated first.
    pub fn list(&self) -> StoreResult<Vec<MindMapRecord>> {
        self.query_records(
            &format!("SELECT {} FROM mind_maps ORDER BY updated_at DESC, id DESC", Self::COLUMNS),
            &[],
        )
    }

    pub fn find_by_tag(&self, tag: &str) -> StoreResult<Vec<MindMapRecord>> {
        self.query_records(
            &format!(
                "SELECT {} FROM mind_maps
                 WHERE EXISTS (SELECT 1 FROM json_each(mind_maps.tags) WHERE json_each.value = ?1)
                 ORDER BY updated_at DESC, id DESC",
                Self::COLUMNS
            ),
            &[&tag],
        )
    }

    pub fn delete(&self, id: i64) -> StoreResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM mind_maps WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn set_starred(&self, id: i64, starred: bool) -> StoreResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE mind_maps SET starred = ?2 WHERE id = ?1",
            params![id, starred as i64],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Count one view and return the new total.
    pub fn record_view(&self, id: i64) -> StoreResult<u32> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE mind_maps SET view_count = view_count + 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        let count: u32 = conn.query_row(
            "SELECT view_count FROM mind_maps WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn export_json(&self, id: i64) -> StoreResult<String> {
        let record = self.get(id)?.ok_or(StoreError::NotFound(id))?;
        Ok(serde_json::to_string_pretty(&record)?)
    }

    /// Import an exported document as a new record and return its id.
    pub fn import_json(&self, json: &str) -> StoreResult<i64> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let content = value
            .get("content")
            .ok_or_else(|| StoreError::InvalidDocument("missing content".to_string()))?;
        for field in ["nodes", "edges"] {
            if !content.get(field).map(|v| v.is_array()).unwrap_or(false) {
                return Err(StoreError::InvalidDocument(format!("content.{} must be an array", field)));
            }
        }

        let mut record: MindMapRecord = serde_json::from_value(value)?;
        record
            .content
            .graph
            .validate()
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
        record.id = 0;
        record.view_count = 0;
        record.updated_at = Utc::now();
        let id = self.insert(&record)?;
        info!(id, title = %record.title, "mind map imported");
        Ok(id)
    }
}
