use std::fs;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};

use rcxi_core::MemoryRecord;
use rcxi_core::time::now_iso8601;

use crate::error::{Result, StoreError};
use crate::schema;

/// File name of the database inside a data directory.
pub const DATABASE_FILE: &str = "rcxi.db";

/// One row of the `sessions` table, without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub name: String,
    pub updated_at: String,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::info!(path = %path.display(), "store opened");
        Ok(Self { conn })
    }

    /// Open `<dir>/rcxi.db`, creating the directory if needed.
    pub fn open_dir(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Self::open(&dir.join(DATABASE_FILE))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Records ---

    /// Append a record to `session`'s log. Returns the row id.
    pub fn save_record(&self, session: &str, record: &MemoryRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO records
                (session, sequence_index, timestamp, tension, attractor_count,
                 glyph_peaks, state_vector, stride, symbolic_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session,
                to_i64(record.sequence_index, "sequence_index")?,
                to_i64(record.timestamp, "timestamp")?,
                record.tension,
                record.attractor_count as i64,
                serde_json::to_string(&record.glyph_peaks)?,
                serde_json::to_string(&record.state_vector)?,
                record.stride as i64,
                // Hash bits stored as-is; SQLite integers are signed
                record.symbolic_ref as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Save many records in one transaction.
    pub fn save_records(&self, session: &str, records: &[MemoryRecord]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            self.save_record(session, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Records for `session`, oldest first. With a limit, the newest
    /// `limit` records are returned (still oldest first).
    pub fn load_records(&self, session: &str, limit: Option<usize>) -> Result<Vec<MemoryRecord>> {
        let limit = limit.map_or(-1, |l| l as i64);
        let mut stmt = self.conn.prepare(
            "SELECT sequence_index, timestamp, tension, attractor_count,
                    glyph_peaks, state_vector, stride, symbolic_ref
             FROM records WHERE session = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let raw: Vec<RawRecord> = stmt
            .query_map(params![session, limit], RawRecord::from_row)?
            .collect::<std::result::Result<_, _>>()?;

        let mut records = raw
            .into_iter()
            .map(RawRecord::into_record)
            .collect::<Result<Vec<_>>>()?;
        records.reverse();
        Ok(records)
    }

    pub fn latest_record(&self, session: &str) -> Result<Option<MemoryRecord>> {
        Ok(self.load_records(session, Some(1))?.pop())
    }

    pub fn record_count(&self, session: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE session = ?1",
            [session],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // --- Sessions ---

    /// Store a session export under `name`, replacing any previous one.
    pub fn save_session(&self, name: &str, payload: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions (name, payload, updated_at) VALUES (?1, ?2, ?3)",
            params![name, payload, now_iso8601()],
        )?;
        tracing::debug!(session = name, bytes = payload.len(), "session saved");
        Ok(())
    }

    pub fn load_session(&self, name: &str) -> Result<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM sessions WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    /// Like [`load_session`](Self::load_session) but missing is an error.
    pub fn require_session(&self, name: &str) -> Result<String> {
        self.load_session(name)?
            .ok_or_else(|| StoreError::NotFound(format!("session {name:?}")))
    }

    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, updated_at FROM sessions ORDER BY name")?;
        let sessions = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    name: row.get(0)?,
                    updated_at: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(sessions)
    }

    /// Append `record` and replace the session payload atomically, so the
    /// stored session never lags behind its record log.
    pub fn checkpoint(&self, name: &str, record: &MemoryRecord, payload: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.save_record(name, record)?;
        self.save_session(name, payload)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a session and its records. Returns whether the session existed.
    pub fn delete_session(&self, name: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM records WHERE session = ?1", [name])?;
        let removed = tx.execute("DELETE FROM sessions WHERE name = ?1", [name])?;
        tx.commit()?;
        Ok(removed > 0)
    }
}

struct RawRecord {
    sequence_index: i64,
    timestamp: i64,
    tension: f64,
    attractor_count: i64,
    glyph_peaks: String,
    state_vector: String,
    stride: i64,
    symbolic_ref: i64,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            sequence_index: row.get(0)?,
            timestamp: row.get(1)?,
            tension: row.get(2)?,
            attractor_count: row.get(3)?,
            glyph_peaks: row.get(4)?,
            state_vector: row.get(5)?,
            stride: row.get(6)?,
            symbolic_ref: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<MemoryRecord> {
        Ok(MemoryRecord {
            timestamp: from_i64(self.timestamp, "timestamp")?,
            sequence_index: from_i64(self.sequence_index, "sequence_index")?,
            symbolic_ref: self.symbolic_ref as u64,
            state_vector: serde_json::from_str(&self.state_vector)?,
            stride: from_i64(self.stride, "stride")? as usize,
            tension: self.tension,
            glyph_peaks: serde_json::from_str(&self.glyph_peaks)?,
            attractor_count: from_i64(self.attractor_count, "attractor_count")? as usize,
        })
    }
}

fn to_i64(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidData(format!("{field} out of range: {value}")))
}

fn from_i64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidData(format!("negative {field}: {value}")))
}
