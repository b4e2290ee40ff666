//! SQLite adapter for `LeaseStore`
//!
//! One row per lease. The per-version status map is stored as a JSON column;
//! every other field maps to its own column so the version check in
//! `replace_lease` runs inside a single transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::domain::{check_replace, LeaseRecord, LeaseStore, VersionStatusRecord};
use crate::Result;

const LEASE_COLUMNS: &str = "id, lease_version, collection_uuid, collection_name, owner, \
     last_renewed, lease_format_version, commit_info, latest_index_definition_version, \
     version_statuses";

/// SQLite-based `LeaseStore`
#[derive(Clone)]
pub struct SqliteLeaseStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLeaseStore {
    /// Open (or create) a lease database at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS leases (
                id TEXT PRIMARY KEY,
                lease_version INTEGER NOT NULL,
                collection_uuid TEXT NOT NULL,
                collection_name TEXT NOT NULL,
                owner TEXT NOT NULL,
                last_renewed TEXT NOT NULL,
                lease_format_version INTEGER NOT NULL,
                commit_info TEXT NOT NULL,
                latest_index_definition_version TEXT NOT NULL,
                version_statuses TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_leases_collection
             ON leases(collection_uuid)",
            [],
        )?;

        Ok(())
    }

    fn write_row(conn: &Connection, record: &LeaseRecord) -> Result<()> {
        let statuses = serde_json::to_string(&record.index_definition_version_status_map)?;
        conn.execute(
            "INSERT OR REPLACE INTO leases (
                id, lease_version, collection_uuid, collection_name, owner,
                last_renewed, lease_format_version, commit_info,
                latest_index_definition_version, version_statuses
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.lease_version,
                record.collection_uuid,
                record.collection_name,
                record.owner,
                record.last_renewed,
                record.lease_format_version,
                record.commit_info,
                record.latest_index_definition_version,
                statuses,
            ],
        )?;
        Ok(())
    }

    fn read_row(conn: &Connection, lease_id: &str) -> Result<Option<LeaseRecord>> {
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM leases WHERE id = ?1", LEASE_COLUMNS),
                params![lease_id],
                RawLeaseRow::from_row,
            )
            .optional()?;
        raw.map(RawLeaseRow::into_record).transpose()
    }
}

/// Row as read from SQLite, before the status map is decoded
struct RawLeaseRow {
    record: LeaseRecord,
    version_statuses: String,
}

impl RawLeaseRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record: LeaseRecord {
                id: row.get(0)?,
                lease_version: row.get(1)?,
                collection_uuid: row.get(2)?,
                collection_name: row.get(3)?,
                owner: row.get(4)?,
                last_renewed: row.get(5)?,
                lease_format_version: row.get(6)?,
                commit_info: row.get(7)?,
                latest_index_definition_version: row.get(8)?,
                index_definition_version_status_map: BTreeMap::new(),
            },
            version_statuses: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<LeaseRecord> {
        let statuses: BTreeMap<String, VersionStatusRecord> =
            serde_json::from_str(&self.version_statuses)?;
        Ok(LeaseRecord {
            index_definition_version_status_map: statuses,
            ..self.record
        })
    }
}

#[async_trait]
impl LeaseStore for SqliteLeaseStore {
    async fn list_leases(&self) -> Result<Vec<LeaseRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM leases ORDER BY id",
            LEASE_COLUMNS
        ))?;
        let rows = stmt.query_map([], RawLeaseRow::from_row)?;

        let mut leases = Vec::new();
        for row in rows {
            leases.push(row?.into_record()?);
        }
        Ok(leases)
    }

    async fn get_lease(&self, lease_id: &str) -> Result<Option<LeaseRecord>> {
        let conn = self.conn.lock();
        Self::read_row(&conn, lease_id)
    }

    async fn insert_lease(&self, record: &LeaseRecord) -> Result<()> {
        let conn = self.conn.lock();
        Self::write_row(&conn, record)?;
        debug!(lease_id = %record.id, version = record.lease_version, "lease inserted");
        Ok(())
    }

    async fn replace_lease(&self, expected_version: i64, record: &LeaseRecord) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let stored = Self::read_row(&tx, &record.id)?;
        check_replace(stored.as_ref(), expected_version, record)?;
        Self::write_row(&tx, record)?;

        tx.commit()?;
        debug!(
            lease_id = %record.id,
            expected_version,
            version = record.lease_version,
            "lease replaced"
        );
        Ok(())
    }

    async fn delete_lease(&self, lease_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM leases WHERE id = ?1", params![lease_id])?;
        Ok(deleted > 0)
    }
}
