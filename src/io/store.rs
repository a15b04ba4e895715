//! SQLite persistence for route records
//!
//! One `routes` table, append-heavy. The connection sits behind a mutex;
//! callers hold it only for the duration of one statement (or one backup
//! copy), which is all the locking discipline this single-writer design
//! needs.

use crate::domain::{RecordId, RouteRecord, RouteStats};
use anyhow::Context;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Durable append of one route record. Split out as a trait so the batch
/// pipeline can run against an in-memory fake.
pub trait StoreRoutes: Send + Sync {
    fn insert_route(&self, record: &RouteRecord) -> anyhow::Result<RecordId>;
}

pub struct RouteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl RouteStore {
    /// Open (or create) the database at `path` and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        init_schema(&conn)?;

        info!(db_path = %path.display(), "route_store_opened");
        Ok(Self { conn: Mutex::new(conn), db_path: path.to_path_buf() })
    }

    pub fn list(&self) -> anyhow::Result<Vec<RouteRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, start_address, end_address, distance, date, notes, route_points
             FROM routes ORDER BY date DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            let points: Option<String> = row.get(6)?;
            Ok(RouteRecord {
                id: Some(RecordId(row.get(0)?)),
                start_address: row.get(1)?,
                end_address: row.get(2)?,
                distance_km: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                date: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                notes: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                route_points: RouteRecord::points_from_json(points.as_deref()),
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Replace an existing record. Returns false if no row has that id.
    pub fn update(&self, id: RecordId, record: &RouteRecord) -> anyhow::Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE routes
             SET start_address = ?1, end_address = ?2, distance = ?3, notes = ?4,
                 route_points = ?5
             WHERE id = ?6",
            params![
                record.start_address,
                record.end_address,
                record.distance_km,
                record.notes,
                record.points_json(),
                id.0
            ],
        )?;
        Ok(changed > 0)
    }

    /// Delete one record. Returns false if no row has that id.
    pub fn delete(&self, id: RecordId) -> anyhow::Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM routes WHERE id = ?1", params![id.0])?;
        Ok(changed > 0)
    }

    /// Delete all records. Returns the number of rows removed.
    pub fn clear(&self) -> anyhow::Result<u64> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM routes", [])?;
        info!(deleted = %changed, "route_store_cleared");
        Ok(changed as u64)
    }

    pub fn statistics(&self) -> anyhow::Result<RouteStats> {
        let conn = self.conn.lock();

        let total_routes: u64 =
            conn.query_row("SELECT COUNT(*) FROM routes", [], |row| row.get(0))?;
        let total_distance: f64 = conn
            .query_row("SELECT COALESCE(SUM(distance), 0) FROM routes", [], |row| row.get(0))?;
        let average_distance: f64 = conn
            .query_row("SELECT COALESCE(AVG(distance), 0) FROM routes", [], |row| row.get(0))?;

        // Batch inserts store full timestamps; bucket by calendar day
        let mut stmt = conn.prepare(
            "SELECT date(date) AS day, COUNT(*) FROM routes GROUP BY day ORDER BY day DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, Option<String>>(0)?.unwrap_or_default(), row.get::<_, u64>(1)?))
        })?;

        let mut daily_routes = Vec::new();
        for row in rows {
            daily_routes.push(row?);
        }

        Ok(RouteStats {
            total_routes,
            total_distance_km: round2(total_distance),
            average_distance_km: round2(average_distance),
            daily_routes,
        })
    }

    /// Dump all routes as CSV, excluding the bulky route_points column
    pub fn export_csv(&self) -> anyhow::Result<String> {
        let records = self.list()?;

        let mut out = String::from("ID,Start Address,End Address,Distance (km),Date,Notes\n");
        for record in records {
            let id = record.id.map(|id| id.0.to_string()).unwrap_or_default();
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                id,
                csv_field(&record.start_address),
                csv_field(&record.end_address),
                record.distance_km,
                csv_field(&record.date),
                csv_field(&record.notes),
            ));
        }
        Ok(out)
    }

    /// Copy the database file into `dir` with a timestamped name
    pub fn backup(&self, dir: &str) -> anyhow::Result<PathBuf> {
        // Hold the lock so no write lands mid-copy
        let _conn = self.conn.lock();

        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create backup directory {}", dir))?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let backup_path = Path::new(dir).join(format!("routes_backup_{}.db", timestamp));
        fs::copy(&self.db_path, &backup_path)
            .with_context(|| format!("Failed to back up to {}", backup_path.display()))?;

        info!(backup_path = %backup_path.display(), "database_backed_up");
        Ok(backup_path)
    }

    /// Replace the live database with the file at `src` and reopen.
    ///
    /// The connection is pointed at an in-memory stub while the file is
    /// swapped so SQLite holds no handle on the target during the copy.
    pub fn restore(&self, src: &Path) -> anyhow::Result<()> {
        let mut conn = self.conn.lock();

        *conn = Connection::open_in_memory().context("Failed to detach live database")?;
        let copied = fs::copy(src, &self.db_path)
            .with_context(|| format!("Failed to restore from {}", src.display()));

        let reopened = Connection::open(&self.db_path)
            .with_context(|| format!("Failed to reopen database {}", self.db_path.display()))?;
        init_schema(&reopened)?;
        *conn = reopened;

        copied?;
        info!(src = %src.display(), "database_restored");
        Ok(())
    }
}

impl StoreRoutes for RouteStore {
    fn insert_route(&self, record: &RouteRecord) -> anyhow::Result<RecordId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO routes (start_address, end_address, distance, date, notes, route_points)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.start_address,
                record.end_address,
                record.distance_km,
                record.date,
                record.notes,
                record.points_json()
            ],
        )
        .context("Failed to insert route")?;

        Ok(RecordId(conn.last_insert_rowid()))
    }
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS routes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_address TEXT NOT NULL,
            end_address TEXT NOT NULL,
            distance REAL,
            date TEXT,
            notes TEXT,
            route_points TEXT
        )",
        [],
    )
    .context("Failed to create routes table")?;
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// RFC 4180 quoting: wrap fields containing separators or quotes
fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Best-effort cleanup for a file that should not outlive its scope
pub struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "temp_file_cleanup_failed");
        }
    }
}
