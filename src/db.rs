use crate::config::DbConfig;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create database directory {path}: {source}")]
    Dir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Connection provider handed to every repository.
///
/// Each logical operation opens its own connection and drops it before
/// returning; nothing holds a connection across calls.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    url: String,
    username: Option<String>,
}

impl Database {
    /// Resolves the configured store and creates the schema if it is missing.
    pub fn open(cfg: &DbConfig) -> Result<Self, StoreError> {
        let path = cfg.sqlite_path()?;
        let db = Self::init(path, cfg.url.clone(), cfg.username.clone())?;
        tracing::info!(
            url = %cfg.url,
            username = cfg.username.as_deref().unwrap_or(""),
            "attendance database opened"
        );
        Ok(db)
    }

    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        Self::init(path.to_path_buf(), path.to_string_lossy().to_string(), None)
    }

    fn init(path: PathBuf, url: String, username: Option<String>) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Dir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let db = Self {
            inner: Arc::new(Inner {
                path,
                url,
                username,
            }),
        };
        let conn = db.connect()?;
        create_schema(&conn)?;
        Ok(db)
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn username(&self) -> Option<&str> {
        self.inner.username.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.inner.path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(conn)
    }

    /// Runs one storage operation on a fresh connection.
    ///
    /// Failures are logged under `op` and collapse to `None`; callers map that
    /// to `false` or an empty listing as their contract requires.
    pub fn run<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Option<T> {
        let result = self.connect().and_then(|conn| f(&conn));
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!(op, error = %e, "storage operation failed");
                None
            }
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.run("connection test", |conn| {
            Ok(conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?)
        })
        .is_some()
    }
}

fn create_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            roll_no TEXT NOT NULL UNIQUE COLLATE NOCASE,
            department TEXT NOT NULL,
            semester INTEGER NOT NULL,
            class_name TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class_roll ON students(class_name, roll_no)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_code TEXT NOT NULL UNIQUE COLLATE NOCASE,
            subject_name TEXT NOT NULL,
            semester INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // No unique index on (student_id, subject_id, date): one status per key
    // is maintained by lookup-before-write in the service.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            subject_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('Present', 'Absent')),
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_key ON attendance(student_id, subject_id, date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_subject_date ON attendance(subject_id, date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;

    Ok(())
}
