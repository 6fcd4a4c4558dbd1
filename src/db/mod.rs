pub mod migrations;
pub mod queries;

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

use crate::errors::AppError;

const MEMORY_PATH: &str = ":memory:";
const MAX_IDLE: usize = 8;

/// Opens a connection with the pragmas every caller relies on. Does not migrate.
pub fn open(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;
    conn.busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;

    Ok(conn)
}

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = open(path)?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

enum Source {
    /// An in-memory database lives in exactly one connection.
    Shared(Mutex<Connection>),
    File {
        path: String,
        idle: Mutex<Vec<Connection>>,
    },
}

/// Lends SQLite connections to request handlers. Each caller of a file
/// database gets its own connection, so callers only wait on each other at
/// SQLite's write lock.
pub struct Pool {
    source: Source,
}

impl Pool {
    /// Migrates the database at `path` and keeps the migrating connection idle.
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = init_db(path)?;
        let source = if path == MEMORY_PATH {
            Source::Shared(Mutex::new(conn))
        } else {
            Source::File {
                path: path.to_string(),
                idle: Mutex::new(vec![conn]),
            }
        };
        Ok(Self { source })
    }

    /// Runs `f` with a connection and returns it to the pool afterwards.
    pub fn with<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<AppError>,
    {
        match &self.source {
            Source::Shared(conn) => {
                let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
                f(&mut *conn)
            }
            Source::File { path, idle } => {
                let checked_out = idle
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop();
                let mut conn = match checked_out {
                    Some(conn) => conn,
                    None => open(path).map_err(AppError::from)?,
                };

                let result = f(&mut conn);

                let mut idle = idle.lock().unwrap_or_else(PoisonError::into_inner);
                if idle.len() < MAX_IDLE {
                    idle.push(conn);
                }
                result
            }
        }
    }
}
