//! SQLite storage: connection, schema, repositories and units of work.
//!
//! A [`Connection`] is process-wide and cheap to clone. All domain access goes
//! through [`DomainStorageEngine`], which hands out either a [`UnitOfWork`]
//! (one IMMEDIATE transaction, committed only when the closure succeeds) or a
//! [`ReadView`] (plain reads with `query_only` on).

mod record;
mod records;
mod repository;
mod schema;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::TransactionBehavior;
use thiserror::Error;

use crate::models::{
    DomainError, EntityId, EntityKind, ParentLink, RecurringTaskPeriod, Timeline,
};

pub use record::{RowReader, SqliteRecord};
pub use repository::*;

/// Failure to bring the schema up. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConnectionPrepareError {
    #[error("cannot create database directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot open database: {0}")]
    Open(#[source] rusqlite::Error),

    #[error("migration {version} ({name}) failed: {source}")]
    Migration {
        version: &'static str,
        name: &'static str,
        source: rusqlite::Error,
    },

    #[error("database was written by a newer version (unknown migration {version})")]
    UnknownMigration { version: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors raised by repositories and units of work.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {ref_id} does not exist")]
    EntityNotFound { kind: EntityKind, ref_id: EntityId },

    #[error("no live {kind} under {parent}")]
    TrunkNotFound { kind: EntityKind, parent: ParentLink },

    #[error("{kind} not found: {detail}")]
    NotFoundBy { kind: EntityKind, detail: String },

    #[error("{kind} already exists: {detail}")]
    EntityAlreadyExists { kind: EntityKind, detail: String },

    #[error("a {period} journal for {timeline} already exists")]
    JournalExistsForPeriodAndDate {
        period: RecurringTaskPeriod,
        timeline: Timeline,
    },

    #[error("cannot create {kind} under {parent}: parent does not exist")]
    ParentNotFound { kind: EntityKind, parent: ParentLink },

    #[error("cannot create {kind} under {parent}: parent is archived")]
    ParentArchived { kind: EntityKind, parent: ParentLink },

    #[error("{kind} {ref_id} was already saved")]
    AlreadyCreated { kind: EntityKind, ref_id: EntityId },

    #[error("corrupt {kind} row, column `{column}`: {message}")]
    Corrupt {
        kind: EntityKind,
        column: String,
        message: String,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Uniqueness violations, including the journal-specific one.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::EntityAlreadyExists { .. } | Self::JournalExistsForPeriodAndDate { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound { .. }
                | Self::TrunkNotFound { .. }
                | Self::NotFoundBy { .. }
                | Self::ParentNotFound { .. }
                | Self::ParentArchived { .. }
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Turns a missing-entity error into `None`.
pub trait OptionalEntity<T> {
    fn optional_entity(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalEntity<T> for StoreResult<T> {
    fn optional_entity(self) -> StoreResult<Option<T>> {
        match self {
            Ok(entity) => Ok(Some(entity)),
            Err(StoreError::EntityNotFound { .. } | StoreError::TrunkNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Process-wide handle to the database.
#[derive(Clone)]
pub struct Connection {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl Connection {
    pub fn open(path: &Path) -> Result<Self, ConnectionPrepareError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConnectionPrepareError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = rusqlite::Connection::open(path).map_err(ConnectionPrepareError::Open)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self::wrap(conn))
    }

    pub fn open_memory() -> Result<Self, ConnectionPrepareError> {
        let conn = rusqlite::Connection::open_in_memory().map_err(ConnectionPrepareError::Open)?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Idempotent schema bring-up.
    pub fn prepare(&self) -> Result<(), ConnectionPrepareError> {
        let conn = self.lock();
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::run_migrations(&conn)
    }

    /// Drops every table, including the migration ledger. Bypasses the domain.
    pub fn nuke(&self) -> StoreResult<()> {
        let conn = self.lock();
        conn.pragma_update(None, "foreign_keys", "OFF")?;
        for table in schema::TABLES {
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
        }
        conn.pragma_update(None, "foreign_keys", "ON")?;
        tracing::warn!("Database nuked");
        Ok(())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, rusqlite::Connection> {
        // A panic mid-transaction drops the transaction, which rolls it back,
        // so the connection behind a poisoned lock is still consistent.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cooperative cancellation, checked before a unit of work commits.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Gives access to every repository over one SQLite connection.
pub trait Repositories {
    fn sqlite(&self) -> &rusqlite::Connection;

    fn repository<T: SqliteRecord>(&self) -> SqliteEntityRepository<'_, T> {
        SqliteEntityRepository::new(self.sqlite())
    }
}

/// A transactional scope exposing all repositories.
pub struct UnitOfWork<'c> {
    conn: &'c rusqlite::Connection,
}

impl Repositories for UnitOfWork<'_> {
    fn sqlite(&self) -> &rusqlite::Connection {
        self.conn
    }
}

/// Non-transactional, read-only access to all repositories.
pub struct ReadView<'c> {
    conn: &'c rusqlite::Connection,
}

impl Repositories for ReadView<'_> {
    fn sqlite(&self) -> &rusqlite::Connection {
        self.conn
    }
}

#[derive(Clone)]
pub struct DomainStorageEngine {
    connection: Connection,
}

impl DomainStorageEngine {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn unit_of_work<T, E>(
        &self,
        f: impl FnOnce(&UnitOfWork<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.unit_of_work_with(&Cancellation::default(), f)
    }

    /// Runs `f` in one transaction. Commits only when `f` succeeds and the
    /// operation has not been cancelled; every other exit rolls back.
    pub fn unit_of_work_with<T, E>(
        &self,
        cancellation: &Cancellation,
        f: impl FnOnce(&UnitOfWork<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.connection.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let result = f(&UnitOfWork { conn: &tx })?;
        if cancellation.is_cancelled() {
            tracing::debug!("Unit of work cancelled, rolling back");
            return Err(StoreError::Cancelled.into());
        }
        tx.commit().map_err(StoreError::from)?;
        Ok(result)
    }

    pub fn read_view<T, E>(&self, f: impl FnOnce(&ReadView<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let conn = self.connection.lock();
        conn.pragma_update(None, "query_only", "ON")
            .map_err(StoreError::from)?;
        let result = f(&ReadView { conn: &conn });
        conn.pragma_update(None, "query_only", "OFF")
            .map_err(StoreError::from)?;
        result
    }
}
