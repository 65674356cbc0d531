//! # scribe-db
//!
//! PostgreSQL database layer and media storage for scribe.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, sessions and notes
//! - Media store backends (local filesystem, HTTP upload service)
//! - In-memory repositories for tests and database-less runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use scribe_db::{Database, NoteRepository, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect_with_config(
//!         "postgres://localhost/scribe",
//!         PoolConfig::new().max_connections(5),
//!     )
//!     .await?;
//!     let notes = db.notes.list_visible_to(user_id).await?;
//!     println!("{} notes", notes.len());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod media;
pub mod memory;
pub mod notes;
pub mod pool;
pub mod sessions;
pub mod users;

// Always compiled so integration tests (in tests/) can use it
pub mod test_fixtures;

// Re-export core types
pub use scribe_core::*;

pub use media::{FilesystemMediaStore, HttpMediaStore};
pub use notes::PgNoteRepository;
pub use pool::{create_pool_with_config, PoolConfig};
pub use sessions::PgSessionRepository;
pub use users::PgUserRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub users: PgUserRepository,
    pub sessions: PgSessionRepository,
    pub notes: PgNoteRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Trait-object handles over this pool.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: Arc::new(PgUserRepository::new(self.pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(self.pool.clone())),
            notes: Arc::new(PgNoteRepository::new(self.pool.clone())),
        }
    }
}

/// Storage-agnostic repository handles, shared across request handlers.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub notes: Arc<dyn NoteRepository>,
}
