//! # noteapp-db
//!
//! PostgreSQL database layer for noteapp.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for notes and categories
//! - The note/category association table, kept consistent in both directions
//!
//! ## Example
//!
//! ```rust,ignore
//! use noteapp_db::{Database, NoteRepository, NoteRequest, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect_with_config(
//!         "postgres://localhost/noteapp",
//!         PoolConfig::default(),
//!     )
//!     .await?;
//!
//!     let note = db.notes.insert(NoteRequest {
//!         title: "Groceries".to_string(),
//!         content: "milk, eggs".to_string(),
//!         ..Default::default()
//!     }).await?;
//!
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```
pub mod categories;
pub mod notes;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use noteapp_core::*;

// Re-export repository implementations
pub use categories::PgCategoryRepository;
pub use notes::PgNoteRepository;
pub use pool::{create_pool_with_config, redact_database_url, PoolConfig};

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note repository, including category associations.
    pub notes: PgNoteRepository,
    /// Category repository.
    pub categories: PgCategoryRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            categories: PgCategoryRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the given URL with the given pool configuration.
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
}
