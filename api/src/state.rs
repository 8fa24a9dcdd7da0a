//! Application state container shared across Axum route handlers and services.
//!
//! It is cloned into every handler via Axum's `State<T>` extractor; the SeaORM
//! connection inside is itself a cheap handle onto the pool.

#[derive(Clone)]
pub struct AppState {
    db: sea_orm::DatabaseConnection,
}

impl AppState {
    pub fn new(db: sea_orm::DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns a shared reference to the internal `DatabaseConnection`.
    pub fn db(&self) -> &sea_orm::DatabaseConnection {
        &self.db
    }

    /// Returns a cloned copy of the database connection.
    ///
    /// Useful for spawning tasks that require ownership.
    pub fn db_clone(&self) -> sea_orm::DatabaseConnection {
        self.db.clone()
    }
}
