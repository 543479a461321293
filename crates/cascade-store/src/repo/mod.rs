//! Repository layer persisting record graphs to SQLite

pub mod sqlite_repo;

pub use sqlite_repo::SqliteRepository;
