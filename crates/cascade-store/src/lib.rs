//! Cascade Store - SQLite persistence for record graphs
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - [`SqliteRepository`], the `Repository` the engines write through

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use errors::Result;
pub use repo::SqliteRepository;
