//! Infrastructure layer - database and external services.

mod db;
mod document;
pub mod migrations;

pub use db::Database;
pub use document::DocumentStore;
pub use migrations::Migrator;
