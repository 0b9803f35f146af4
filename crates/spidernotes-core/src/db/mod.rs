//! Database layer for Spider Notes

mod connection;
mod migrations;
mod repository;
mod settings_repository;
mod state_repository;

pub use connection::Database;
pub use repository::{LibSqlNoteRepository, NoteRepository};
pub use settings_repository::{LibSqlPreferencesRepository, PreferencesRepository};
pub use state_repository::{LibSqlStateRepository, StateRepository};
