//! spidernotes-core - Core library for Spider Notes
//!
//! This crate contains the note model, client-side encryption, the local
//! note store, and the synchronization engine shared by every Spider Notes
//! interface.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod events;
pub mod export;
pub mod merge;
pub mod models;
pub mod search;
pub mod services;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Note, NoteId};
