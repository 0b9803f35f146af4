//! Data models for Spider Notes

mod note;
mod settings;
mod user;

pub use note::{Note, NoteId};
pub use settings::Preferences;
pub use user::User;
