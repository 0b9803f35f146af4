//! Service facades shared by the clients.

mod note_service;

pub use note_service::NoteService;
