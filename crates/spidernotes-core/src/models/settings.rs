//! User preferences model

use serde::{Deserialize, Serialize};

/// User/application preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Whether notes are synchronized with the remote server
    pub is_synchronization_enabled: bool,
    /// Number of lines of text shown in the note editor
    pub editor_lines: u32,
    /// Number of notes shown in each page of the note lists
    pub search_lines: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            is_synchronization_enabled: false,
            editor_lines: 10,
            search_lines: 10,
        }
    }
}
