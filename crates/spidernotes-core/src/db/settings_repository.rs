//! Preferences repository implementation

use crate::error::Result;
use crate::models::Preferences;
use libsql::Connection;

/// Trait for preferences storage operations (async)
#[allow(async_fn_in_trait)]
pub trait PreferencesRepository {
    /// Load preferences, falling back to defaults for missing keys
    async fn load(&self) -> Result<Preferences>;

    /// Save preferences to the database
    async fn save(&self, preferences: &Preferences) -> Result<()>;

    /// Remove every stored preference
    async fn clear(&self) -> Result<()>;
}

/// libSQL implementation of `PreferencesRepository`
pub struct LibSqlPreferencesRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPreferencesRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl PreferencesRepository for LibSqlPreferencesRepository<'_> {
    async fn load(&self) -> Result<Preferences> {
        let mut preferences = Preferences::default();

        if let Some(value) = self.get_setting("is_synchronization_enabled").await? {
            preferences.is_synchronization_enabled = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Some(value) = self.get_setting("editor_lines").await? {
            if let Ok(lines) = value.parse() {
                preferences.editor_lines = lines;
            }
        }

        if let Some(value) = self.get_setting("search_lines").await? {
            if let Ok(lines) = value.parse() {
                preferences.search_lines = lines;
            }
        }

        Ok(preferences)
    }

    async fn save(&self, preferences: &Preferences) -> Result<()> {
        self.set_setting(
            "is_synchronization_enabled",
            if preferences.is_synchronization_enabled {
                "true"
            } else {
                "false"
            },
        )
        .await?;
        self.set_setting("editor_lines", &preferences.editor_lines.to_string())
            .await?;
        self.set_setting("search_lines", &preferences.search_lines.to_string())
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM settings", ()).await?;
        Ok(())
    }
}

impl LibSqlPreferencesRepository<'_> {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}
