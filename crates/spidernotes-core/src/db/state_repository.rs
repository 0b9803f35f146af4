//! Persisted scalar state: sync watermarks and the encryption key

use crate::error::{Error, Result};
use libsql::Connection;

const FIRST_MODIFIED: &str = "first_modified";
const LAST_SYNCHRONIZED: &str = "last_synchronized";
const ENCRYPTION_KEY: &str = "encryption_key";

/// Trait for app state storage operations (async)
#[allow(async_fn_in_trait)]
pub trait StateRepository {
    /// Earliest unsynced local modification, or 0 when nothing is pending
    async fn first_modified(&self) -> Result<i64>;

    /// Guarded watermark assignment.
    ///
    /// `candidate` is stored iff it is 0, the stored value is 0, or it is
    /// older than the stored value. Returns the value stored afterwards.
    async fn propose_first_modified(&self, candidate: i64) -> Result<i64>;

    /// Reset the watermark to 0 iff it still equals `expected`.
    ///
    /// Returns true if the reset happened.
    async fn reset_first_modified(&self, expected: i64) -> Result<bool>;

    /// Server cursor of the last successful sync, or 0
    async fn last_synchronized(&self) -> Result<i64>;

    async fn set_last_synchronized(&self, value: i64) -> Result<()>;

    /// Stored derived key; `None` when encryption is disabled
    async fn encryption_key(&self) -> Result<Option<String>>;

    async fn set_encryption_key(&self, key: Option<&str>) -> Result<()>;

    /// Forget every stored scalar
    async fn clear(&self) -> Result<()>;
}

/// libSQL implementation of `StateRepository`
pub struct LibSqlStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlStateRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM app_state WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO app_state (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn remove_value(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM app_state WHERE key = ?", [key])
            .await?;
        Ok(())
    }

    async fn get_timestamp(&self, key: &str) -> Result<i64> {
        match self.get_value(key).await? {
            Some(value) => value
                .parse()
                .map_err(|_| Error::Database(format!("Invalid {key} value: {value}"))),
            None => Ok(0),
        }
    }
}

/// The watermark guard: keep the earliest pending modification.
pub(crate) const fn accepts_first_modified(current: i64, candidate: i64) -> bool {
    candidate == 0 || current == 0 || candidate < current
}

impl StateRepository for LibSqlStateRepository<'_> {
    async fn first_modified(&self) -> Result<i64> {
        self.get_timestamp(FIRST_MODIFIED).await
    }

    async fn propose_first_modified(&self, candidate: i64) -> Result<i64> {
        let current = self.first_modified().await?;
        if !accepts_first_modified(current, candidate) {
            return Ok(current);
        }
        self.set_value(FIRST_MODIFIED, &candidate.to_string())
            .await?;
        Ok(candidate)
    }

    async fn reset_first_modified(&self, expected: i64) -> Result<bool> {
        let current = self.first_modified().await?;
        if current != expected {
            tracing::debug!(
                "Keeping firstModified at {current}; a local edit arrived after {expected}"
            );
            return Ok(false);
        }
        self.set_value(FIRST_MODIFIED, "0").await?;
        Ok(true)
    }

    async fn last_synchronized(&self) -> Result<i64> {
        self.get_timestamp(LAST_SYNCHRONIZED).await
    }

    async fn set_last_synchronized(&self, value: i64) -> Result<()> {
        self.set_value(LAST_SYNCHRONIZED, &value.to_string()).await
    }

    async fn encryption_key(&self) -> Result<Option<String>> {
        Ok(self
            .get_value(ENCRYPTION_KEY)
            .await?
            .filter(|value| !value.trim().is_empty()))
    }

    async fn set_encryption_key(&self, key: Option<&str>) -> Result<()> {
        match key.filter(|key| !key.is_empty()) {
            Some(key) => self.set_value(ENCRYPTION_KEY, key).await,
            None => self.remove_value(ENCRYPTION_KEY).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM app_state", ()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_defaults() {
        let db = setup().await;
        let repo = LibSqlStateRepository::new(db.connection());

        assert_eq!(repo.first_modified().await.unwrap(), 0);
        assert_eq!(repo.last_synchronized().await.unwrap(), 0);
        assert!(repo.encryption_key().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_first_modified_keeps_earliest_pending_edit() {
        let db = setup().await;
        let repo = LibSqlStateRepository::new(db.connection());

        assert_eq!(repo.propose_first_modified(500).await.unwrap(), 500);
        assert_eq!(repo.propose_first_modified(300).await.unwrap(), 300);
        assert_eq!(repo.propose_first_modified(400).await.unwrap(), 300);
        assert_eq!(repo.first_modified().await.unwrap(), 300);

        assert_eq!(repo.propose_first_modified(0).await.unwrap(), 0);
        assert_eq!(repo.propose_first_modified(900).await.unwrap(), 900);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reset_first_modified_requires_matching_snapshot() {
        let db = setup().await;
        let repo = LibSqlStateRepository::new(db.connection());

        repo.propose_first_modified(300).await.unwrap();
        repo.propose_first_modified(250).await.unwrap();

        assert!(!repo.reset_first_modified(300).await.unwrap());
        assert_eq!(repo.first_modified().await.unwrap(), 250);

        assert!(repo.reset_first_modified(250).await.unwrap());
        assert_eq!(repo.first_modified().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_scalars_roundtrip_and_clear() {
        let db = setup().await;
        let repo = LibSqlStateRepository::new(db.connection());

        repo.set_last_synchronized(1234).await.unwrap();
        repo.set_encryption_key(Some("abc")).await.unwrap();

        assert_eq!(repo.last_synchronized().await.unwrap(), 1234);
        assert_eq!(repo.encryption_key().await.unwrap().as_deref(), Some("abc"));

        repo.set_encryption_key(None).await.unwrap();
        assert!(repo.encryption_key().await.unwrap().is_none());

        repo.clear().await.unwrap();
        assert_eq!(repo.last_synchronized().await.unwrap(), 0);
        assert!(repo.encryption_key().await.unwrap().is_none());
    }

    #[test]
    fn test_guard_rule() {
        assert!(accepts_first_modified(0, 500));
        assert!(accepts_first_modified(500, 300));
        assert!(accepts_first_modified(500, 0));
        assert!(!accepts_first_modified(300, 400));
        assert!(!accepts_first_modified(300, 300));
    }
}
