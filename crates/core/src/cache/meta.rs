//! Key/value metadata persisted alongside cache entries.
//!
//! Holds small operational state that must survive restarts, most
//! importantly which cache generation is currently activated.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Read a metadata value. Returns None when the key was never set.
    pub async fn get_meta(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result =
                    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0));
                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Set a metadata value, overwriting any previous one.
    pub async fn set_meta(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)", params![key, value])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_meta_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_meta("active_version").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_and_get_meta() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set_meta("active_version", "v1").await.unwrap();
        assert_eq!(db.get_meta("active_version").await.unwrap().as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_set_meta_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set_meta("active_version", "v1").await.unwrap();
        db.set_meta("active_version", "v2").await.unwrap();
        assert_eq!(db.get_meta("active_version").await.unwrap().as_deref(), Some("v2"));
    }
}
