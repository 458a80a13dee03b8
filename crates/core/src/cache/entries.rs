//! Cache entry CRUD and partition maintenance.
//!
//! A partition is a named logical grouping of cached request/response
//! pairs. Partitions come into existence when their first entry is
//! inserted and disappear when activation garbage collection or trimming
//! deletes their last one.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached response, keyed by (partition, url).
///
/// Captures the response body, headers, and status at the time of
/// caching. Re-inserting the same key replaces the previous capture
/// and assigns a fresh insertion sequence, so a refreshed entry counts
/// as the newest in its partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub partition: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

const INSERT_SQL: &str = "INSERT OR REPLACE INTO cache_entries
    (partition_name, url, status, content_type, headers_json, body, stored_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

impl CacheDb {
    /// Insert or overwrite a single cache entry.
    ///
    /// Last write wins: a concurrent put for the same key simply
    /// replaces the row.
    pub async fn put_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    INSERT_SQL,
                    params![
                        &entry.partition,
                        &entry.url,
                        entry.status,
                        &entry.content_type,
                        &entry.headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert a batch of entries in a single transaction.
    ///
    /// Either every entry is committed or none are. Used by the precache
    /// install step, which must not leave a partially populated partition
    /// behind when one manifest asset cannot be fetched.
    pub async fn put_entries_atomic(&self, entries: Vec<CacheEntry>) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for entry in &entries {
                    tx.execute(
                        INSERT_SQL,
                        params![
                            &entry.partition,
                            &entry.url,
                            entry.status,
                            &entry.content_type,
                            &entry.headers_json,
                            &entry.body,
                            &entry.stored_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by partition and URL key.
    ///
    /// Returns None if the key doesn't exist.
    pub async fn get_entry(&self, partition: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let partition = partition.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT partition_name, url, status, content_type, headers_json, body, stored_at
                     FROM cache_entries WHERE partition_name = ?1 AND url = ?2",
                )?;

                let result = stmt.query_row(params![partition, url], |row| {
                    Ok(CacheEntry {
                        partition: row.get(0)?,
                        url: row.get(1)?,
                        status: row.get(2)?,
                        content_type: row.get(3)?,
                        headers_json: row.get(4)?,
                        body: row.get(5)?,
                        stored_at: row.get(6)?,
                    })
                });

                match result {
                    Ok(e) => Ok(Some(e)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries currently held by a partition.
    pub async fn count_entries(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE partition_name = ?1",
                    params![partition],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs held by a partition, oldest insertion first.
    pub async fn list_urls(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url FROM cache_entries WHERE partition_name = ?1 ORDER BY seq ASC",
                )?;
                let urls = stmt
                    .query_map(params![partition], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all partitions that currently hold at least one entry.
    pub async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT DISTINCT partition_name FROM cache_entries ORDER BY partition_name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition whose name is not in `keep`.
    ///
    /// Activation garbage collection: after a version bump this removes
    /// all previous-generation partitions and any orphans, leaving at
    /// most one generation of each partition type. Returns the number of
    /// deleted entries.
    pub async fn delete_partitions_except(&self, keep: &[String]) -> Result<u64, Error> {
        let keep = keep.to_vec();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                if keep.is_empty() {
                    let deleted = conn.execute("DELETE FROM cache_entries", [])?;
                    return Ok(deleted as u64);
                }
                let placeholders = (1..=keep.len())
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!("DELETE FROM cache_entries WHERE partition_name NOT IN ({placeholders})");
                let deleted = conn.execute(&sql, rusqlite::params_from_iter(keep.iter()))?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Trim a partition back to `max_entries`, deleting oldest-first.
    ///
    /// "Oldest" means lowest insertion sequence, not enumeration order.
    /// Returns the number of deleted entries; zero when the partition is
    /// already within its limit.
    pub async fn trim_partition(&self, partition: &str, max_entries: usize) -> Result<u64, Error> {
        let partition = partition.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE partition_name = ?1",
                    params![partition],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let surplus = count - max;
                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE seq IN (
                        SELECT seq FROM cache_entries
                        WHERE partition_name = ?1 ORDER BY seq ASC LIMIT ?2
                    )",
                    params![partition, surplus],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
