//! Named cache store lifecycle and entry operations.
//!
//! A store is created empty, filled entry by entry, and flagged ready once
//! its populate finished. Deleting a store drops all of its entries.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use crate::Error;
use crate::network::Response;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Metadata row for one named store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreInfo {
    pub name: String,
    pub generation: u64,
    pub manifest_digest: String,
    pub ready: bool,
    pub created_at: String,
    pub ready_at: Option<String>,
    pub entries: u64,
}

/// A stored response keyed by resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub resource: String,
    pub fingerprint: Option<String>,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub stored_at: String,
}

impl StoredEntry {
    /// Capture a network response for storage.
    pub fn from_response(response: &Response, fingerprint: Option<&str>) -> Self {
        Self {
            resource: response.resource.clone(),
            fingerprint: fingerprint.map(str::to_string),
            status: response.status,
            content_type: response.content_type.clone(),
            headers: response.headers.clone(),
            body: response.body.clone(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Replay the stored response.
    pub fn into_response(self) -> Response {
        Response {
            resource: self.resource,
            status: self.status,
            content_type: self.content_type,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl CacheDb {
    /// Names of every store currently held.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Create an empty, not-yet-ready store.
    ///
    /// An existing store with the same name is replaced, entries included.
    pub async fn create_store(&self, name: &str, generation: u64, manifest_digest: &str) -> Result<(), Error> {
        let name = name.to_string();
        let manifest_digest = manifest_digest.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![name])?;
                tx.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                tx.execute(
                    "INSERT INTO cache_stores (name, generation, manifest_digest, ready, created_at)
                     VALUES (?1, ?2, ?3, 0, ?4)",
                    params![name, generation as i64, manifest_digest, created_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one store and its entries.
    ///
    /// Returns false if no store had that name.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every store this database manages.
    ///
    /// Returns the number of stores removed.
    pub async fn delete_all_stores(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries", [])?;
                let deleted = tx.execute("DELETE FROM cache_stores", [])?;
                tx.commit()?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Flag a store as fully populated.
    pub async fn mark_store_ready(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let ready_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let updated = conn.execute(
                    "UPDATE cache_stores SET ready = 1, ready_at = ?2 WHERE name = ?1",
                    params![name, ready_at],
                )?;
                if updated == 0 {
                    return Err(Error::InvalidInput(format!("no cache store named {name}")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Metadata for a store, or None if it doesn't exist.
    pub async fn store_info(&self, name: &str) -> Result<Option<StoreInfo>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoreInfo>, Error> {
                let result = conn.query_row(
                    "SELECT s.name, s.generation, s.manifest_digest, s.ready, s.created_at, s.ready_at,
                            (SELECT COUNT(*) FROM cache_entries e WHERE e.cache_name = s.name)
                     FROM cache_stores s WHERE s.name = ?1",
                    params![name],
                    |row| {
                        Ok(StoreInfo {
                            name: row.get(0)?,
                            generation: row.get::<_, i64>(1)? as u64,
                            manifest_digest: row.get(2)?,
                            ready: row.get::<_, i32>(3)? == 1,
                            created_at: row.get(4)?,
                            ready_at: row.get(5)?,
                            entries: row.get::<_, i64>(6)? as u64,
                        })
                    },
                );

                match result {
                    Ok(info) => Ok(Some(info)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace one entry in an existing store.
    pub async fn put_entry(&self, cache_name: &str, entry: &StoredEntry) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let entry = entry.clone();
        let headers_json = serde_json::to_string(&entry.headers)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (
                        cache_name, resource, fingerprint, status, content_type, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(cache_name, resource) DO UPDATE SET
                        fingerprint = excluded.fingerprint,
                        status = excluded.status,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &cache_name,
                        &entry.resource,
                        &entry.fingerprint,
                        entry.status as i64,
                        &entry.content_type,
                        &headers_json,
                        entry.body.as_ref(),
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a resource in a store.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn match_entry(&self, cache_name: &str, resource: &str) -> Result<Option<StoredEntry>, Error> {
        let cache_name = cache_name.to_string();
        let resource = resource.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let result = conn.query_row(
                    "SELECT resource, fingerprint, status, content_type, headers_json, body, stored_at
                     FROM cache_entries WHERE cache_name = ?1 AND resource = ?2",
                    params![cache_name, resource],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, Vec<u8>>(5)?,
                            row.get::<_, String>(6)?,
                        ))
                    },
                );

                let (resource, fingerprint, status, content_type, headers_json, body, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                Ok(Some(StoredEntry {
                    resource,
                    fingerprint,
                    status: u16::try_from(status)
                        .map_err(|_| Error::InvalidInput(format!("stored status out of range: {status}")))?,
                    content_type,
                    headers: serde_json::from_str(&headers_json)?,
                    body: Bytes::from(body),
                    stored_at,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Resource identifiers held by a store, sorted.
    pub async fn entry_keys(&self, cache_name: &str) -> Result<Vec<String>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT resource FROM cache_entries WHERE cache_name = ?1 ORDER BY resource")?;
                let keys = stmt
                    .query_map(params![cache_name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn entry_count(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
