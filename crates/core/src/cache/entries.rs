//! Stored responses within a bucket.
//!
//! Writes are last-write-wins per (bucket, request key). Entries are fungible
//! snapshots of what the network last returned, so there is nothing to merge.

use super::connection::CacheDb;
use super::hash::content_digest;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response stored in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub bucket: String,
    pub request_key: String,
    /// URL the response was served from (after redirects).
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub digest: String,
    pub stored_at: String,
}

impl CachedEntry {
    /// Build an entry stamped with the current time and the body's digest.
    pub fn new(
        bucket: &str, request_key: &str, status_code: u16, content_type: Option<String>, headers_json: Option<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            bucket: bucket.to_string(),
            request_key: request_key.to_string(),
            url: request_key.to_string(),
            status_code,
            content_type,
            headers_json,
            digest: content_digest(&body),
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Record the URL the response actually came from.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Listing row for an entry, without its body.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub request_key: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body_len: u64,
    pub digest: String,
    pub stored_at: String,
}

fn bucket_exists(conn: &rusqlite::Connection, bucket: &str) -> Result<bool, Error> {
    let exists = conn.query_row("SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)", params![bucket], |row| {
        row.get(0)
    })?;
    Ok(exists)
}

fn upsert_entry(conn: &rusqlite::Connection, entry: &CachedEntry) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO entries (
            bucket, request_key, url, status_code, content_type, headers_json,
            body, digest, stored_at, body_len
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(bucket, request_key) DO UPDATE SET
            url = excluded.url,
            status_code = excluded.status_code,
            content_type = excluded.content_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            digest = excluded.digest,
            stored_at = excluded.stored_at,
            body_len = excluded.body_len",
        params![
            &entry.bucket,
            &entry.request_key,
            &entry.url,
            entry.status_code,
            &entry.content_type,
            &entry.headers_json,
            &entry.body,
            &entry.digest,
            &entry.stored_at,
            entry.body.len() as i64,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store one entry in an existing bucket.
    ///
    /// Replaces any previous entry under the same request key. Never creates
    /// the bucket: a write aimed at a deleted bucket fails with `InvalidState`.
    pub async fn put_entry(&self, entry: &CachedEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                if !bucket_exists(conn, &entry.bucket)? {
                    return Err(Error::InvalidState(format!("bucket {} does not exist", entry.bucket)));
                }
                upsert_entry(conn, &entry)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a batch of entries in a single transaction, creating their
    /// buckets as needed.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, entries: Vec<CachedEntry>) -> Result<usize, Error> {
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                for entry in &entries {
                    tx.execute(
                        "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                        params![&entry.bucket, &entry.stored_at],
                    )?;
                    upsert_entry(&tx, entry)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry stored under a request key.
    ///
    /// Returns None if the bucket or the key doesn't exist.
    pub async fn match_entry(&self, bucket: &str, request_key: &str) -> Result<Option<CachedEntry>, Error> {
        let bucket = bucket.to_string();
        let request_key = request_key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT bucket, request_key, url, status_code, content_type, headers_json,
                        body, digest, stored_at
                    FROM entries WHERE bucket = ?1 AND request_key = ?2",
                )?;

                let result = stmt.query_row(params![bucket, request_key], |row| {
                    Ok(CachedEntry {
                        bucket: row.get(0)?,
                        request_key: row.get(1)?,
                        url: row.get(2)?,
                        status_code: row.get(3)?,
                        content_type: row.get(4)?,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                        digest: row.get(7)?,
                        stored_at: row.get(8)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Request keys stored in a bucket, sorted.
    pub async fn entry_keys(&self, bucket: &str) -> Result<Vec<String>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT request_key FROM entries WHERE bucket = ?1 ORDER BY request_key")?;
                let keys = stmt
                    .query_map(params![bucket], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Summaries of every entry in a bucket, without bodies.
    pub async fn list_entries(&self, bucket: &str) -> Result<Vec<EntrySummary>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT request_key, status_code, content_type, body_len, digest, stored_at
                    FROM entries WHERE bucket = ?1 ORDER BY request_key",
                )?;
                let rows = stmt
                    .query_map(params![bucket], |row| {
                        Ok(EntrySummary {
                            request_key: row.get(0)?,
                            status_code: row.get(1)?,
                            content_type: row.get(2)?,
                            body_len: row.get::<_, i64>(3)? as u64,
                            digest: row.get(4)?,
                            stored_at: row.get(5)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &str = "site-cache-v1";

    fn make_entry(key: &str, body: &str) -> CachedEntry {
        CachedEntry::new(BUCKET, key, 200, Some("text/html".to_string()), None, body.as_bytes().to_vec())
    }

    async fn db_with_bucket() -> CacheDb {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket(BUCKET).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = db_with_bucket().await;
        let entry = make_entry("https://example.com/index.html", "<h1>hi</h1>");

        db.put_entry(&entry).await.unwrap();

        let found = db
            .match_entry(BUCKET, "https://example.com/index.html")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, entry);
        assert!(db.has_bucket(BUCKET).await.unwrap());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.match_entry(BUCKET, "https://example.com/nope").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_match_is_scoped_to_bucket() {
        let db = db_with_bucket().await;
        db.put_entry(&make_entry("https://example.com/", "old"))
            .await
            .unwrap();

        let other = db.match_entry("site-cache-v2", "https://example.com/").await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_put_is_last_write_wins() {
        let db = db_with_bucket().await;
        db.put_entry(&make_entry("https://example.com/app.css", "a{}"))
            .await
            .unwrap();
        db.put_entry(&make_entry("https://example.com/app.css", "b{}"))
            .await
            .unwrap();

        let found = db
            .match_entry(BUCKET, "https://example.com/app.css")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.body, b"b{}");
        assert_eq!(found.digest, content_digest(b"b{}"));
        assert_eq!(db.entry_keys(BUCKET).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_entries_batch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let written = db
            .put_entries(vec![
                make_entry("https://example.com/", "root"),
                make_entry("https://example.com/index.html", "index"),
            ])
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(
            db.entry_keys(BUCKET).await.unwrap(),
            vec!["https://example.com/", "https://example.com/index.html"]
        );
    }

    #[tokio::test]
    async fn test_list_entries_reports_size() {
        let db = db_with_bucket().await;
        db.put_entry(&make_entry("https://example.com/index.html", "12345"))
            .await
            .unwrap();

        let listed = db.list_entries(BUCKET).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].body_len, 5);
        assert_eq!(listed[0].status_code, 200);
    }

    #[tokio::test]
    async fn test_put_entry_requires_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let err = db.put_entry(&make_entry("https://example.com/", "root")).await.unwrap_err();

        assert!(matches!(err, Error::InvalidState(_)));
        assert!(!db.has_bucket(BUCKET).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_entry_after_bucket_deleted() {
        let db = db_with_bucket().await;
        db.put_entry(&make_entry("https://example.com/", "root")).await.unwrap();
        db.delete_bucket(BUCKET).await.unwrap();

        assert!(db.put_entry(&make_entry("https://example.com/", "late")).await.is_err());
        assert!(db.bucket_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_entries_creates_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entries(vec![make_entry("https://example.com/", "root")]).await.unwrap();
        assert!(db.has_bucket(BUCKET).await.unwrap());
    }

    #[test]
    fn test_with_url() {
        let entry = make_entry("https://example.com/", "root").with_url("https://example.com/home");
        assert_eq!(entry.request_key, "https://example.com/");
        assert_eq!(entry.url, "https://example.com/home");
    }
}
