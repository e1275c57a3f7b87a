use chrono::Utc;
use redb::{
    CommitError, Database, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Item not found in database: {0}")]
    NotFound(String),
}

/// Every collection lives in this one table: key -> serialized JSON list.
pub const COLLECTIONS: TableDefinition<&str, &str> = TableDefinition::new("collections");

// --- Fixed collection keys ---
pub const BLOG_POSTS_KEY: &str = "blog_posts";
pub const SUBSCRIBERS_KEY: &str = "newsletter_subscribers";
pub const FAQS_KEY: &str = "faqs";
pub const SUBSCRIBER_EMAIL_LOG_KEY: &str = "email_notifications";
pub const ADMIN_NOTIFICATION_LOG_KEY: &str = "admin_notifications";

pub fn comments_key(post_id: &str) -> String {
    format!("comments_{}", post_id)
}

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Millisecond wall-clock id, bumped so ids handed out by this process never repeat.
pub fn next_timestamp_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_ID.compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}

pub fn setup_content_db(db: &Database) -> Result<(), DbError> {
    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(COLLECTIONS)?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Raw JSON under `key`, `None` if the key (or the table) does not exist yet.
fn read_raw(db: &Database, key: &str) -> Result<Option<String>, DbError> {
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(COLLECTIONS) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value = table.get(key)?.map(|guard| guard.value().to_string());
    Ok(value)
}

fn write_raw(db: &Database, key: &str, json: &str) -> Result<(), DbError> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(COLLECTIONS)?;
        table.insert(key, json)?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn key_exists(db: &Database, key: &str) -> Result<bool, DbError> {
    Ok(read_raw(db, key)?.is_some())
}

/// Reads a whole collection. A missing key is an empty list; corrupt JSON is an error.
pub fn read_collection<T: DeserializeOwned>(db: &Database, key: &str) -> Result<Vec<T>, DbError> {
    match read_raw(db, key)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

/// Replaces the whole collection stored under `key`.
pub fn write_collection<T: Serialize>(db: &Database, key: &str, items: &[T]) -> Result<(), DbError> {
    let json = serde_json::to_string(items)?;
    write_raw(db, key, &json)
}

pub fn read_value<T: DeserializeOwned>(db: &Database, key: &str) -> Result<Option<T>, DbError> {
    match read_raw(db, key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub fn write_value<T: Serialize>(db: &Database, key: &str, value: &T) -> Result<(), DbError> {
    let json = serde_json::to_string(value)?;
    write_raw(db, key, &json)
}

/// Removing a key that is not there is fine.
pub fn remove_key(db: &Database, key: &str) -> Result<(), DbError> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(COLLECTIONS)?;
        table.remove(key)?;
    }
    write_txn.commit()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use redb::Database;
    use tempfile::TempDir;

    /// Fresh content database inside a temp dir. Keep the dir alive for the test.
    pub fn temp_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::create(dir.path().join("content.db")).expect("create db");
        super::setup_content_db(&db).expect("setup content db");
        (dir, db)
    }
}
