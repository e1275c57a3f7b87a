use redb::Database;

use super::collections_db_operations::{
    self as collections, DbError, ADMIN_NOTIFICATION_LOG_KEY, SUBSCRIBER_EMAIL_LOG_KEY,
};
use crate::models::NotificationLogEntry;

/// The two append-only logs of outbound email attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLog {
    Subscriber,
    Admin,
}

impl NotificationLog {
    fn storage_key(self) -> &'static str {
        match self {
            NotificationLog::Subscriber => SUBSCRIBER_EMAIL_LOG_KEY,
            NotificationLog::Admin => ADMIN_NOTIFICATION_LOG_KEY,
        }
    }
}

pub fn read_log(db: &Database, log: NotificationLog) -> Result<Vec<NotificationLogEntry>, DbError> {
    collections::read_collection(db, log.storage_key())
}

pub fn append_entries(
    db: &Database,
    log: NotificationLog,
    entries: Vec<NotificationLogEntry>,
) -> Result<(), DbError> {
    if entries.is_empty() {
        return Ok(());
    }
    let mut stored = read_log(db, log)?;
    stored.extend(entries);
    collections::write_collection(db, log.storage_key(), &stored)
}

pub fn append_entry(db: &Database, log: NotificationLog, entry: NotificationLogEntry) -> Result<(), DbError> {
    append_entries(db, log, vec![entry])
}

pub fn clear_log(db: &Database, log: NotificationLog) -> Result<(), DbError> {
    collections::remove_key(db, log.storage_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::collections_db_operations::test_support::temp_db;

    fn entry(to: &str) -> NotificationLogEntry {
        NotificationLogEntry {
            to: to.to_string(),
            from: "system@example.org".to_string(),
            subject: "New Blog Post: Hello".to_string(),
            message: "body".to_string(),
            timestamp: "2025-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn logs_are_kept_apart_and_appended_in_order() {
        let (_dir, db) = temp_db();
        append_entries(&db, NotificationLog::Subscriber, vec![entry("a@x.io"), entry("b@x.io")]).unwrap();
        append_entry(&db, NotificationLog::Subscriber, entry("c@x.io")).unwrap();
        append_entry(&db, NotificationLog::Admin, entry("admin@x.io")).unwrap();

        let subscriber_log = read_log(&db, NotificationLog::Subscriber).unwrap();
        let recipients: Vec<&str> = subscriber_log.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(recipients, vec!["a@x.io", "b@x.io", "c@x.io"]);
        assert_eq!(read_log(&db, NotificationLog::Admin).unwrap().len(), 1);
    }

    #[test]
    fn clearing_one_log_leaves_the_other() {
        let (_dir, db) = temp_db();
        append_entry(&db, NotificationLog::Subscriber, entry("a@x.io")).unwrap();
        append_entry(&db, NotificationLog::Admin, entry("admin@x.io")).unwrap();

        clear_log(&db, NotificationLog::Subscriber).unwrap();
        assert!(read_log(&db, NotificationLog::Subscriber).unwrap().is_empty());
        assert_eq!(read_log(&db, NotificationLog::Admin).unwrap().len(), 1);
    }
}
