use redb::Database;

use super::collections_db_operations::{self as collections, DbError, SUBSCRIBERS_KEY};

#[derive(Debug, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Appended; carries the new list size.
    Added(usize),
    AlreadySubscribed,
}

pub fn read_subscribers(db: &Database) -> Result<Vec<String>, DbError> {
    collections::read_collection(db, SUBSCRIBERS_KEY)
}

/// Appends `email` unless the exact string is already on the list.
pub fn add_subscriber(db: &Database, email: &str) -> Result<SubscribeOutcome, DbError> {
    let mut subscribers = read_subscribers(db)?;
    if subscribers.iter().any(|existing| existing == email) {
        return Ok(SubscribeOutcome::AlreadySubscribed);
    }
    subscribers.push(email.to_string());
    collections::write_collection(db, SUBSCRIBERS_KEY, &subscribers)?;
    Ok(SubscribeOutcome::Added(subscribers.len()))
}
