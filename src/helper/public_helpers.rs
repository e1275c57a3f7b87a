use redb::Database;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::config::SiteConfig;
use crate::helper::{notification_helpers, sanitization_helpers};
use crate::models::db_operations::collections_db_operations::DbError;
use crate::models::db_operations::subscribers_db_operations::{self, SubscribeOutcome};
use crate::models::db_operations::{comments_db_operations, posts_db_operations, resources_db_operations};
use crate::models::{Comment, Faq, Post, Resource, ResourceKind};
use crate::relay::{MailRelay, MembershipForwarder};

#[derive(Error, Debug)]
pub enum PublicHelperError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Something went wrong. Please try again.")]
    Upstream,
    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for PublicHelperError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => PublicHelperError::NotFound(what),
            other => PublicHelperError::Database(other),
        }
    }
}

fn required<'a>(values: &[&'a str], message: &str) -> Result<Vec<&'a str>, PublicHelperError> {
    let trimmed: Vec<&'a str> = values.iter().copied().map(str::trim).collect();
    if trimmed.iter().any(|v| v.is_empty()) {
        return Err(PublicHelperError::Validation(message.to_string()));
    }
    Ok(trimmed)
}

// --- Blog ---

pub fn list_published_posts(db: &Database) -> Result<Vec<Post>, PublicHelperError> {
    Ok(posts_db_operations::read_published_posts(db)?)
}

pub fn get_published_post(db: &Database, id: &str) -> Result<Post, PublicHelperError> {
    posts_db_operations::find_post(db, id)?
        .filter(|post| !post.is_draft)
        .ok_or_else(|| PublicHelperError::NotFound(format!("Post {} not found", id)))
}

/// Opening a post counts one view.
pub fn read_post(db: &Database, id: &str) -> Result<Post, PublicHelperError> {
    Ok(posts_db_operations::record_view(db, id)?)
}

// --- Comments ---

pub fn list_comments(db: &Database, post_id: &str) -> Result<Vec<Comment>, PublicHelperError> {
    Ok(comments_db_operations::read_comments(db, post_id)?)
}

/// Tags are stripped before the emptiness check, so markup alone is rejected.
fn clean_comment(author: &str, content: &str, message: &str) -> Result<(String, String), PublicHelperError> {
    let author = sanitization_helpers::strip_all_html(author);
    let content = sanitization_helpers::strip_all_html(content);
    required(&[author.as_str(), content.as_str()], message)?;
    Ok((author.trim().to_string(), content.trim().to_string()))
}

pub fn add_comment(db: &Database, post_id: &str, author: &str, content: &str) -> Result<Comment, PublicHelperError> {
    let (author, content) = clean_comment(author, content, "Please enter your name and comment")?;
    Ok(comments_db_operations::add_comment(db, post_id, &author, &content)?)
}

pub fn add_reply(
    db: &Database,
    post_id: &str,
    parent_id: &str,
    author: &str,
    content: &str,
) -> Result<Comment, PublicHelperError> {
    let (author, content) = clean_comment(author, content, "Please enter your name and reply")?;
    Ok(comments_db_operations::add_reply(db, post_id, parent_id, &author, &content)?)
}

pub fn toggle_like(
    db: &Database,
    post_id: &str,
    comment_id: &str,
    parent_id: Option<&str>,
    visitor_id: &str,
) -> Result<Comment, PublicHelperError> {
    let parent_id = parent_id.map(str::trim).filter(|id| !id.is_empty());
    Ok(comments_db_operations::toggle_like(db, post_id, comment_id, parent_id, visitor_id)?)
}

// --- Newsletter ---

static EMAIL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

/// Adds the address once. Only a new subscriber triggers the admin notification.
pub async fn subscribe(
    db: &Database,
    relay: &dyn MailRelay,
    site: &SiteConfig,
    email: &str,
) -> Result<SubscribeOutcome, PublicHelperError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(PublicHelperError::Validation("Please enter your email address".to_string()));
    }
    if !is_valid_email(email) {
        return Err(PublicHelperError::Validation("Please enter a valid email address".to_string()));
    }

    let outcome = subscribers_db_operations::add_subscriber(db, email)?;
    if let SubscribeOutcome::Added(total) = outcome {
        log::info!("New newsletter subscriber ({} total)", total);
        // The address is stored by now; a failed log append is only logged.
        if let Err(e) = notification_helpers::notify_new_subscriber(db, relay, site, email, total).await {
            log::error!("Failed to record the new subscriber notification for {}: {}", email, e);
        }
    }
    Ok(outcome)
}

// --- Resources & FAQs ---

pub fn list_resources(db: &Database, kind: ResourceKind, query: Option<&str>) -> Result<Vec<Resource>, PublicHelperError> {
    Ok(resources_db_operations::search_resources(db, kind, query)?)
}

pub fn open_resource(db: &Database, kind: ResourceKind, id: &str) -> Result<Resource, PublicHelperError> {
    Ok(resources_db_operations::record_download(db, kind, id)?)
}

pub fn list_faqs(db: &Database, query: Option<&str>) -> Result<Vec<Faq>, PublicHelperError> {
    Ok(resources_db_operations::search_faqs(db, query)?)
}

// --- Membership ---

pub async fn submit_membership(
    forwarder: &MembershipForwarder,
    fullname: &str,
    faculty: &str,
) -> Result<(), PublicHelperError> {
    let fields = required(&[fullname, faculty], "Please fill in all fields")?;
    forwarder.forward(fields[0], fields[1]).await.map_err(|e| {
        log::error!("Membership registration failed: {}", e);
        PublicHelperError::Upstream
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::notification_helpers::test_support::{site, RecordingRelay};
    use crate::models::db_operations::collections_db_operations::test_support::temp_db;
    use crate::models::db_operations::collections_db_operations::{self as collections, ADMIN_NOTIFICATION_LOG_KEY};

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("aisha@unilorin.edu.ng"));
        assert!(!is_valid_email("aisha@unilorin"));
        assert!(!is_valid_email("ai sha@x.io"));
        assert!(!is_valid_email("@x.io"));
    }

    #[test]
    fn blank_comment_fields_are_rejected() {
        let (_dir, db) = temp_db();
        let result = add_comment(&db, "1", "  ", "hello");
        assert!(matches!(result, Err(PublicHelperError::Validation(msg)) if msg == "Please enter your name and comment"));
        assert!(list_comments(&db, "1").unwrap().is_empty());
    }

    #[test]
    fn markup_only_comments_are_rejected() {
        let (_dir, db) = temp_db();
        let result = add_comment(&db, "1", "<b></b>", "hello");
        assert!(matches!(result, Err(PublicHelperError::Validation(_))));
        let result = add_comment(&db, "1", "Aisha", "<script>alert(1)</script>");
        assert!(matches!(result, Err(PublicHelperError::Validation(_))));
        assert!(list_comments(&db, "1").unwrap().is_empty());

        let parent = add_comment(&db, "1", "Aisha", "<i>Salam</i>").unwrap();
        assert_eq!(parent.content, "Salam");
        let result = add_reply(&db, "1", &parent.id, "Bello", " <p> </p> ");
        assert!(matches!(result, Err(PublicHelperError::Validation(msg)) if msg == "Please enter your name and reply"));
    }

    #[test]
    fn comment_fields_are_trimmed() {
        let (_dir, db) = temp_db();
        let comment = add_comment(&db, "1", " Aisha ", " Jazakallah khair ").unwrap();
        assert_eq!(comment.author, "Aisha");
        assert_eq!(comment.content, "Jazakallah khair");
    }

    #[actix_web::test]
    async fn duplicate_subscription_sends_nothing() {
        let (_dir, db) = temp_db();
        let relay = RecordingRelay::new(true);

        let first = subscribe(&db, &relay, &site(), " a@x.io ").await.unwrap();
        let second = subscribe(&db, &relay, &site(), "a@x.io").await.unwrap();

        assert_eq!(first, SubscribeOutcome::Added(1));
        assert_eq!(second, SubscribeOutcome::AlreadySubscribed);
        assert_eq!(relay.sent_count(), 1);
    }

    #[actix_web::test]
    async fn broken_admin_log_does_not_fail_the_signup() {
        let (_dir, db) = temp_db();
        let relay = RecordingRelay::new(true);
        collections::write_value(&db, ADMIN_NOTIFICATION_LOG_KEY, &"not a list").unwrap();

        let outcome = subscribe(&db, &relay, &site(), "a@x.io").await.unwrap();

        assert_eq!(outcome, SubscribeOutcome::Added(1));
        assert_eq!(relay.sent_count(), 1);
        assert_eq!(subscribers_db_operations::read_subscribers(&db).unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn invalid_email_is_not_stored() {
        let (_dir, db) = temp_db();
        let relay = RecordingRelay::new(true);
        let result = subscribe(&db, &relay, &site(), "not-an-email").await;
        assert!(matches!(result, Err(PublicHelperError::Validation(_))));
        assert!(subscribers_db_operations::read_subscribers(&db).unwrap().is_empty());
    }

    #[test]
    fn drafts_are_hidden_from_readers() {
        let (_dir, db) = temp_db();
        posts_db_operations::seed_default_posts(&db).unwrap();
        let mut post = posts_db_operations::find_post(&db, "1").unwrap().unwrap();
        post.is_draft = true;
        posts_db_operations::replace_post(&db, post).unwrap();

        assert!(matches!(get_published_post(&db, "1"), Err(PublicHelperError::NotFound(_))));
        assert!(matches!(read_post(&db, "1"), Err(PublicHelperError::NotFound(_))));
        assert_eq!(list_published_posts(&db).unwrap().len(), 2);
    }
}
