use chrono::Utc;
use redb::Database;
use thiserror::Error;

use crate::config::{Config, SiteConfig};
use crate::helper::autosave_helpers::AutosaveScheduler;
use crate::helper::notification_helpers::{self, FanOut};
use crate::helper::sanitization_helpers;
use crate::models::db_operations::collections_db_operations::{self as collections, DbError};
use crate::models::db_operations::notifications_db_operations::{self, NotificationLog};
use crate::models::db_operations::{posts_db_operations, resources_db_operations, subscribers_db_operations};
use crate::models::{
    DashboardStats, DraftTarget, Faq, FaqForm, NotificationLogEntry, Post, PostForm, Resource,
    ResourceForm, ResourceKind,
};
use crate::relay::MailRelay;

#[derive(Error, Debug)]
pub enum AdminHelperError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Redb Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for AdminHelperError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => AdminHelperError::NotFound(what),
            other => AdminHelperError::Database(other),
        }
    }
}

/// A stored post plus what happened to the subscriber announcement, if one was due.
#[derive(Debug)]
pub struct PostSaved {
    pub post: Post,
    pub announcement: Option<FanOut>,
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Only web and inline image URLs are kept as covers.
fn cover_or(image: &str, fallback: &str) -> String {
    let image = image.trim();
    if image.starts_with("https://") || image.starts_with("http://") || image.starts_with("data:image/") {
        image.to_string()
    } else {
        fallback.to_string()
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// Clean copy of the editor form: rich content is sanitized, plain fields stripped.
fn clean_post_form(form: &PostForm) -> PostForm {
    PostForm {
        title: sanitization_helpers::strip_all_html(form.title.trim()),
        content: sanitization_helpers::sanitize_post_content(&form.content),
        author: sanitization_helpers::strip_all_html(form.author.trim()),
        image: form.image.trim().to_string(),
        category: sanitization_helpers::strip_all_html(form.category.trim()),
        excerpt: sanitization_helpers::strip_all_html(form.excerpt.trim()),
        is_draft: form.is_draft,
    }
}

/// Required fields are checked after cleaning: markup alone does not count as text.
fn validated_post_form(form: &PostForm) -> Result<PostForm, AdminHelperError> {
    let clean = clean_post_form(form);
    let content_is_blank =
        sanitization_helpers::strip_all_html(&clean.content).trim().is_empty() && !clean.content.contains("<img");
    if clean.missing_required_fields() || content_is_blank {
        return Err(AdminHelperError::Validation("Please fill in all required fields".to_string()));
    }
    Ok(clean)
}

// ====================================================================
// ========================== CREDENTIALS =============================
// ====================================================================

pub fn verify_admin_credentials(config: &Config, email: &str, password: &str) -> bool {
    if email.trim() != config.admin_email {
        return false;
    }
    match bcrypt::verify(password, &config.admin_password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            log::error!("Stored admin password hash could not be checked: {}", e);
            false
        }
    }
}

pub fn hash_admin_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

// ====================================================================
// ============================== POSTS ===============================
// ====================================================================

pub fn fetch_all_posts(db: &Database) -> Result<Vec<Post>, AdminHelperError> {
    Ok(posts_db_operations::read_all_posts(db)?)
}

/// The pending autosave for the dialog is cancelled before anything is written,
/// so a timer firing during the subscriber fan-out cannot bring the snapshot back.
pub async fn create_post(
    db: &Database,
    relay: &dyn MailRelay,
    site: &SiteConfig,
    autosave: &AutosaveScheduler,
    form: &PostForm,
) -> Result<PostSaved, AdminHelperError> {
    let clean = validated_post_form(form)?;
    autosave.cancel(&DraftTarget::NewPost);
    let post = Post {
        id: collections::next_timestamp_id(),
        title: clean.title,
        content: clean.content,
        author: clean.author,
        date: today(),
        image: cover_or(&clean.image, &site.default_cover_image),
        category: clean.category,
        excerpt: clean.excerpt,
        is_draft: clean.is_draft,
        views: 0,
    };

    posts_db_operations::insert_post_front(db, post.clone())?;
    posts_db_operations::discard_autosave(db, &DraftTarget::NewPost)?;

    let announcement = if post.is_draft {
        None
    } else {
        Some(notification_helpers::notify_post_published(db, relay, site, &post.title).await?)
    };
    Ok(PostSaved { post, announcement })
}

/// Keeps id, date and views. Subscribers hear about it only on a draft to published switch.
pub async fn update_post(
    db: &Database,
    relay: &dyn MailRelay,
    site: &SiteConfig,
    autosave: &AutosaveScheduler,
    id: &str,
    form: &PostForm,
) -> Result<PostSaved, AdminHelperError> {
    let clean = validated_post_form(form)?;
    let existing = posts_db_operations::find_post(db, id)?
        .ok_or_else(|| AdminHelperError::NotFound(format!("Post {} not found", id)))?;
    autosave.cancel(&DraftTarget::Existing(id.to_string()));

    let image = if clean.image.is_empty() {
        existing.image.clone()
    } else {
        cover_or(&clean.image, &existing.image)
    };
    let post = Post {
        title: clean.title,
        content: clean.content,
        author: clean.author,
        image,
        category: clean.category,
        excerpt: clean.excerpt,
        is_draft: clean.is_draft,
        ..existing.clone()
    };

    posts_db_operations::replace_post(db, post.clone())?;
    posts_db_operations::discard_autosave(db, &DraftTarget::Existing(id.to_string()))?;

    let announcement = if existing.is_draft && !post.is_draft {
        Some(notification_helpers::notify_post_published(db, relay, site, &post.title).await?)
    } else {
        None
    };
    Ok(PostSaved { post, announcement })
}

pub fn delete_post(db: &Database, id: &str) -> Result<bool, AdminHelperError> {
    Ok(posts_db_operations::delete_post(db, id)?)
}

/// Closing the create dialog with unsaved text keeps it as a new draft post.
pub fn close_create_dialog(db: &Database, site: &SiteConfig, form: &PostForm) -> Result<Option<Post>, AdminHelperError> {
    let saved = if form.has_content() {
        let clean = clean_post_form(form);
        let post = Post {
            id: format!("draft_{}", collections::next_timestamp_id()),
            title: or_placeholder(&clean.title, "Untitled Draft"),
            content: clean.content,
            author: or_placeholder(&clean.author, "Unknown Author"),
            date: today(),
            image: cover_or(&clean.image, &site.default_cover_image),
            category: or_placeholder(&clean.category, "Events"),
            excerpt: or_placeholder(&clean.excerpt, "Auto-saved draft"),
            is_draft: true,
            views: 0,
        };
        posts_db_operations::insert_post_front(db, post.clone())?;
        Some(post)
    } else {
        None
    };
    posts_db_operations::discard_autosave(db, &DraftTarget::NewPost)?;
    Ok(saved)
}

/// Closing the edit dialog with unsaved text merges it in and puts the post back into drafts.
pub fn close_edit_dialog(db: &Database, id: &str, form: &PostForm) -> Result<Option<Post>, AdminHelperError> {
    let target = DraftTarget::Existing(id.to_string());
    let saved = match posts_db_operations::find_post(db, id)? {
        Some(existing) if form.has_content() => {
            let clean = clean_post_form(form);
            let keep = |new: String, old: &str| if new.is_empty() { old.to_string() } else { new };
            let post = Post {
                title: keep(clean.title, &existing.title),
                content: keep(clean.content, &existing.content),
                author: keep(clean.author, &existing.author),
                image: keep(clean.image, &existing.image),
                category: keep(clean.category, &existing.category),
                excerpt: keep(clean.excerpt, &existing.excerpt),
                is_draft: true,
                ..existing.clone()
            };
            posts_db_operations::replace_post(db, post.clone())?;
            posts_db_operations::discard_autosave(db, &target)?;
            Some(post)
        }
        _ => None,
    };
    Ok(saved)
}

pub fn read_draft_snapshot(db: &Database, target: &DraftTarget) -> Result<Option<PostForm>, AdminHelperError> {
    Ok(posts_db_operations::read_autosave(db, target)?)
}

pub fn discard_draft_snapshot(db: &Database, target: &DraftTarget) -> Result<(), AdminHelperError> {
    Ok(posts_db_operations::discard_autosave(db, target)?)
}

pub fn dashboard_stats(db: &Database) -> Result<DashboardStats, AdminHelperError> {
    let posts = posts_db_operations::read_all_posts(db)?;
    let drafts = posts.iter().filter(|post| post.is_draft).count();
    Ok(DashboardStats {
        total_posts: posts.len(),
        published_posts: posts.len() - drafts,
        draft_posts: drafts,
        total_views: posts.iter().map(|post| post.views).sum(),
        subscribers: subscribers_db_operations::read_subscribers(db)?.len(),
    })
}

pub fn fetch_subscribers(db: &Database) -> Result<Vec<String>, AdminHelperError> {
    Ok(subscribers_db_operations::read_subscribers(db)?)
}

// ====================================================================
// ============================ RESOURCES =============================
// ====================================================================

fn clean_resource_form(form: &ResourceForm) -> Result<ResourceForm, AdminHelperError> {
    let clean = ResourceForm {
        title: sanitization_helpers::strip_all_html(form.title.trim()),
        description: sanitization_helpers::strip_all_html(form.description.trim()),
        file_url: form.file_url.trim().to_string(),
        file_size: form.file_size.trim().to_string(),
        file_type: form.file_type,
        file_name: sanitization_helpers::strip_all_html(form.file_name.trim()),
    };
    if clean.title.is_empty() || clean.description.is_empty() || clean.file_url.is_empty() {
        return Err(AdminHelperError::Validation("Please fill in all required fields".to_string()));
    }
    Ok(clean)
}

pub fn fetch_resources(db: &Database, kind: ResourceKind) -> Result<Vec<Resource>, AdminHelperError> {
    Ok(resources_db_operations::read_resources(db, kind)?)
}

pub async fn add_resource(
    db: &Database,
    relay: &dyn MailRelay,
    site: &SiteConfig,
    kind: ResourceKind,
    form: &ResourceForm,
) -> Result<(Resource, FanOut), AdminHelperError> {
    let clean = clean_resource_form(form)?;
    let resource = resources_db_operations::create_resource(db, kind, &clean)?;
    let announcement = notification_helpers::notify_resource_published(db, relay, site, &resource).await?;
    Ok((resource, announcement))
}

pub fn update_resource(db: &Database, kind: ResourceKind, id: &str, form: &ResourceForm) -> Result<Resource, AdminHelperError> {
    let clean = clean_resource_form(form)?;
    Ok(resources_db_operations::update_resource(db, kind, id, &clean)?)
}

pub fn delete_resource(db: &Database, kind: ResourceKind, id: &str) -> Result<bool, AdminHelperError> {
    Ok(resources_db_operations::delete_resource(db, kind, id)?)
}

// ====================================================================
// =============================== FAQS ===============================
// ====================================================================

fn clean_faq_form(form: &FaqForm) -> Result<FaqForm, AdminHelperError> {
    let clean = FaqForm {
        question: sanitization_helpers::strip_all_html(form.question.trim()),
        answer: sanitization_helpers::strip_all_html(form.answer.trim()),
        category: or_placeholder(&sanitization_helpers::strip_all_html(form.category.trim()), "Membership"),
    };
    if clean.question.is_empty() || clean.answer.is_empty() {
        return Err(AdminHelperError::Validation("Please fill in all fields".to_string()));
    }
    Ok(clean)
}

pub fn fetch_faqs(db: &Database) -> Result<Vec<Faq>, AdminHelperError> {
    Ok(resources_db_operations::read_faqs(db)?)
}

pub fn add_faq(db: &Database, form: &FaqForm) -> Result<Faq, AdminHelperError> {
    let clean = clean_faq_form(form)?;
    Ok(resources_db_operations::create_faq(db, &clean)?)
}

pub fn update_faq(db: &Database, id: &str, form: &FaqForm) -> Result<Faq, AdminHelperError> {
    let clean = clean_faq_form(form)?;
    Ok(resources_db_operations::update_faq(db, id, &clean)?)
}

pub fn delete_faq(db: &Database, id: &str) -> Result<bool, AdminHelperError> {
    Ok(resources_db_operations::delete_faq(db, id)?)
}

// ====================================================================
// ========================= NOTIFICATION LOGS ========================
// ====================================================================

/// Newest first, for the viewer.
pub fn fetch_log(db: &Database, log: NotificationLog) -> Result<Vec<NotificationLogEntry>, AdminHelperError> {
    let mut entries = notifications_db_operations::read_log(db, log)?;
    entries.reverse();
    Ok(entries)
}

pub fn clear_log(db: &Database, log: NotificationLog) -> Result<(), AdminHelperError> {
    Ok(notifications_db_operations::clear_log(db, log)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::notification_helpers::test_support::{site, RecordingRelay, SlowRelay};
    use crate::models::db_operations::collections_db_operations::test_support::temp_db;
    use std::time::Duration;

    fn idle_autosave() -> AutosaveScheduler {
        AutosaveScheduler::new(Duration::from_secs(2))
    }

    fn form(title: &str, is_draft: bool) -> PostForm {
        PostForm {
            title: title.to_string(),
            content: "<p>Body</p>".to_string(),
            author: "Fatimah Yusuf".to_string(),
            excerpt: "Short summary".to_string(),
            is_draft,
            ..PostForm::default()
        }
    }

    #[actix_web::test]
    async fn publishing_without_required_fields_fails() {
        let (_dir, db) = temp_db();
        let relay = RecordingRelay::new(true);
        let mut incomplete = form("Title", false);
        incomplete.excerpt = "   ".to_string();

        let result = create_post(&db, &relay, &site(), &idle_autosave(), &incomplete).await;
        assert!(matches!(result, Err(AdminHelperError::Validation(_))));
        assert!(fetch_all_posts(&db).unwrap().is_empty());
    }

    #[actix_web::test]
    async fn markup_alone_does_not_fill_required_fields() {
        let (_dir, db) = temp_db();
        let relay = RecordingRelay::new(true);

        let mut tags_only = form("<b></b>", false);
        let result = create_post(&db, &relay, &site(), &idle_autosave(), &tags_only).await;
        assert!(matches!(result, Err(AdminHelperError::Validation(_))));

        tags_only.title = "Real title".to_string();
        tags_only.content = "<script>alert(1)</script>".to_string();
        let result = create_post(&db, &relay, &site(), &idle_autosave(), &tags_only).await;
        assert!(matches!(result, Err(AdminHelperError::Validation(_))));
        assert!(fetch_all_posts(&db).unwrap().is_empty());

        tags_only.content = "<p><img src=\"https://images.example.org/a.jpg\"></p>".to_string();
        assert!(create_post(&db, &relay, &site(), &idle_autosave(), &tags_only).await.is_ok());
    }

    #[actix_web::test]
    async fn pending_snapshot_does_not_outlive_a_slow_publish() {
        let (_dir, db) = temp_db();
        let db = actix_web::web::Data::new(db);
        subscribers_db_operations::add_subscriber(&db, "a@x.io").unwrap();
        let autosave = AutosaveScheduler::new(Duration::from_millis(30));
        assert!(autosave.schedule(db.clone(), DraftTarget::NewPost, form("typing", true)));

        let relay = SlowRelay { delay: Duration::from_millis(150) };
        let saved = create_post(&db, &relay, &site(), &autosave, &form("Published", false)).await.unwrap();
        assert_eq!(saved.announcement, Some(FanOut::Sent { recipients: 1, delivered: 1 }));

        actix_web::rt::time::sleep(Duration::from_millis(80)).await;
        assert!(read_draft_snapshot(&db, &DraftTarget::NewPost).unwrap().is_none());
        assert_eq!(autosave.pending_count(), 0);
    }

    #[actix_web::test]
    async fn pending_edit_snapshot_is_dropped_when_the_edit_is_saved() {
        let (_dir, db) = temp_db();
        let db = actix_web::web::Data::new(db);
        let relay = RecordingRelay::new(true);
        let post = create_post(&db, &relay, &site(), &idle_autosave(), &form("Draft", true)).await.unwrap().post;
        subscribers_db_operations::add_subscriber(&db, "a@x.io").unwrap();

        let target = DraftTarget::Existing(post.id.clone());
        let autosave = AutosaveScheduler::new(Duration::from_millis(30));
        assert!(autosave.schedule(db.clone(), target.clone(), form("typing", true)));

        let slow = SlowRelay { delay: Duration::from_millis(150) };
        update_post(&db, &slow, &site(), &autosave, &post.id, &form("Published", false)).await.unwrap();

        actix_web::rt::time::sleep(Duration::from_millis(80)).await;
        assert!(read_draft_snapshot(&db, &target).unwrap().is_none());
    }

    #[actix_web::test]
    async fn new_post_gets_defaults_and_clears_the_new_snapshot() {
        let (_dir, db) = temp_db();
        let relay = RecordingRelay::new(true);
        posts_db_operations::write_autosave(&db, &DraftTarget::NewPost, &form("half", true)).unwrap();

        let saved = create_post(&db, &relay, &site(), &idle_autosave(), &form("Ramadan Lectures", false)).await.unwrap();

        assert_eq!(saved.post.image, site().default_cover_image);
        assert_eq!(saved.post.views, 0);
        assert_eq!(saved.post.date, today());
        assert_eq!(saved.announcement, Some(FanOut::NoSubscribers));
        assert!(posts_db_operations::read_autosave(&db, &DraftTarget::NewPost).unwrap().is_none());
    }

    #[actix_web::test]
    async fn draft_creation_does_not_announce() {
        let (_dir, db) = temp_db();
        subscribers_db_operations::add_subscriber(&db, "a@x.io").unwrap();
        let relay = RecordingRelay::new(true);

        let saved = create_post(&db, &relay, &site(), &idle_autosave(), &form("Later", true)).await.unwrap();
        assert!(saved.announcement.is_none());
        assert_eq!(relay.sent_count(), 0);
    }

    #[actix_web::test]
    async fn only_draft_to_published_announces_on_update() {
        let (_dir, db) = temp_db();
        subscribers_db_operations::add_subscriber(&db, "a@x.io").unwrap();
        let relay = RecordingRelay::new(true);
        let draft = create_post(&db, &relay, &site(), &idle_autosave(), &form("Later", true)).await.unwrap().post;
        posts_db_operations::record_view(&db, &draft.id).unwrap_err();

        let published = update_post(&db, &relay, &site(), &idle_autosave(), &draft.id, &form("Now", false)).await.unwrap();
        assert_eq!(published.announcement, Some(FanOut::Sent { recipients: 1, delivered: 1 }));
        assert_eq!(published.post.id, draft.id);
        assert_eq!(published.post.image, draft.image);

        let edited = update_post(&db, &relay, &site(), &idle_autosave(), &draft.id, &form("Now again", false)).await.unwrap();
        assert!(edited.announcement.is_none());
        assert_eq!(relay.sent_count(), 1);
    }

    #[test]
    fn closing_create_dialog_keeps_a_placeholder_draft() {
        let (_dir, db) = temp_db();
        let partial = PostForm { title: "Half written".to_string(), ..PostForm::default() };

        let draft = close_create_dialog(&db, &site(), &partial).unwrap().unwrap();
        assert!(draft.id.starts_with("draft_"));
        assert!(draft.is_draft);
        assert_eq!(draft.author, "Unknown Author");
        assert_eq!(draft.excerpt, "Auto-saved draft");
        assert_eq!(fetch_all_posts(&db).unwrap().len(), 1);

        assert!(close_create_dialog(&db, &site(), &PostForm::default()).unwrap().is_none());
        assert_eq!(fetch_all_posts(&db).unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn closing_edit_dialog_reverts_to_draft() {
        let (_dir, db) = temp_db();
        let relay = RecordingRelay::new(true);
        let post = create_post(&db, &relay, &site(), &idle_autosave(), &form("Published", false)).await.unwrap().post;

        let change = PostForm { title: "Retitled".to_string(), ..PostForm::default() };
        let reverted = close_edit_dialog(&db, &post.id, &change).unwrap().unwrap();

        assert!(reverted.is_draft);
        assert_eq!(reverted.title, "Retitled");
        assert_eq!(reverted.author, "Fatimah Yusuf");
        assert_eq!(reverted.category, "Events");
    }

    #[actix_web::test]
    async fn closing_edit_dialog_without_changes_keeps_the_snapshot() {
        let (_dir, db) = temp_db();
        let relay = RecordingRelay::new(true);
        let post = create_post(&db, &relay, &site(), &idle_autosave(), &form("Published", false)).await.unwrap().post;
        let target = DraftTarget::Existing(post.id.clone());
        posts_db_operations::write_autosave(&db, &target, &form("Earlier edit", true)).unwrap();

        assert!(close_edit_dialog(&db, &post.id, &PostForm::default()).unwrap().is_none());
        assert_eq!(read_draft_snapshot(&db, &target).unwrap().unwrap().title, "Earlier edit");

        let change = PostForm { title: "Retitled".to_string(), ..PostForm::default() };
        close_edit_dialog(&db, &post.id, &change).unwrap().unwrap();
        assert!(read_draft_snapshot(&db, &target).unwrap().is_none());
    }

    #[actix_web::test]
    async fn stats_count_posts_views_and_subscribers() {
        let (_dir, db) = temp_db();
        posts_db_operations::seed_default_posts(&db).unwrap();
        posts_db_operations::record_view(&db, "1").unwrap();
        posts_db_operations::record_view(&db, "2").unwrap();
        subscribers_db_operations::add_subscriber(&db, "a@x.io").unwrap();
        let relay = RecordingRelay::new(true);
        create_post(&db, &relay, &site(), &idle_autosave(), &form("Draft", true)).await.unwrap();

        let stats = dashboard_stats(&db).unwrap();
        assert_eq!(stats, DashboardStats {
            total_posts: 4,
            published_posts: 3,
            draft_posts: 1,
            total_views: 2,
            subscribers: 1,
        });
    }

    #[test]
    fn faq_needs_question_and_answer() {
        let (_dir, db) = temp_db();
        let result = add_faq(&db, &FaqForm {
            question: "Where?".to_string(),
            answer: " ".to_string(),
            category: String::new(),
        });
        assert!(matches!(result, Err(AdminHelperError::Validation(msg)) if msg == "Please fill in all fields"));

        let faq = add_faq(&db, &FaqForm {
            question: "Where?".to_string(),
            answer: "Central Mosque".to_string(),
            category: String::new(),
        })
        .unwrap();
        assert_eq!(faq.category, "Membership");
    }

    #[test]
    fn credentials_check_email_and_bcrypt_hash() {
        let hash = bcrypt::hash("mssnuil123", 4).unwrap();
        let mut config = crate::config::Config {
            web: crate::config::WebConfig { host: "127.0.0.1".into(), port: 0 },
            site: site(),
            relay: crate::config::RelayConfig { endpoint: String::new(), membership_endpoint: String::new() },
            autosave_delay_ms: 10,
            database_path: "/tmp".into(),
            allowed_origins: String::new(),
            log_level: "info".into(),
            session_secret_key: String::new(),
            admin_url_prefix: "admin".into(),
            admin_email: "admin@mssnuil".into(),
            admin_password_hash: hash,
            relay_access_key: String::new(),
            use_secure_cookies: false,
        };
        assert!(verify_admin_credentials(&config, "admin@mssnuil", "mssnuil123"));
        assert!(!verify_admin_credentials(&config, "admin@mssnuil", "wrong"));
        assert!(!verify_admin_credentials(&config, "other@mssnuil", "mssnuil123"));

        config.admin_password_hash = "not-a-hash".into();
        assert!(!verify_admin_credentials(&config, "admin@mssnuil", "mssnuil123"));
    }
}
