use futures_util::future::BoxFuture;
use redb::Database;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

use society_site::config::SiteConfig;
use society_site::helper::admin_helpers;
use society_site::helper::autosave_helpers::AutosaveScheduler;
use society_site::helper::notification_helpers::FanOut;
use society_site::helper::public_helpers::{self, PublicHelperError};
use society_site::models::db_operations::collections_db_operations;
use society_site::models::db_operations::notifications_db_operations::NotificationLog;
use society_site::models::db_operations::subscribers_db_operations::SubscribeOutcome;
use society_site::models::{DraftTarget, PostForm, ResourceForm, ResourceKind};
use society_site::relay::{MailRelay, OutboundEmail, RelayError};

struct FakeRelay {
    sent: Mutex<Vec<OutboundEmail>>,
    accept: bool,
}

impl FakeRelay {
    fn new(accept: bool) -> Self {
        Self { sent: Mutex::new(Vec::new()), accept }
    }

    fn subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|email| email.subject.clone()).collect()
    }
}

impl MailRelay for FakeRelay {
    fn send<'a>(&'a self, email: &'a OutboundEmail) -> BoxFuture<'a, Result<bool, RelayError>> {
        self.sent.lock().unwrap().push(email.clone());
        let accept = self.accept;
        Box::pin(async move { Ok(accept) })
    }
}

fn site() -> SiteConfig {
    SiteConfig {
        name: "MSSN UNILORIN".to_string(),
        contact_email: "office@example.org".to_string(),
        contact_phone: "+2340000000000".to_string(),
        website: "www.example.org".to_string(),
        system_sender: "system@example.org".to_string(),
        default_cover_image: "https://images.example.org/cover.jpg".to_string(),
    }
}

fn content_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::create(dir.path().join("content.db")).unwrap();
    collections_db_operations::setup_content_db(&db).unwrap();
    (dir, db)
}

/// No snapshot is ever scheduled on it; it only receives cancels.
fn idle_autosave() -> AutosaveScheduler {
    AutosaveScheduler::new(Duration::from_secs(2))
}

fn post_form(title: &str, is_draft: bool) -> PostForm {
    PostForm {
        title: title.to_string(),
        content: "B".to_string(),
        author: "C".to_string(),
        excerpt: "D".to_string(),
        is_draft,
        ..PostForm::default()
    }
}

#[actix_web::test]
async fn published_post_is_listed_and_counts_views() {
    let (_dir, db) = content_db();
    let relay = FakeRelay::new(true);

    let saved = admin_helpers::create_post(&db, &relay, &site(), &idle_autosave(), &post_form("A", false)).await.unwrap();
    assert_eq!(saved.announcement, Some(FanOut::NoSubscribers));
    assert!(relay.subjects().is_empty());

    let listed = public_helpers::list_published_posts(&db).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "A");
    assert_eq!(listed[0].views, 0);
    assert_eq!(listed[0].image, site().default_cover_image);

    let opened = public_helpers::read_post(&db, &saved.post.id).unwrap();
    assert_eq!(opened.views, 1);
    assert_eq!(public_helpers::get_published_post(&db, &saved.post.id).unwrap().views, 1);
}

#[actix_web::test]
async fn subscribers_hear_about_posts_only_when_published() {
    let (_dir, db) = content_db();
    let relay = FakeRelay::new(true);

    for email in ["aisha@example.org", "bello@example.org"] {
        let outcome = public_helpers::subscribe(&db, &relay, &site(), email).await.unwrap();
        assert!(matches!(outcome, SubscribeOutcome::Added(_)));
    }
    let again = public_helpers::subscribe(&db, &relay, &site(), "aisha@example.org").await.unwrap();
    assert_eq!(again, SubscribeOutcome::AlreadySubscribed);
    assert_eq!(relay.subjects().len(), 2);
    assert_eq!(admin_helpers::fetch_subscribers(&db).unwrap().len(), 2);

    let draft = admin_helpers::create_post(&db, &relay, &site(), &idle_autosave(), &post_form("Ramadan plans", true)).await.unwrap();
    assert_eq!(draft.announcement, None);
    assert!(public_helpers::list_published_posts(&db).unwrap().is_empty());
    assert!(matches!(
        public_helpers::read_post(&db, &draft.post.id),
        Err(PublicHelperError::NotFound(_))
    ));

    let published = admin_helpers::update_post(&db, &relay, &site(), &idle_autosave(), &draft.post.id, &post_form("Ramadan plans", false))
        .await
        .unwrap();
    assert_eq!(published.announcement, Some(FanOut::Sent { recipients: 2, delivered: 2 }));
    assert_eq!(published.post.id, draft.post.id);

    // Editing an already published post stays quiet.
    let edited = admin_helpers::update_post(&db, &relay, &site(), &idle_autosave(), &draft.post.id, &post_form("Ramadan plans 2", false))
        .await
        .unwrap();
    assert_eq!(edited.announcement, None);

    let subscriber_log = admin_helpers::fetch_log(&db, NotificationLog::Subscriber).unwrap();
    assert_eq!(subscriber_log.len(), 2);
    assert!(subscriber_log.iter().all(|entry| entry.subject == "✨ New Post: Ramadan plans"));

    let admin_log = admin_helpers::fetch_log(&db, NotificationLog::Admin).unwrap();
    assert_eq!(admin_log.len(), 3);
    assert_eq!(admin_log[0].subject, "✅ Blog Post Published Successfully");
    assert!(admin_log[0].message.contains("• aisha@example.org"));

    admin_helpers::clear_log(&db, NotificationLog::Subscriber).unwrap();
    assert!(admin_helpers::fetch_log(&db, NotificationLog::Subscriber).unwrap().is_empty());
    assert_eq!(admin_helpers::fetch_log(&db, NotificationLog::Admin).unwrap().len(), 3);
}

#[actix_web::test]
async fn refused_deliveries_are_still_logged() {
    let (_dir, db) = content_db();
    let relay = FakeRelay::new(false);
    public_helpers::subscribe(&db, &relay, &site(), "aisha@example.org").await.unwrap();

    let form = ResourceForm {
        title: "Fiqh of Fasting".to_string(),
        description: "Notes from the weekly halaqah".to_string(),
        file_url: "https://files.example.org/fiqh.pdf".to_string(),
        ..ResourceForm::default()
    };
    let (resource, announcement) =
        admin_helpers::add_resource(&db, &relay, &site(), ResourceKind::Books, &form).await.unwrap();
    assert_eq!(resource.category, "Book");
    assert_eq!(announcement, FanOut::Sent { recipients: 1, delivered: 0 });

    let log = admin_helpers::fetch_log(&db, NotificationLog::Subscriber).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].subject, "📚 New Book Available - MSSN UNILORIN");

    let opened = public_helpers::open_resource(&db, ResourceKind::Books, &resource.id).unwrap();
    assert_eq!(opened.views, Some(1));
    assert_eq!(public_helpers::list_resources(&db, ResourceKind::Books, Some("FASTING")).unwrap().len(), 1);
    assert!(public_helpers::list_resources(&db, ResourceKind::Reports, None).unwrap().is_empty());
}

#[test]
fn closing_the_create_dialog_keeps_typed_text_as_a_draft() {
    let (_dir, db) = content_db();
    let form = PostForm { title: "Half written".to_string(), ..PostForm::default() };

    let draft = admin_helpers::close_create_dialog(&db, &site(), &form).unwrap().unwrap();
    assert!(draft.id.starts_with("draft_"));
    assert!(draft.is_draft);
    assert_eq!(draft.author, "Unknown Author");
    assert_eq!(draft.excerpt, "Auto-saved draft");
    assert!(admin_helpers::read_draft_snapshot(&db, &DraftTarget::NewPost).unwrap().is_none());

    assert!(admin_helpers::close_create_dialog(&db, &site(), &PostForm::default()).unwrap().is_none());
    assert_eq!(admin_helpers::fetch_all_posts(&db).unwrap().len(), 1);
    assert!(public_helpers::list_published_posts(&db).unwrap().is_empty());
}

#[test]
fn replies_and_likes_stay_under_their_parent() {
    let (_dir, db) = content_db();
    let parent = public_helpers::add_comment(&db, "p1", "Aisha", "JazakAllah khair").unwrap();
    let reply = public_helpers::add_reply(&db, "p1", &parent.id, "Bello", "Ameen").unwrap();

    let liked = public_helpers::toggle_like(&db, "p1", &reply.id, Some(&parent.id), "user_1").unwrap();
    assert_eq!(liked.likes, 1);
    let unliked = public_helpers::toggle_like(&db, "p1", &reply.id, Some(&parent.id), "user_1").unwrap();
    assert_eq!(unliked.likes, 0);

    let comments = public_helpers::list_comments(&db, "p1").unwrap();
    assert_eq!(comments.len(), 1);
    let replies = comments[0].replies.as_ref().unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].replies.is_none());

    assert!(matches!(
        public_helpers::add_reply(&db, "p1", "missing", "Bello", "Ameen"),
        Err(PublicHelperError::NotFound(_))
    ));
}
