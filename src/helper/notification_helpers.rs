use chrono::Utc;
use futures_util::future::join_all;
use redb::Database;

use crate::config::SiteConfig;
use crate::models::db_operations::collections_db_operations::DbError;
use crate::models::db_operations::notifications_db_operations::{self, NotificationLog};
use crate::models::db_operations::subscribers_db_operations;
use crate::models::{NotificationLogEntry, Resource};
use crate::relay::{MailRelay, OutboundEmail};

/// Outcome of a fan-out to subscribers.
#[derive(Debug, PartialEq, Eq)]
pub enum FanOut {
    NoSubscribers,
    Sent { recipients: usize, delivered: usize },
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn human_now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

// ====================================================================
// ========================== MESSAGE TEXTS ===========================
// ====================================================================

pub fn new_post_message(site: &SiteConfig, title: &str) -> String {
    format!(
        "As-salamu alaykum wa rahmatullahi wa barakatuh!\n\n\
         We've just published a new article that we think you'll find enlightening:\n\n\
         📖 \"{title}\"\n\n\
         Visit the {name} website to read the full article and join the conversation with fellow members of our community.\n\n\
         🌐 {website}/blog\n\n\
         May your day be filled with blessings and knowledge!\n\n\
         Jazakumullahu Khairan,\n{name} Team\n\n---\nEmail: {email}\nPhone: {phone}",
        title = title,
        name = site.name,
        website = site.website,
        email = site.contact_email,
        phone = site.contact_phone,
    )
}

pub fn publish_summary_message(title: &str, recipients: &[String]) -> String {
    let bullets: Vec<String> = recipients.iter().map(|email| format!("• {}", email)).collect();
    format!(
        "As-salamu alaykum!\n\nYour blog post has been published successfully:\n\n\
         Title: \"{}\"\nPublished: {}\n\n\
         Newsletter notifications sent to {} subscriber{}:\n{}\n\n\
         Keep up the great work!\n\n- Website System",
        title,
        human_now(),
        recipients.len(),
        plural(recipients.len()),
        bullets.join("\n"),
    )
}

pub fn new_resource_message(site: &SiteConfig, resource: &Resource) -> String {
    let size_line = resource
        .file_size
        .as_deref()
        .map(|size| format!("Size: {}", size))
        .unwrap_or_default();
    format!(
        "As-salamu alaykum!\n\nWe're excited to share a new resource with you:\n\n\
         📖 {title}\n\n{description}\n\nCategory: {category}\n{size_line}\n\n\
         Visit the Resources page on our website to access this content and explore more materials for your spiritual and academic growth.\n\n\
         May this knowledge benefit you in this life and the Hereafter!\n\n\
         Barakallahu feekum,\n- {name} Team\n\nWebsite: {website}\nEmail: {email}\nPhone: {phone}",
        title = resource.title,
        description = resource.description,
        category = resource.category,
        size_line = size_line,
        name = site.name,
        website = site.website,
        email = site.contact_email,
        phone = site.contact_phone,
    )
}

pub fn new_subscriber_message(site: &SiteConfig, email: &str, total: usize) -> String {
    format!(
        "As-salamu alaykum!\n\nGreat news! You have a new newsletter subscriber:\n\n\
         Email: {}\nSubscribed on: {}\nTotal Subscribers: {}\n\n\
         Keep creating amazing content for the {} community!\n\n- {} Website System",
        email,
        human_now(),
        total,
        site.name,
        site.name,
    )
}

// ====================================================================
// ============================ DELIVERY ==============================
// ====================================================================

/// Sends every email concurrently and waits for all of them. Failures are logged, never returned.
async fn deliver_all(relay: &dyn MailRelay, emails: &[OutboundEmail]) -> usize {
    let results = join_all(emails.iter().map(|email| relay.send(email))).await;
    results
        .into_iter()
        .zip(emails)
        .filter(|(result, email)| match result {
            Ok(true) => true,
            Ok(false) => {
                log::error!("Relay refused email to {}", email.reply_to);
                false
            }
            Err(e) => {
                log::error!("Failed to send email to {}: {}", email.reply_to, e);
                false
            }
        })
        .count()
}

/// Emails every subscriber about a newly published post, then records one log
/// entry per subscriber and one summary entry for the admin.
pub async fn notify_post_published(
    db: &Database,
    relay: &dyn MailRelay,
    site: &SiteConfig,
    title: &str,
) -> Result<FanOut, DbError> {
    let subscribers = subscribers_db_operations::read_subscribers(db)?;
    if subscribers.is_empty() {
        return Ok(FanOut::NoSubscribers);
    }

    let message = new_post_message(site, title);
    let emails: Vec<OutboundEmail> = subscribers
        .iter()
        .map(|subscriber| OutboundEmail {
            subject: format!("✨ New Post: {} - {}", title, site.name),
            from_name: site.name.clone(),
            reply_to: subscriber.clone(),
            message: message.clone(),
        })
        .collect();
    let delivered = deliver_all(relay, &emails).await;

    let entries = subscribers
        .iter()
        .map(|subscriber| NotificationLogEntry {
            to: subscriber.clone(),
            from: site.contact_email.clone(),
            subject: format!("✨ New Post: {}", title),
            message: message.clone(),
            timestamp: now_rfc3339(),
        })
        .collect();
    notifications_db_operations::append_entries(db, NotificationLog::Subscriber, entries)?;

    notifications_db_operations::append_entry(
        db,
        NotificationLog::Admin,
        NotificationLogEntry {
            to: site.contact_email.clone(),
            from: site.system_sender.clone(),
            subject: "✅ Blog Post Published Successfully".to_string(),
            message: publish_summary_message(title, &subscribers),
            timestamp: now_rfc3339(),
        },
    )?;

    log::info!("Post '{}' announced to {} subscriber(s), {} delivered", title, subscribers.len(), delivered);
    Ok(FanOut::Sent { recipients: subscribers.len(), delivered })
}

pub async fn notify_resource_published(
    db: &Database,
    relay: &dyn MailRelay,
    site: &SiteConfig,
    resource: &Resource,
) -> Result<FanOut, DbError> {
    let subscribers = subscribers_db_operations::read_subscribers(db)?;
    if subscribers.is_empty() {
        return Ok(FanOut::NoSubscribers);
    }

    let subject = format!("📚 New {} Available - {}", resource.category, site.name);
    let message = new_resource_message(site, resource);
    let emails: Vec<OutboundEmail> = subscribers
        .iter()
        .map(|subscriber| OutboundEmail {
            subject: subject.clone(),
            from_name: site.name.clone(),
            reply_to: subscriber.clone(),
            message: message.clone(),
        })
        .collect();
    let delivered = deliver_all(relay, &emails).await;

    let entries = subscribers
        .iter()
        .map(|subscriber| NotificationLogEntry {
            to: subscriber.clone(),
            from: site.contact_email.clone(),
            subject: subject.clone(),
            message: message.clone(),
            timestamp: now_rfc3339(),
        })
        .collect();
    notifications_db_operations::append_entries(db, NotificationLog::Subscriber, entries)?;

    log::info!("Resource '{}' announced to {} subscriber(s), {} delivered", resource.title, subscribers.len(), delivered);
    Ok(FanOut::Sent { recipients: subscribers.len(), delivered })
}

/// Tells the organization about a new subscriber. `total` is the list size after the append.
pub async fn notify_new_subscriber(
    db: &Database,
    relay: &dyn MailRelay,
    site: &SiteConfig,
    email: &str,
    total: usize,
) -> Result<(), DbError> {
    let message = new_subscriber_message(site, email, total);
    let outbound = OutboundEmail {
        subject: format!("🎉 New Newsletter Subscription - {}", site.name),
        from_name: format!("{} Website", site.name),
        reply_to: email.to_string(),
        message: message.clone(),
    };
    deliver_all(relay, std::slice::from_ref(&outbound)).await;

    notifications_db_operations::append_entry(
        db,
        NotificationLog::Admin,
        NotificationLogEntry {
            to: site.contact_email.clone(),
            from: email.to_string(),
            subject: "🎉 New Newsletter Subscription".to_string(),
            message,
            timestamp: now_rfc3339(),
        },
    )
}
