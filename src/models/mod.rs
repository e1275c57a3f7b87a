use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A blog post as stored in the `blog_posts` collection.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub date: String, // YYYY-MM-DD
    pub image: String,
    pub category: String,
    pub excerpt: String,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub views: u64,
}

/// The editable fields of a post. Also the shape of an autosave snapshot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_post_category")]
    pub category: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub is_draft: bool,
}

pub fn default_post_category() -> String {
    "Events".to_string()
}

impl Default for PostForm {
    fn default() -> Self {
        PostForm {
            title: String::new(),
            content: String::new(),
            author: String::new(),
            image: String::new(),
            category: default_post_category(),
            excerpt: String::new(),
            is_draft: false,
        }
    }
}

impl PostForm {
    /// Autosave only kicks in once a title or some content exists.
    pub fn has_content(&self) -> bool {
        !self.title.is_empty() || !self.content.is_empty()
    }

    pub fn missing_required_fields(&self) -> bool {
        self.title.trim().is_empty()
            || self.content.trim().is_empty()
            || self.author.trim().is_empty()
            || self.excerpt.trim().is_empty()
    }
}

/// Which autosave slot a snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DraftTarget {
    NewPost,
    Existing(String),
}

impl DraftTarget {
    pub fn from_post_id(post_id: Option<&str>) -> Self {
        match post_id.map(str::trim) {
            Some(id) if !id.is_empty() => DraftTarget::Existing(id.to_string()),
            _ => DraftTarget::NewPost,
        }
    }

    pub fn storage_key(&self) -> String {
        match self {
            DraftTarget::NewPost => "draft_new".to_string(),
            DraftTarget::Existing(id) => format!("draft_{}", id),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: String,
    pub content: String,
    pub date: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub liked_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<Comment>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Url,
    Audio,
    Video,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub description: String,
    pub file_url: String,
    pub upload_date: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceForm {
    pub title: String,
    pub description: String,
    pub file_url: String,
    pub file_size: String,
    pub file_type: FileType,
    pub file_name: String,
}

/// The four parallel resource collections.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Newsletters,
    Books,
    Lectures,
    Reports,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Newsletters,
        ResourceKind::Books,
        ResourceKind::Lectures,
        ResourceKind::Reports,
    ];

    pub fn storage_key(self) -> &'static str {
        match self {
            ResourceKind::Newsletters => "newsletters",
            ResourceKind::Books => "books",
            ResourceKind::Lectures => "lectures",
            ResourceKind::Reports => "reports",
        }
    }

    /// Label written into `Resource::category`.
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Newsletters => "Newsletter",
            ResourceKind::Books => "Book",
            ResourceKind::Lectures => "Lecture",
            ResourceKind::Reports => "Report",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_key())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.storage_key() == s)
            .ok_or_else(|| format!("Unknown resource kind '{}'", s))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Faq {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub category: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FaqForm {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default = "default_faq_category")]
    pub category: String,
}

pub fn default_faq_category() -> String {
    "Membership".to_string()
}

/// A record of an outbound email attempt. Appended whether or not the relay
/// accepted it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NotificationLogEntry {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub message: String,
    pub timestamp: String,
}

/// Flash message shown on the next dashboard render.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub message: String,
    pub r#type: String, // 'success', 'info' or 'error'
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total_posts: usize,
    pub published_posts: usize,
    pub draft_posts: usize,
    pub total_views: u64,
    pub subscribers: usize,
}

pub mod db_operations;
