use redb::Database;

use super::collections_db_operations::{
    self as collections, DbError, BLOG_POSTS_KEY,
};
use crate::models::{DraftTarget, Post, PostForm};

// ====================================================================
// ======================= POST COLLECTION ============================
// ====================================================================

pub fn read_all_posts(db: &Database) -> Result<Vec<Post>, DbError> {
    collections::read_collection(db, BLOG_POSTS_KEY)
}

fn save_all_posts(db: &Database, posts: &[Post]) -> Result<(), DbError> {
    collections::write_collection(db, BLOG_POSTS_KEY, posts)
}

/// Public listing: drafts never show up here, whatever their view count.
pub fn read_published_posts(db: &Database) -> Result<Vec<Post>, DbError> {
    Ok(read_all_posts(db)?
        .into_iter()
        .filter(|post| !post.is_draft)
        .collect())
}

pub fn find_post(db: &Database, id: &str) -> Result<Option<Post>, DbError> {
    Ok(read_all_posts(db)?.into_iter().find(|post| post.id == id))
}

/// Newest first, the way the dashboard lists them.
pub fn insert_post_front(db: &Database, post: Post) -> Result<(), DbError> {
    let mut posts = read_all_posts(db)?;
    posts.insert(0, post);
    save_all_posts(db, &posts)
}

/// Swaps the stored post that has the same id.
pub fn replace_post(db: &Database, updated: Post) -> Result<(), DbError> {
    let mut posts = read_all_posts(db)?;
    let slot = posts
        .iter_mut()
        .find(|post| post.id == updated.id)
        .ok_or_else(|| DbError::NotFound(format!("Post {} not found", updated.id)))?;
    *slot = updated;
    save_all_posts(db, &posts)
}

/// Deletes the post and any autosave snapshot keyed to it. Returns whether a post was removed.
pub fn delete_post(db: &Database, id: &str) -> Result<bool, DbError> {
    let posts = read_all_posts(db)?;
    let before = posts.len();
    let remaining: Vec<Post> = posts.into_iter().filter(|post| post.id != id).collect();
    let removed = remaining.len() != before;

    save_all_posts(db, &remaining)?;
    discard_autosave(db, &DraftTarget::Existing(id.to_string()))?;
    Ok(removed)
}

/// Read-modify-write of the whole collection: views += 1 on a published post.
pub fn record_view(db: &Database, id: &str) -> Result<Post, DbError> {
    let mut posts = read_all_posts(db)?;
    let post = posts
        .iter_mut()
        .find(|post| post.id == id && !post.is_draft)
        .ok_or_else(|| DbError::NotFound(format!("Post {} not found", id)))?;
    post.views += 1;
    let viewed = post.clone();

    save_all_posts(db, &posts)?;
    Ok(viewed)
}

// ====================================================================
// ======================= AUTOSAVE SNAPSHOTS =========================
// ====================================================================

pub fn read_autosave(db: &Database, target: &DraftTarget) -> Result<Option<PostForm>, DbError> {
    collections::read_value(db, &target.storage_key())
}

pub fn write_autosave(db: &Database, target: &DraftTarget, snapshot: &PostForm) -> Result<(), DbError> {
    collections::write_value(db, &target.storage_key(), snapshot)
}

pub fn discard_autosave(db: &Database, target: &DraftTarget) -> Result<(), DbError> {
    collections::remove_key(db, &target.storage_key())
}

// ====================================================================
// ============================ SEEDING ===============================
// ====================================================================

/// Writes the starter posts when the collection has never been written. Returns true if seeded.
pub fn seed_default_posts(db: &Database) -> Result<bool, DbError> {
    if collections::key_exists(db, BLOG_POSTS_KEY)? {
        return Ok(false);
    }
    save_all_posts(db, &default_posts())?;
    Ok(true)
}

fn default_posts() -> Vec<Post> {
    let post = |id: &str, title: &str, author: &str, date: &str, category: &str, excerpt: &str, content: &str, image: &str| Post {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        author: author.to_string(),
        date: date.to_string(),
        image: image.to_string(),
        category: category.to_string(),
        excerpt: excerpt.to_string(),
        is_draft: false,
        views: 0,
    };

    vec![
        post(
            "1",
            "MSSN UNILORIN Hosts Annual Islamic Week 2025",
            "Abdullahi Ibrahim",
            "2025-01-22",
            "Events",
            "A week-long celebration of faith, knowledge, and community service featuring lectures, competitions, and charity drives.",
            "<p>The society hosted its Annual Islamic Week, a week of lectures, spiritual sessions and community outreach.</p>\
             <h3>Highlights included:</h3><ul><li>Daily Tafsir sessions</li><li>Academic excellence seminars</li>\
             <li>Charity distribution to less privileged students</li><li>Inter-faculty Islamic quiz competition</li></ul>",
            "https://images.unsplash.com/photo-1650799733482-4ad0f06a3d20?w=1080",
        ),
        post(
            "2",
            "MSSN Launches Academic Support Program for New Students",
            "Fatimah Yusuf",
            "2025-01-18",
            "Academic",
            "Free tutorial program launched to support Muslim students achieve academic excellence while maintaining spiritual growth.",
            "<p>A free tutorial and mentorship program helps freshmen settle into university life.</p>\
             <h3>The initiative includes:</h3><ul><li>Weekly tutorial sessions</li><li>Peer mentorship programs</li>\
             <li>Past questions and study materials</li><li>Career guidance counseling</li></ul>",
            "https://images.unsplash.com/photo-1590720485412-fc0322a7acb2?w=1080",
        ),
        post(
            "3",
            "Community Outreach: MSSN Distributes Relief Materials",
            "Muhammad Aliyu",
            "2025-01-15",
            "Welfare",
            "MSSN distributes foodstuff and essential supplies to over 500 students and community members in need.",
            "<p>The welfare program distributed over 500 bags of foodstuff to students and neighboring communities.</p>\
             <h3>The outreach program also included:</h3><ul><li>Free medical screening</li>\
             <li>Clothing donations</li><li>Financial assistance to struggling students</li></ul>",
            "https://images.unsplash.com/photo-1733740615104-0d3d624f7557?w=1080",
        ),
    ]
}
