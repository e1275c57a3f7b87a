use chrono::Utc;
use redb::Database;

use super::collections_db_operations::{self as collections, comments_key, DbError};
use crate::models::Comment;

pub fn read_comments(db: &Database, post_id: &str) -> Result<Vec<Comment>, DbError> {
    collections::read_collection(db, &comments_key(post_id))
}

fn save_comments(db: &Database, post_id: &str, comments: &[Comment]) -> Result<(), DbError> {
    collections::write_collection(db, &comments_key(post_id), comments)
}

fn new_comment(post_id: &str, author: &str, content: &str, with_replies: bool) -> Comment {
    Comment {
        id: collections::next_timestamp_id(),
        post_id: post_id.to_string(),
        author: author.to_string(),
        content: content.to_string(),
        date: Utc::now().to_rfc3339(),
        likes: 0,
        liked_by: Vec::new(),
        replies: with_replies.then(Vec::new),
    }
}

/// New top-level comments go first.
pub fn add_comment(db: &Database, post_id: &str, author: &str, content: &str) -> Result<Comment, DbError> {
    let comment = new_comment(post_id, author, content, true);
    let mut comments = read_comments(db, post_id)?;
    comments.insert(0, comment.clone());
    save_comments(db, post_id, &comments)?;
    Ok(comment)
}

/// Replies are appended under their parent. Replies never nest further.
pub fn add_reply(
    db: &Database,
    post_id: &str,
    parent_id: &str,
    author: &str,
    content: &str,
) -> Result<Comment, DbError> {
    let mut comments = read_comments(db, post_id)?;
    let parent = comments
        .iter_mut()
        .find(|comment| comment.id == parent_id)
        .ok_or_else(|| DbError::NotFound(format!("Comment {} not found", parent_id)))?;

    let reply = new_comment(post_id, author, content, false);
    parent.replies.get_or_insert_with(Vec::new).push(reply.clone());

    save_comments(db, post_id, &comments)?;
    Ok(reply)
}

fn flip_like(comment: &mut Comment, visitor_id: &str) {
    if let Some(pos) = comment.liked_by.iter().position(|id| id == visitor_id) {
        comment.liked_by.remove(pos);
        comment.likes -= 1;
    } else {
        comment.liked_by.push(visitor_id.to_string());
        comment.likes += 1;
    }
}

/// Like/unlike by `visitor_id`. With `parent_id` the target is a reply under that parent.
pub fn toggle_like(
    db: &Database,
    post_id: &str,
    comment_id: &str,
    parent_id: Option<&str>,
    visitor_id: &str,
) -> Result<Comment, DbError> {
    let mut comments = read_comments(db, post_id)?;
    let not_found = || DbError::NotFound(format!("Comment {} not found", comment_id));

    let target = match parent_id {
        Some(parent_id) => comments
            .iter_mut()
            .find(|comment| comment.id == parent_id)
            .and_then(|parent| parent.replies.as_mut())
            .and_then(|replies| replies.iter_mut().find(|reply| reply.id == comment_id)),
        None => comments.iter_mut().find(|comment| comment.id == comment_id),
    }
    .ok_or_else(not_found)?;

    flip_like(target, visitor_id);
    let updated = target.clone();

    save_comments(db, post_id, &comments)?;
    Ok(updated)
}
