use actix_web::{web, HttpResponse};
use std::collections::HashMap;
use url::form_urlencoded;

use crate::models::{default_faq_category, default_post_category, FaqForm, PostForm};

/// Decoded `application/x-www-form-urlencoded` body of a dashboard form.
pub type FormFields = HashMap<String, String>;

/// Rejects bodies that are not UTF-8 with a 400.
pub fn parse_form(form_bytes: &web::Bytes) -> Result<FormFields, HttpResponse> {
    let body = std::str::from_utf8(form_bytes)
        .map_err(|_| HttpResponse::BadRequest().body("Invalid UTF-8 in request body."))?;
    Ok(form_urlencoded::parse(body.as_bytes()).into_owned().collect())
}

/// Missing fields read as empty.
pub fn field(fields: &FormFields, name: &str) -> String {
    fields.get(name).cloned().unwrap_or_default()
}

fn non_blank_or(fields: &FormFields, name: &str, fallback: fn() -> String) -> String {
    fields
        .get(name)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .unwrap_or_else(fallback)
}

/// The post editor. An unchecked checkbox is simply absent from the body.
pub fn post_form(fields: &FormFields) -> PostForm {
    PostForm {
        title: field(fields, "title"),
        content: field(fields, "content"),
        author: field(fields, "author"),
        image: field(fields, "image"),
        category: non_blank_or(fields, "category", default_post_category),
        excerpt: field(fields, "excerpt"),
        is_draft: fields.contains_key("is_draft"),
    }
}

pub fn faq_form(fields: &FormFields) -> FaqForm {
    FaqForm {
        question: field(fields, "question"),
        answer: field(fields, "answer"),
        category: non_blank_or(fields, "category", default_faq_category),
    }
}

/// `None` for a blank or missing `post_id`, i.e. the create dialog.
pub fn post_id(fields: &FormFields) -> Option<String> {
    fields.get("post_id").map(|id| id.trim().to_string()).filter(|id| !id.is_empty())
}
