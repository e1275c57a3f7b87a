use chrono::Utc;
use redb::Database;

use super::collections_db_operations::{self as collections, DbError, FAQS_KEY};
use crate::models::{Faq, FaqForm, Resource, ResourceForm, ResourceKind};

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

fn matches_query(query: &str, fields: &[&str]) -> bool {
    let needle = query.to_lowercase();
    fields.iter().any(|field| field.to_lowercase().contains(&needle))
}

// ====================================================================
// =========================== RESOURCES ==============================
// ====================================================================

pub fn read_resources(db: &Database, kind: ResourceKind) -> Result<Vec<Resource>, DbError> {
    collections::read_collection(db, kind.storage_key())
}

fn save_resources(db: &Database, kind: ResourceKind, resources: &[Resource]) -> Result<(), DbError> {
    collections::write_collection(db, kind.storage_key(), resources)
}

/// Case-insensitive search over title and description. An empty query keeps everything.
pub fn search_resources(db: &Database, kind: ResourceKind, query: Option<&str>) -> Result<Vec<Resource>, DbError> {
    let resources = read_resources(db, kind)?;
    Ok(match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => resources
            .into_iter()
            .filter(|r| matches_query(q, &[&r.title, &r.description]))
            .collect(),
        None => resources,
    })
}

pub fn create_resource(db: &Database, kind: ResourceKind, form: &ResourceForm) -> Result<Resource, DbError> {
    let resource = Resource {
        id: collections::next_timestamp_id(),
        title: form.title.clone(),
        description: form.description.clone(),
        file_url: form.file_url.clone(),
        upload_date: Utc::now().to_rfc3339(),
        category: kind.label().to_string(),
        file_size: non_empty(&form.file_size),
        views: Some(0),
        file_type: Some(form.file_type),
        file_name: non_empty(&form.file_name),
    };

    let mut resources = read_resources(db, kind)?;
    resources.insert(0, resource.clone());
    save_resources(db, kind, &resources)?;
    Ok(resource)
}

/// Replaces the file and text fields; id, upload date, category and views stay.
pub fn update_resource(db: &Database, kind: ResourceKind, id: &str, form: &ResourceForm) -> Result<Resource, DbError> {
    let mut resources = read_resources(db, kind)?;
    let resource = resources
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| DbError::NotFound(format!("{} {} not found", kind.label(), id)))?;

    resource.title = form.title.clone();
    resource.description = form.description.clone();
    resource.file_url = form.file_url.clone();
    resource.file_size = non_empty(&form.file_size);
    resource.file_type = Some(form.file_type);
    resource.file_name = non_empty(&form.file_name);
    let updated = resource.clone();

    save_resources(db, kind, &resources)?;
    Ok(updated)
}

pub fn delete_resource(db: &Database, kind: ResourceKind, id: &str) -> Result<bool, DbError> {
    let resources = read_resources(db, kind)?;
    let before = resources.len();
    let remaining: Vec<Resource> = resources.into_iter().filter(|r| r.id != id).collect();
    let removed = remaining.len() != before;
    save_resources(db, kind, &remaining)?;
    Ok(removed)
}

/// Counts a download/open and hands back the resource so the caller can serve its link.
pub fn record_download(db: &Database, kind: ResourceKind, id: &str) -> Result<Resource, DbError> {
    let mut resources = read_resources(db, kind)?;
    let resource = resources
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| DbError::NotFound(format!("{} {} not found", kind.label(), id)))?;
    resource.views = Some(resource.views.unwrap_or(0) + 1);
    let opened = resource.clone();

    save_resources(db, kind, &resources)?;
    Ok(opened)
}

// ====================================================================
// ============================== FAQS ================================
// ====================================================================

pub fn read_faqs(db: &Database) -> Result<Vec<Faq>, DbError> {
    collections::read_collection(db, FAQS_KEY)
}

pub fn search_faqs(db: &Database, query: Option<&str>) -> Result<Vec<Faq>, DbError> {
    let faqs = read_faqs(db)?;
    Ok(match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => faqs
            .into_iter()
            .filter(|f| matches_query(q, &[&f.question, &f.answer]))
            .collect(),
        None => faqs,
    })
}

/// FAQs are appended, unlike posts and resources.
pub fn create_faq(db: &Database, form: &FaqForm) -> Result<Faq, DbError> {
    let faq = Faq {
        id: collections::next_timestamp_id(),
        question: form.question.clone(),
        answer: form.answer.clone(),
        category: form.category.clone(),
    };
    let mut faqs = read_faqs(db)?;
    faqs.push(faq.clone());
    collections::write_collection(db, FAQS_KEY, &faqs)?;
    Ok(faq)
}

pub fn update_faq(db: &Database, id: &str, form: &FaqForm) -> Result<Faq, DbError> {
    let mut faqs = read_faqs(db)?;
    let faq = faqs
        .iter_mut()
        .find(|f| f.id == id)
        .ok_or_else(|| DbError::NotFound(format!("FAQ {} not found", id)))?;
    faq.question = form.question.clone();
    faq.answer = form.answer.clone();
    faq.category = form.category.clone();
    let updated = faq.clone();

    collections::write_collection(db, FAQS_KEY, &faqs)?;
    Ok(updated)
}

pub fn delete_faq(db: &Database, id: &str) -> Result<bool, DbError> {
    let faqs = read_faqs(db)?;
    let before = faqs.len();
    let remaining: Vec<Faq> = faqs.into_iter().filter(|f| f.id != id).collect();
    let removed = remaining.len() != before;
    collections::write_collection(db, FAQS_KEY, &remaining)?;
    Ok(removed)
}

/// Writes the starter FAQs when the list is missing or empty. Returns true if seeded.
pub fn seed_default_faqs(db: &Database) -> Result<bool, DbError> {
    if !read_faqs(db)?.is_empty() {
        return Ok(false);
    }
    let defaults: Vec<Faq> = [
        ("1", "How do I become a member of MSSN UNILORIN?", "All Muslim students of the University of Ilorin are eligible. Visit the secretariat during registration periods to complete your membership registration.", "Membership"),
        ("2", "What are the membership dues?", "Dues are minimal and announced at the beginning of each academic session. They support welfare programs, da'wah activities and running costs.", "Membership"),
        ("3", "Can non-Muslim students attend MSSN events?", "Yes. Da'wah programs, academic seminars and some social events are open to all students.", "Events"),
        ("4", "How can I volunteer for MSSN activities?", "Contact any committee head or visit the secretariat. Units include Da'wah, Welfare, Editorial, Sports and Sisters' Affairs.", "Involvement"),
        ("5", "Does MSSN provide academic support?", "Yes. Study groups, tutorial sessions, seminars and a mentorship program pairing senior and junior students.", "Academic"),
        ("6", "What is the MSSN Annual Week?", "The flagship yearly event: lectures, competitions, cultural displays and charity activities, ending with a grand dinner.", "Events"),
        ("7", "How can I get welfare support?", "Contact the Welfare Committee through the secretariat or any executive member. Requests are handled confidentially.", "Welfare"),
        ("8", "Where and when are Halaqah sessions held?", "Every day except Friday at the Central Mosque Unilorin from 7:30 PM to 8:00 PM.", "Programs"),
    ]
    .into_iter()
    .map(|(id, question, answer, category)| Faq {
        id: id.to_string(),
        question: question.to_string(),
        answer: answer.to_string(),
        category: category.to_string(),
    })
    .collect();

    collections::write_collection(db, FAQS_KEY, &defaults)?;
    Ok(true)
}
