use actix_web::{web, HttpResponse, Responder};
use redb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::helper::public_helpers::{self, PublicHelperError};
use crate::middleware::VisitorId;
use crate::models::db_operations::subscribers_db_operations::SubscribeOutcome;
use crate::models::ResourceKind;
use crate::AppState;

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
pub struct CommentInput {
    #[serde(default)]
    author: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
pub struct LikeInput {
    parent_id: Option<String>,
}

#[derive(Deserialize)]
pub struct SubscribeInput {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
pub struct MembershipInput {
    #[serde(default)]
    fullname: String,
    #[serde(default)]
    faculty: String,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/is_server_active", web::get().to(is_server_active))
            .route("/posts", web::get().to(get_published_posts))
            .route("/posts/{id}", web::get().to(get_post_by_id))
            .route("/posts/{id}/read", web::post().to(read_post))
            .route("/posts/{id}/comments", web::get().to(get_comments))
            .route("/posts/{id}/comments", web::post().to(add_comment))
            .route("/posts/{id}/comments/{comment_id}/replies", web::post().to(add_reply))
            .route("/posts/{id}/comments/{comment_id}/like", web::post().to(toggle_like))
            .route("/newsletter/subscribe", web::post().to(subscribe))
            .route("/resources/{kind}", web::get().to(get_resources))
            .route("/resources/{kind}/{id}/download", web::post().to(download_resource))
            .route("/faqs", web::get().to(get_faqs))
            .route("/membership", web::post().to(submit_membership)),
    );
}

/// Maps helper failures onto JSON error responses.
fn error_response(e: PublicHelperError) -> HttpResponse {
    match e {
        PublicHelperError::Validation(msg) => HttpResponse::BadRequest().json(json!({ "success": false, "error": msg })),
        PublicHelperError::NotFound(msg) => HttpResponse::NotFound().json(json!({ "success": false, "error": msg })),
        PublicHelperError::Upstream => {
            HttpResponse::BadGateway().json(json!({ "success": false, "error": PublicHelperError::Upstream.to_string() }))
        }
        PublicHelperError::Database(e) => {
            log::error!("Storage failure on public API: {}", e);
            HttpResponse::InternalServerError().json(json!({ "success": false, "error": "Internal server error" }))
        }
    }
}

fn json_or_error<T: serde::Serialize>(result: Result<T, PublicHelperError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(e),
    }
}

fn parse_kind(kind: &str) -> Result<ResourceKind, HttpResponse> {
    kind.parse::<ResourceKind>()
        .map_err(|msg| HttpResponse::NotFound().json(json!({ "success": false, "error": msg })))
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

// --- Blog ---

async fn get_published_posts(db: web::Data<Database>) -> impl Responder {
    json_or_error(public_helpers::list_published_posts(&db))
}

async fn get_post_by_id(id: web::Path<String>, db: web::Data<Database>) -> impl Responder {
    json_or_error(public_helpers::get_published_post(&db, &id))
}

async fn read_post(id: web::Path<String>, db: web::Data<Database>) -> impl Responder {
    json_or_error(public_helpers::read_post(&db, &id))
}

// --- Comments ---

async fn get_comments(id: web::Path<String>, db: web::Data<Database>) -> impl Responder {
    json_or_error(public_helpers::list_comments(&db, &id))
}

async fn add_comment(
    id: web::Path<String>,
    db: web::Data<Database>,
    input: web::Json<CommentInput>,
) -> impl Responder {
    match public_helpers::add_comment(&db, &id, &input.author, &input.content) {
        Ok(comment) => HttpResponse::Created().json(comment),
        Err(e) => error_response(e),
    }
}

async fn add_reply(
    path: web::Path<(String, String)>,
    db: web::Data<Database>,
    input: web::Json<CommentInput>,
) -> impl Responder {
    let (post_id, parent_id) = path.into_inner();
    match public_helpers::add_reply(&db, &post_id, &parent_id, &input.author, &input.content) {
        Ok(reply) => HttpResponse::Created().json(reply),
        Err(e) => error_response(e),
    }
}

async fn toggle_like(
    path: web::Path<(String, String)>,
    db: web::Data<Database>,
    visitor: VisitorId,
    input: Option<web::Json<LikeInput>>,
) -> impl Responder {
    let (post_id, comment_id) = path.into_inner();
    let parent_id = input.and_then(|body| body.into_inner().parent_id);
    json_or_error(public_helpers::toggle_like(&db, &post_id, &comment_id, parent_id.as_deref(), &visitor.0))
}

// --- Newsletter ---

async fn subscribe(
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    config: web::Data<Config>,
    input: web::Json<SubscribeInput>,
) -> impl Responder {
    match public_helpers::subscribe(&db, app_state.relay.as_ref(), &config.site, &input.email).await {
        Ok(SubscribeOutcome::Added(_)) => HttpResponse::Ok().json(json!({
            "success": true,
            "already_subscribed": false,
            "message": "Welcome aboard! You have been subscribed successfully."
        })),
        Ok(SubscribeOutcome::AlreadySubscribed) => HttpResponse::Ok().json(json!({
            "success": true,
            "already_subscribed": true,
            "message": "You are already subscribed to our newsletter!"
        })),
        Err(e) => error_response(e),
    }
}

// --- Resources & FAQs ---

async fn get_resources(
    kind: web::Path<String>,
    db: web::Data<Database>,
    query: web::Query<SearchQuery>,
) -> impl Responder {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    json_or_error(public_helpers::list_resources(&db, kind, query.q.as_deref()))
}

async fn download_resource(path: web::Path<(String, String)>, db: web::Data<Database>) -> impl Responder {
    let (kind, id) = path.into_inner();
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    json_or_error(public_helpers::open_resource(&db, kind, &id))
}

async fn get_faqs(db: web::Data<Database>, query: web::Query<SearchQuery>) -> impl Responder {
    json_or_error(public_helpers::list_faqs(&db, query.q.as_deref()))
}

// --- Membership ---

async fn submit_membership(app_state: web::Data<AppState>, input: web::Json<MembershipInput>) -> impl Responder {
    match public_helpers::submit_membership(&app_state.membership, &input.fullname, &input.faculty).await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Registration submitted successfully!"
        })),
        Err(e) => error_response(e),
    }
}
