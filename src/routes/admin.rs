use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use redb::Database;
use serde::Deserialize;
use serde_json::json;
use tera::{Context, Tera};

use crate::config::Config;
use crate::helper::admin_helpers::{self, AdminHelperError};
use crate::helper::form_helpers::{self, field, parse_form};
use crate::helper::notification_helpers::FanOut;
use crate::helper::upload_helpers::{self, MAX_COVER_IMAGE_BYTES, MAX_MEDIA_BYTES};
use crate::middleware::AuthenticatedAdmin;
use crate::models::db_operations::notifications_db_operations::NotificationLog;
use crate::models::{DraftTarget, FileType, Notification, ResourceForm, ResourceKind};
use crate::AppState;

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: CsrfToken,
    email: String,
    password: String,
}

impl CsrfGuarded for LoginForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

#[derive(Deserialize)]
struct DraftQuery {
    post_id: Option<String>,
}

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(show_admin_login_form))
        .route("/login", web::post().to(handle_admin_login))
        .route("/logout", web::post().to(handle_admin_logout));
}

pub fn config_dashboard(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(show_admin_dashboard))
        .route("/create_post", web::post().to(create_post_action))
        .route("/update_post", web::post().to(update_post_action))
        .route("/delete_post", web::post().to(delete_post_action))
        .route("/autosave", web::post().to(autosave_action))
        .route("/draft", web::get().to(read_draft_action))
        .route("/discard_draft", web::post().to(discard_draft_action))
        .route("/close_create", web::post().to(close_create_action))
        .route("/close_edit", web::post().to(close_edit_action))
        .route("/upload_cover", web::post().to(upload_cover_action))
        .route("/add_resource", web::post().to(add_resource_action))
        .route("/update_resource", web::post().to(update_resource_action))
        .route("/delete_resource", web::post().to(delete_resource_action))
        .route("/add_faq", web::post().to(add_faq_action))
        .route("/update_faq", web::post().to(update_faq_action))
        .route("/delete_faq", web::post().to(delete_faq_action))
        .route("/clear_subscriber_logs", web::post().to(clear_subscriber_logs_action))
        .route("/clear_admin_logs", web::post().to(clear_admin_logs_action));
}

fn set_notification(session: &Session, message: &str, r#type: &str) {
    let notification = Notification { message: message.to_string(), r#type: r#type.to_string() };
    if let Err(e) = session.insert("notification", &notification) {
        log::error!("Failed to store notification in session: {}", e);
    }
}

fn redirect_to(url: String) -> HttpResponse {
    HttpResponse::Found().append_header(("location", url)).finish()
}

fn dashboard_url(config: &Config) -> String {
    format!("/management/{}/dashboard", config.admin_url_prefix)
}

/// Flashes a helper failure: validation and not-found messages are shown as is, storage errors are logged.
fn notify_failure(session: &Session, e: AdminHelperError, fallback: &str) {
    match e {
        AdminHelperError::Validation(msg) | AdminHelperError::NotFound(msg) => set_notification(session, &msg, "error"),
        AdminHelperError::Database(e) => {
            log::error!("{}: {}", fallback, e);
            set_notification(session, fallback, "error");
        }
    }
}

fn json_failure(e: AdminHelperError) -> HttpResponse {
    match e {
        AdminHelperError::Validation(msg) => HttpResponse::BadRequest().json(json!({ "success": false, "error": msg })),
        AdminHelperError::NotFound(msg) => HttpResponse::NotFound().json(json!({ "success": false, "error": msg })),
        AdminHelperError::Database(e) => {
            log::error!("Storage failure on admin API: {}", e);
            HttpResponse::InternalServerError().json(json!({ "success": false, "error": "Internal server error" }))
        }
    }
}

fn announcement_text(announcement: &FanOut) -> String {
    match announcement {
        FanOut::NoSubscribers => "No subscribers yet. Encourage visitors to subscribe!".to_string(),
        FanOut::Sent { recipients, .. } => {
            format!("Newsletter sent to {} subscriber{}!", recipients, if *recipients == 1 { "" } else { "s" })
        }
    }
}

fn kind_from(value: &str) -> Result<ResourceKind, AdminHelperError> {
    value.trim().parse::<ResourceKind>().map_err(AdminHelperError::Validation)
}

// ====================================================================
// ============================== LOGIN ===============================
// ====================================================================

async fn show_admin_login_form(
    session: Session,
    tera: web::Data<Tera>,
    token: CsrfToken,
    config: web::Data<Config>,
) -> impl Responder {
    let admin_url_prefix = &config.admin_url_prefix;
    if session.get::<String>("role").unwrap_or(None) == Some("admin".to_string()) {
        return redirect_to(dashboard_url(&config));
    }

    let mut ctx = Context::new();
    ctx.insert("admin_url_prefix", admin_url_prefix);
    ctx.insert("site_name", &config.site.name);
    ctx.insert("csrf_token", token.get());

    if let Ok(Some(error)) = session.get::<String>("error") {
        ctx.insert("error", &error);
        session.remove("error");
    }

    match tera.render("admin/login.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error: {}", err);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

async fn handle_admin_login(
    session: Session,
    form: Csrf<web::Form<LoginForm>>,
    config: web::Data<Config>,
) -> impl Responder {
    let login_url = format!("/management/{}/login", config.admin_url_prefix);
    let login_data = form.into_inner().into_inner();

    if admin_helpers::verify_admin_credentials(&config, &login_data.email, &login_data.password) {
        session.renew();
        let stored = session
            .insert("email", login_data.email.trim())
            .and_then(|_| session.insert("role", "admin"));
        if let Err(e) = stored {
            log::error!("Failed to start admin session: {}", e);
            return HttpResponse::InternalServerError().body("Session error");
        }
        session.remove("error");
        log::info!("Admin logged in");
        redirect_to(dashboard_url(&config))
    } else {
        log::warn!("Rejected admin login attempt for '{}'", login_data.email.trim());
        if let Err(e) = session.insert("error", "Invalid credentials. Please try again.") {
            log::error!("Failed to store login error in session: {}", e);
        }
        redirect_to(login_url)
    }
}

async fn handle_admin_logout(session: Session, config: web::Data<Config>) -> impl Responder {
    session.purge();
    redirect_to(format!("/management/{}/login", config.admin_url_prefix))
}

// ====================================================================
// ============================ DASHBOARD =============================
// ====================================================================

async fn show_admin_dashboard(
    auth_user: AuthenticatedAdmin,
    session: Session,
    tera: web::Data<Tera>,
    db: web::Data<Database>,
    token: CsrfToken,
    config: web::Data<Config>,
) -> impl Responder {
    let mut ctx = Context::new();
    ctx.insert("admin_url_prefix", &config.admin_url_prefix);
    ctx.insert("site_name", &config.site.name);
    ctx.insert("user", &auth_user);
    ctx.insert("csrf_token", token.get());
    ctx.insert("autosave_delay_ms", &config.autosave_delay_ms);
    ctx.insert("post_categories", &["Events", "Academic", "Welfare", "Da'wah", "News", "Announcement"]);
    ctx.insert("faq_categories", &["Membership", "Programs", "Resources", "General"]);

    if let Ok(Some(notification)) = session.get::<Notification>("notification") {
        ctx.insert("notification", &notification);
        session.remove("notification");
    }

    let loaded = (|| -> Result<(), AdminHelperError> {
        ctx.insert("stats", &admin_helpers::dashboard_stats(&db)?);
        ctx.insert("posts", &admin_helpers::fetch_all_posts(&db)?);
        ctx.insert("faqs", &admin_helpers::fetch_faqs(&db)?);
        ctx.insert("subscribers", &admin_helpers::fetch_subscribers(&db)?);
        ctx.insert("subscriber_log", &admin_helpers::fetch_log(&db, NotificationLog::Subscriber)?);
        ctx.insert("admin_log", &admin_helpers::fetch_log(&db, NotificationLog::Admin)?);

        let mut resource_sections = Vec::new();
        for kind in ResourceKind::ALL {
            let items = admin_helpers::fetch_resources(&db, kind)?;
            resource_sections.push(json!({
                "kind": kind.storage_key(),
                "label": kind.label(),
                "items": items,
            }));
        }
        ctx.insert("resource_sections", &resource_sections);
        Ok(())
    })();

    if let Err(e) = loaded {
        log::error!("Failed to load admin dashboard data: {}", e);
        return HttpResponse::InternalServerError().body("Error loading admin dashboard.");
    }

    match tera.render("admin/dashboard.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(err) => {
            log::error!("Template rendering error: {}", err);
            HttpResponse::InternalServerError().body("Error rendering admin dashboard.")
        }
    }
}

// ====================================================================
// ============================== POSTS ===============================
// ====================================================================

async fn create_post_action(
    session: Session,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let post_form = form_helpers::post_form(&parsed);

    match admin_helpers::create_post(&db, app_state.relay.as_ref(), &config.site, &app_state.autosave, &post_form).await {
        Ok(saved) => {
            let message = match &saved.announcement {
                None => "Draft saved successfully!".to_string(),
                Some(announcement) => format!("Blog post published successfully! {}", announcement_text(announcement)),
            };
            set_notification(&session, &message, "success");
        }
        Err(e) => notify_failure(&session, e, "Failed to save blog post."),
    }
    redirect_to(dashboard_url(&config))
}

async fn update_post_action(
    session: Session,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Some(post_id) = form_helpers::post_id(&parsed) else {
        set_notification(&session, "Invalid post ID provided.", "error");
        return redirect_to(dashboard_url(&config));
    };
    let post_form = form_helpers::post_form(&parsed);

    match admin_helpers::update_post(&db, app_state.relay.as_ref(), &config.site, &app_state.autosave, &post_id, &post_form)
        .await
    {
        Ok(saved) => {
            let message = match &saved.announcement {
                None => "Blog post updated successfully!".to_string(),
                Some(announcement) => format!("Blog post updated successfully! {}", announcement_text(announcement)),
            };
            set_notification(&session, &message, "success");
        }
        Err(e) => notify_failure(&session, e, "Failed to update blog post."),
    }
    redirect_to(dashboard_url(&config))
}

async fn delete_post_action(
    session: Session,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Some(post_id) = form_helpers::post_id(&parsed) else {
        set_notification(&session, "Invalid post ID provided.", "error");
        return redirect_to(dashboard_url(&config));
    };

    app_state.autosave.cancel(&DraftTarget::Existing(post_id.clone()));
    match admin_helpers::delete_post(&db, &post_id) {
        Ok(true) => set_notification(&session, "Blog post deleted successfully!", "success"),
        Ok(false) => set_notification(&session, "Post not found or could not be deleted.", "error"),
        Err(e) => notify_failure(&session, e, "Failed to delete blog post."),
    }
    redirect_to(dashboard_url(&config))
}

// --- Draft autosave (called from the editor script) ---

async fn autosave_action(
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Bytes,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let target = DraftTarget::from_post_id(form_helpers::post_id(&parsed).as_deref());
    let scheduled = app_state.autosave.schedule(db.clone(), target, form_helpers::post_form(&parsed));
    HttpResponse::Ok().json(json!({ "success": true, "scheduled": scheduled }))
}

async fn read_draft_action(db: web::Data<Database>, query: web::Query<DraftQuery>) -> impl Responder {
    let target = DraftTarget::from_post_id(query.post_id.as_deref());
    match admin_helpers::read_draft_snapshot(&db, &target) {
        Ok(draft) => HttpResponse::Ok().json(json!({ "success": true, "draft": draft })),
        Err(e) => json_failure(e),
    }
}

async fn discard_draft_action(
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Bytes,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let target = DraftTarget::from_post_id(form_helpers::post_id(&parsed).as_deref());
    app_state.autosave.cancel(&target);
    match admin_helpers::discard_draft_snapshot(&db, &target) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true })),
        Err(e) => json_failure(e),
    }
}

async fn close_create_action(
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    app_state.autosave.cancel(&DraftTarget::NewPost);
    match admin_helpers::close_create_dialog(&db, &config.site, &form_helpers::post_form(&parsed)) {
        Ok(saved) => HttpResponse::Ok().json(json!({
            "success": true,
            "saved_as_draft": saved.is_some(),
            "post_id": saved.map(|post| post.id),
        })),
        Err(e) => json_failure(e),
    }
}

async fn close_edit_action(
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Bytes,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Some(post_id) = form_helpers::post_id(&parsed) else {
        return json_failure(AdminHelperError::Validation("Invalid post ID provided.".to_string()));
    };
    app_state.autosave.cancel(&DraftTarget::Existing(post_id.clone()));
    match admin_helpers::close_edit_dialog(&db, &post_id, &form_helpers::post_form(&parsed)) {
        Ok(saved) => HttpResponse::Ok().json(json!({ "success": true, "saved_as_draft": saved.is_some() })),
        Err(e) => json_failure(e),
    }
}

async fn upload_cover_action(payload: Multipart) -> impl Responder {
    let upload = match upload_helpers::read_multipart(payload, MAX_COVER_IMAGE_BYTES).await {
        Ok(form) => form.file.ok_or(upload_helpers::UploadError::NoFile),
        Err(e) => Err(e),
    };
    match upload.and_then(|file| upload_helpers::cover_image_data_url(&file)) {
        Ok(data_url) => HttpResponse::Ok().json(json!({ "success": true, "data_url": data_url })),
        Err(e) => HttpResponse::BadRequest().json(json!({ "success": false, "error": e.to_string() })),
    }
}

// ====================================================================
// ============================ RESOURCES =============================
// ====================================================================

/// Reads the resource editor form. An attached file becomes the resource's inline media.
async fn resource_form_from(payload: Multipart) -> Result<(ResourceKind, String, ResourceForm), AdminHelperError> {
    let multipart = upload_helpers::read_multipart(payload, MAX_MEDIA_BYTES)
        .await
        .map_err(|e| AdminHelperError::Validation(e.to_string()))?;
    let kind = kind_from(multipart.field("kind"))?;

    let mut form = ResourceForm {
        title: multipart.field("title").to_string(),
        description: multipart.field("description").to_string(),
        file_url: multipart.field("file_url").to_string(),
        file_size: multipart.field("file_size").to_string(),
        file_type: FileType::Url,
        file_name: String::new(),
    };

    if let Some(file) = &multipart.file {
        if kind != ResourceKind::Lectures {
            return Err(AdminHelperError::Validation("Media uploads are only available for lectures.".to_string()));
        }
        let media = upload_helpers::lecture_media(file).map_err(|e| AdminHelperError::Validation(e.to_string()))?;
        form.file_url = media.data_url;
        form.file_type = media.file_type;
        form.file_size = media.file_size;
        form.file_name = media.file_name;
    }

    Ok((kind, multipart.field("resource_id").trim().to_string(), form))
}

async fn add_resource_action(
    session: Session,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    payload: Multipart,
    config: web::Data<Config>,
) -> impl Responder {
    let result = match resource_form_from(payload).await {
        Ok((kind, _, form)) => admin_helpers::add_resource(&db, app_state.relay.as_ref(), &config.site, kind, &form)
            .await
            .map(|(resource, announcement)| (kind, resource, announcement)),
        Err(e) => Err(e),
    };

    match result {
        Ok((kind, resource, announcement)) => {
            log::info!("{} '{}' added", kind.label(), resource.title);
            let message = format!("{} added successfully! {}", kind.label(), announcement_text(&announcement));
            set_notification(&session, &message, "success");
        }
        Err(e) => notify_failure(&session, e, "Failed to add resource."),
    }
    redirect_to(dashboard_url(&config))
}

async fn update_resource_action(
    session: Session,
    db: web::Data<Database>,
    payload: Multipart,
    config: web::Data<Config>,
) -> impl Responder {
    let result = resource_form_from(payload).await.and_then(|(kind, id, mut form)| {
        // No new link or file: keep the stored one.
        if form.file_url.trim().is_empty() {
            if let Some(existing) = admin_helpers::fetch_resources(&db, kind)?.into_iter().find(|r| r.id == id) {
                form.file_url = existing.file_url;
                form.file_type = existing.file_type.unwrap_or_default();
                form.file_size = existing.file_size.unwrap_or_default();
                form.file_name = existing.file_name.unwrap_or_default();
            }
        }
        admin_helpers::update_resource(&db, kind, &id, &form).map(|_| kind)
    });

    match result {
        Ok(kind) => set_notification(&session, &format!("{} updated successfully!", kind.label()), "success"),
        Err(e) => notify_failure(&session, e, "Failed to update resource."),
    }
    redirect_to(dashboard_url(&config))
}

async fn delete_resource_action(
    session: Session,
    db: web::Data<Database>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let result = kind_from(&field(&parsed, "kind"))
        .and_then(|kind| admin_helpers::delete_resource(&db, kind, field(&parsed, "resource_id").trim()));

    match result {
        Ok(true) => set_notification(&session, "Resource deleted successfully!", "success"),
        Ok(false) => set_notification(&session, "Resource not found.", "error"),
        Err(e) => notify_failure(&session, e, "Failed to delete resource."),
    }
    redirect_to(dashboard_url(&config))
}

// ====================================================================
// =============================== FAQS ===============================
// ====================================================================

async fn add_faq_action(
    session: Session,
    db: web::Data<Database>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    match admin_helpers::add_faq(&db, &form_helpers::faq_form(&parsed)) {
        Ok(_) => set_notification(&session, "FAQ added successfully!", "success"),
        Err(e) => notify_failure(&session, e, "Failed to add FAQ."),
    }
    redirect_to(dashboard_url(&config))
}

async fn update_faq_action(
    session: Session,
    db: web::Data<Database>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    match admin_helpers::update_faq(&db, field(&parsed, "faq_id").trim(), &form_helpers::faq_form(&parsed)) {
        Ok(_) => set_notification(&session, "FAQ updated successfully!", "success"),
        Err(e) => notify_failure(&session, e, "Failed to update FAQ."),
    }
    redirect_to(dashboard_url(&config))
}

async fn delete_faq_action(
    session: Session,
    db: web::Data<Database>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    match admin_helpers::delete_faq(&db, field(&parsed, "faq_id").trim()) {
        Ok(true) => set_notification(&session, "FAQ deleted successfully!", "success"),
        Ok(false) => set_notification(&session, "FAQ not found.", "error"),
        Err(e) => notify_failure(&session, e, "Failed to delete FAQ."),
    }
    redirect_to(dashboard_url(&config))
}

// ====================================================================
// ========================= NOTIFICATION LOGS ========================
// ====================================================================

async fn clear_subscriber_logs_action(
    session: Session,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> impl Responder {
    match admin_helpers::clear_log(&db, NotificationLog::Subscriber) {
        Ok(()) => set_notification(&session, "Email notifications cleared.", "success"),
        Err(e) => notify_failure(&session, e, "Failed to clear email notifications."),
    }
    redirect_to(dashboard_url(&config))
}

async fn clear_admin_logs_action(
    session: Session,
    db: web::Data<Database>,
    config: web::Data<Config>,
) -> impl Responder {
    match admin_helpers::clear_log(&db, NotificationLog::Admin) {
        Ok(()) => set_notification(&session, "Admin notifications cleared.", "success"),
        Err(e) => notify_failure(&session, e, "Failed to clear admin notifications."),
    }
    redirect_to(dashboard_url(&config))
}
