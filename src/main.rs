use actix_cors::Cors;
use actix_csrf::CsrfMiddleware;
use actix_session::{storage::CookieSessionStore, SessionExt, SessionMiddleware};
use actix_web::{
    cookie::Key,
    middleware::{DefaultHeaders, Logger},
    web, App, HttpResponse, HttpServer, Responder,
};
use clap::Parser;
use rand::prelude::StdRng;
use redb::Database;
use society_site::{
    config::Config,
    helper::autosave_helpers::AutosaveScheduler,
    middleware::admin_guard,
    relay::{FormRelay, MailRelay, MembershipForwarder},
    routes, AppState,
};
use std::convert::TryFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tera::Tera;

async fn root_handler() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

#[derive(Parser, Debug)]
#[command(name = "society_server", author, version, about = "Starts the society site web server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn build_cors(allowed_origins: &str) -> Cors {
    let methods = vec!["GET", "POST"];
    let headers = vec![
        actix_web::http::header::AUTHORIZATION,
        actix_web::http::header::ACCEPT,
        actix_web::http::header::CONTENT_TYPE,
    ];
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(methods)
        .allowed_headers(headers)
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Failed to load configuration: {}", e))
    })?;

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let tera = Tera::new("templates/**/*.html").map_err(|e| {
        log::error!("Tera initialization failed: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let db_path = config.content_db_path();
    let db = Database::open(&db_path).map_err(|e| {
        log::error!(
            "content.db not found at '{}' ({}). Run 'setup_cli --env-file <path> db setup'",
            db_path.display(),
            e
        );
        std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string())
    })?;
    let db_data = web::Data::new(db);

    if config.relay_access_key.is_empty() {
        log::warn!("RELAY_ACCESS_KEY is not set. Notification emails will only be logged.");
    }
    let relay: Arc<dyn MailRelay> = Arc::new(FormRelay::from_config(&config));
    let app_state = web::Data::new(AppState {
        relay,
        membership: MembershipForwarder::from_config(&config),
        autosave: AutosaveScheduler::new(Duration::from_millis(config.autosave_delay_ms)),
    });

    let session_key_bytes = hex::decode(&config.session_secret_key)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("SESSION_SECRET_KEY is not valid hex: {}", e)))?;
    let session_key = Key::try_from(session_key_bytes.as_slice())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("SESSION_SECRET_KEY is too short: {}", e)))?;

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
            .cookie_secure(config.use_secure_cookies)
            .cookie_http_only(true)
            .cookie_same_site(actix_web::cookie::SameSite::Lax)
            .build();

        let admin_url_prefix = config.admin_url_prefix.clone();

        App::new()
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(tera.clone()))
            .app_data(db_data.clone())
            .app_data(app_state.clone())
            .service(actix_files::Files::new("/static", "./static"))
            .route("/", web::get().to(root_handler))
            // Sessions carry the admin login and the anonymous visitor id for likes.
            .service(
                web::scope("")
                    .wrap(session_mw)
                    .configure(routes::public::config_api)
                    .service(
                        web::scope("/management").service(
                            web::scope(&admin_url_prefix)
                                .wrap(
                                    CsrfMiddleware::<StdRng>::new()
                                        .set_cookie(
                                            actix_web::http::Method::GET,
                                            format!("/management/{}/login", admin_url_prefix),
                                        )
                                        .set_cookie(
                                            actix_web::http::Method::GET,
                                            format!("/management/{}/dashboard", admin_url_prefix),
                                        ),
                                )
                                .configure(routes::admin::config_login)
                                .service(
                                    web::scope("")
                                        .guard(actix_web::guard::fn_guard(|ctx| admin_guard(&ctx.get_session())))
                                        .configure(routes::admin::config_dashboard),
                                ),
                        ),
                    ),
            )
    })
    .bind(server_address)?
    .run()
    .await
}
