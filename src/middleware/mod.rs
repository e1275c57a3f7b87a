use actix_session::{Session, SessionExt};
use actix_web::{dev, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::models::db_operations::collections_db_operations::next_timestamp_id;

const VISITOR_ID_KEY: &str = "visitor_id";

#[derive(Serialize)]
pub struct AuthenticatedAdmin {
    pub email: String,
    pub role: String,
}

impl FromRequest for AuthenticatedAdmin {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        match (session.get::<String>("email"), session.get::<String>("role")) {
            (Ok(Some(email)), Ok(Some(role))) if role == "admin" => ready(Ok(AuthenticatedAdmin { email, role })),
            _ => ready(Err(actix_web::error::ErrorUnauthorized("Not logged in."))),
        }
    }
}

pub fn admin_guard(session: &Session) -> bool {
    session.get::<String>("role").unwrap_or(None) == Some("admin".to_string())
}

/// Anonymous per-browser id used for comment likes. Created on first use and
/// kept in the session cookie.
#[derive(Debug, Clone)]
pub struct VisitorId(pub String);

impl FromRequest for VisitorId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        if let Ok(Some(id)) = session.get::<String>(VISITOR_ID_KEY) {
            return ready(Ok(VisitorId(id)));
        }

        let id = format!("user_{}", next_timestamp_id());
        match session.insert(VISITOR_ID_KEY, &id) {
            Ok(()) => ready(Ok(VisitorId(id))),
            Err(e) => {
                log::error!("Failed to store visitor id in session: {}", e);
                ready(Err(actix_web::error::ErrorInternalServerError("Session error")))
            }
        }
    }
}
