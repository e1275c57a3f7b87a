use std::sync::Arc;

use helper::autosave_helpers::AutosaveScheduler;
use relay::{MailRelay, MembershipForwarder};

/// Shared services handed to every handler.
pub struct AppState {
    pub relay: Arc<dyn MailRelay>,
    pub membership: MembershipForwarder,
    pub autosave: AutosaveScheduler,
}

pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod relay;
pub mod routes;
pub mod setup;
