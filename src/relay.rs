use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Relay access key is not configured")]
    NotConfigured,
}

/// One message handed to the form relay. `reply_to` is the relay's `email` field.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub subject: String,
    pub from_name: String,
    pub reply_to: String,
    pub message: String,
}

/// Anything that can deliver an [`OutboundEmail`]. `Ok(false)` means the relay
/// answered but refused the message.
pub trait MailRelay: Send + Sync {
    fn send<'a>(&'a self, email: &'a OutboundEmail) -> BoxFuture<'a, Result<bool, RelayError>>;
}

#[derive(Deserialize)]
struct RelayResponse {
    #[serde(default)]
    success: bool,
}

/// Web3Forms-style relay: form-encoded POST, `{ "success": bool }` back.
#[derive(Clone)]
pub struct FormRelay {
    client: Client,
    endpoint: String,
    access_key: String,
}

impl FormRelay {
    pub fn new(endpoint: String, access_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            access_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.relay.endpoint.clone(), config.relay_access_key.clone())
    }

    async fn submit(&self, email: &OutboundEmail) -> Result<bool, RelayError> {
        if self.access_key.is_empty() {
            return Err(RelayError::NotConfigured);
        }
        let fields = [
            ("access_key", self.access_key.as_str()),
            ("subject", email.subject.as_str()),
            ("from_name", email.from_name.as_str()),
            ("email", email.reply_to.as_str()),
            ("message", email.message.as_str()),
        ];
        let response = self.client.post(&self.endpoint).form(&fields).send().await?;
        let body: RelayResponse = response.json().await?;
        Ok(body.success)
    }
}

impl MailRelay for FormRelay {
    fn send<'a>(&'a self, email: &'a OutboundEmail) -> BoxFuture<'a, Result<bool, RelayError>> {
        Box::pin(self.submit(email))
    }
}

/// Posts membership registrations to the spreadsheet script. The response body is not read.
#[derive(Clone)]
pub struct MembershipForwarder {
    client: Client,
    endpoint: String,
}

impl MembershipForwarder {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.relay.membership_endpoint.clone())
    }

    pub async fn forward(&self, fullname: &str, faculty: &str) -> Result<(), RelayError> {
        self.client
            .post(&self.endpoint)
            .form(&[("fullname", fullname), ("faculty", faculty)])
            .send()
            .await?;
        Ok(())
    }
}
