mod earnapp;
mod honeygain;

use crate::core::models::{FetchOutcome, Service};
use crate::core::settings::Settings;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use earnapp::EarnAppProvider;
pub use honeygain::HoneygainProvider;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(StatusCode),

    #[error("Access token rejected")]
    Unauthorized,

    #[error("Unexpected response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Http(status)
        } else {
            ProviderError::Network(err)
        }
    }
}

impl From<ProviderError> for FetchOutcome {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Network(_) => FetchOutcome::NetworkError,
            ProviderError::Http(status) => FetchOutcome::HttpError(status.as_u16()),
            ProviderError::Unauthorized => FetchOutcome::AuthExpired,
            ProviderError::Malformed(_) => FetchOutcome::UnknownError,
        }
    }
}

pub struct Session {
    client: reqwest::Client,
    token: Option<String>,
}

impl Session {
    pub fn new() -> Result<Self, ProviderError> {
        Self::build(false)
    }

    // Not for EarnApp: a populated jar would replace its static Cookie header.
    pub fn with_cookie_store() -> Result<Self, ProviderError> {
        Self::build(true)
    }

    pub fn for_service(service: Service) -> Result<Self, ProviderError> {
        match service {
            Service::EarnApp => Self::new(),
            Service::Honeygain => Self::with_cookie_store(),
        }
    }

    fn build(cookie_store: bool) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(cookie_store)
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self {
            client,
            token: None,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait BalanceProvider: Send + Sync {
    fn service(&self) -> Service;

    fn has_valid_credentials(&self) -> bool;

    fn credential_error_hint(&self) -> &'static str;

    async fn refresh(&self, session: &mut Session) -> FetchOutcome;
}

#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn BalanceProvider>>,
}

impl ProviderRegistry {
    pub fn new(settings: &Settings) -> Self {
        let earnapp = &settings.services.earnapp;
        let honeygain = &settings.services.honeygain;

        let mut providers: Vec<Arc<dyn BalanceProvider>> = Vec::new();
        providers.push(Arc::new(EarnAppProvider::new(
            &earnapp.cookie,
            earnapp.base_url(),
        )));
        providers.push(Arc::new(HoneygainProvider::new(
            &honeygain.email,
            &honeygain.password,
            honeygain.base_url(),
        )));

        Self::from_providers(providers)
    }

    pub fn from_providers(providers: Vec<Arc<dyn BalanceProvider>>) -> Self {
        Self { providers }
    }

    pub fn get(&self, service: Service) -> Option<Arc<dyn BalanceProvider>> {
        self.providers
            .iter()
            .find(|p| p.service() == service)
            .cloned()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.service()))
            .finish()
    }
}
