use crate::core::models::{format_credits, FetchOutcome, Service};
use crate::providers::{BalanceProvider, ProviderError, Session};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const TOKENS_ENDPOINT: &str = "/api/v1/users/tokens";
const BALANCES_ENDPOINT: &str = "/api/v1/users/balances";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct BalancesData {
    payout: Payout,
}

#[derive(Debug, Deserialize)]
struct Payout {
    credits: f64,
    usd_cents: f64,
}

pub struct HoneygainProvider {
    email: String,
    password: String,
    base_url: String,
}

impl HoneygainProvider {
    pub fn new(email: &str, password: &str, base_url: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn login(&self, client: &reqwest::Client) -> Result<String, ProviderError> {
        let response = client
            .post(format!("{}{}", self.base_url, TOKENS_ENDPOINT))
            .json(&LoginRequest {
                email: &self.email,
                password: &self.password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Http(status));
        }

        let body: Envelope<TokenData> = response.json().await?;
        if body.data.access_token.is_empty() {
            return Err(ProviderError::Malformed("empty access_token".to_string()));
        }

        Ok(body.data.access_token)
    }

    pub async fn fetch_balance(
        &self,
        client: &reqwest::Client,
        token: &str,
    ) -> Result<String, ProviderError> {
        let response = client
            .get(format!("{}{}", self.base_url, BALANCES_ENDPOINT))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ProviderError::Http(status));
        }

        let body: Envelope<BalancesData> = response.json().await?;
        let payout = body.data.payout;
        Ok(format_credits(payout.credits, payout.usd_cents))
    }
}

#[async_trait]
impl BalanceProvider for HoneygainProvider {
    fn service(&self) -> Service {
        Service::Honeygain
    }

    fn has_valid_credentials(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty()
    }

    fn credential_error_hint(&self) -> &'static str {
        "Run `balance-bar credentials` to set the Honeygain login"
    }

    async fn refresh(&self, session: &mut Session) -> FetchOutcome {
        let token = match session.token() {
            Some(token) => token.to_string(),
            None => match self.login(session.client()).await {
                Ok(token) => {
                    tracing::info!(service = ?Service::Honeygain, "Logged in");
                    session.set_token(token.clone());
                    token
                }
                Err(e) => {
                    tracing::warn!(service = ?Service::Honeygain, error = %e, "Login failed");
                    session.clear_token();
                    return FetchOutcome::LoginFailed;
                }
            },
        };

        match self.fetch_balance(session.client(), &token).await {
            Ok(balance) => FetchOutcome::Success(balance),
            Err(ProviderError::Unauthorized) => {
                tracing::info!(service = ?Service::Honeygain, "Access token expired");
                FetchOutcome::AuthExpired
            }
            Err(e) => {
                tracing::warn!(service = ?Service::Honeygain, error = %e, "Failed to fetch balance");
                e.into()
            }
        }
    }
}
