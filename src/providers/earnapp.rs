use crate::core::models::{format_usd, FetchOutcome, Service};
use crate::providers::{BalanceProvider, ProviderError, Session};
use async_trait::async_trait;
use reqwest::header::COOKIE;
use serde::Deserialize;

const MONEY_ENDPOINT: &str = "/dashboard/api/money";
const APP_ID: &str = "earnapp_dashboard";

#[derive(Debug, Deserialize)]
struct MoneyResponse {
    #[serde(default)]
    balance: Option<f64>,
}

pub struct EarnAppProvider {
    cookie: String,
    base_url: String,
}

impl EarnAppProvider {
    pub fn new(cookie: &str, base_url: &str) -> Self {
        Self {
            cookie: cookie.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_balance(&self, client: &reqwest::Client) -> Result<String, ProviderError> {
        let response = client
            .get(format!("{}{}", self.base_url, MONEY_ENDPOINT))
            .query(&[("appid", APP_ID)])
            .header(COOKIE, &self.cookie)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Http(status));
        }

        let money: MoneyResponse = response.json().await?;
        Ok(format_usd(money.balance.unwrap_or(0.0)))
    }
}

#[async_trait]
impl BalanceProvider for EarnAppProvider {
    fn service(&self) -> Service {
        Service::EarnApp
    }

    fn has_valid_credentials(&self) -> bool {
        !self.cookie.is_empty()
    }

    fn credential_error_hint(&self) -> &'static str {
        "Run `balance-bar credentials` to set the EarnApp cookie"
    }

    async fn refresh(&self, session: &mut Session) -> FetchOutcome {
        match self.fetch_balance(session.client()).await {
            Ok(balance) => FetchOutcome::Success(balance),
            Err(e) => {
                tracing::warn!(service = ?Service::EarnApp, error = %e, "Failed to fetch balance");
                e.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::REQUEST_TIMEOUT;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_fetch_formats_two_decimals() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/dashboard/api/money")
                    .query_param("appid", "earnapp_dashboard")
                    .header("cookie", "auth=xyz");
                then.status(200).json_body(json!({ "balance": 3.5 }));
            })
            .await;

        let provider = EarnAppProvider::new("auth=xyz", &server.base_url());
        let mut session = Session::new().unwrap();

        let outcome = provider.refresh(&mut session).await;

        mock.assert_async().await;
        assert_eq!(outcome, FetchOutcome::Success("$3.50".to_string()));
    }

    #[tokio::test]
    async fn test_missing_balance_defaults_to_zero() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/dashboard/api/money");
                then.status(200).json_body(json!({ "multiplier": 1 }));
            })
            .await;

        let provider = EarnAppProvider::new("auth=xyz", &server.base_url());
        let mut session = Session::new().unwrap();

        assert_eq!(
            provider.refresh(&mut session).await,
            FetchOutcome::Success("$0.00".to_string())
        );
    }

    #[tokio::test]
    async fn test_unauthorized_cookie_is_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/dashboard/api/money");
                then.status(401);
            })
            .await;

        let provider = EarnAppProvider::new("expired", &server.base_url());
        let mut session = Session::new().unwrap();

        assert_eq!(provider.refresh(&mut session).await, FetchOutcome::HttpError(401));
    }

    #[tokio::test]
    async fn test_garbage_body_is_unknown_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/dashboard/api/money");
                then.status(200).body("<html>login</html>");
            })
            .await;

        let provider = EarnAppProvider::new("auth=xyz", &server.base_url());
        let mut session = Session::new().unwrap();

        assert_eq!(provider.refresh(&mut session).await, FetchOutcome::UnknownError);
    }

    #[tokio::test]
    async fn test_slow_response_times_out_as_network_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/dashboard/api/money");
                then.status(200)
                    .delay(REQUEST_TIMEOUT + Duration::from_secs(5))
                    .json_body(json!({ "balance": 1.0 }));
            })
            .await;

        let provider = EarnAppProvider::new("auth=xyz", &server.base_url());
        let mut session = Session::new().unwrap();

        let started = Instant::now();
        let outcome = provider.refresh(&mut session).await;

        assert_eq!(outcome, FetchOutcome::NetworkError);
        assert!(started.elapsed() < REQUEST_TIMEOUT + Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) is closed on test machines.
        let provider = EarnAppProvider::new("auth=xyz", "http://127.0.0.1:9");
        let mut session = Session::new().unwrap();

        assert_eq!(provider.refresh(&mut session).await, FetchOutcome::NetworkError);
    }

    #[test]
    fn test_credentials() {
        assert!(!EarnAppProvider::new("  ", "http://localhost").has_valid_credentials());
        assert!(EarnAppProvider::new("a=b", "http://localhost").has_valid_credentials());
    }
}
