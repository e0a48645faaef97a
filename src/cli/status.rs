use crate::core::models::{FetchOutcome, Service};
use crate::core::settings::Settings;
use crate::daemon::publisher::{display_text, LOGIN_ERROR_TEXT, NOT_CONFIGURED_TEXT};
use crate::providers::{BalanceProvider, ProviderRegistry, Session};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct StatusOutput {
    services: BTreeMap<String, ServiceStatus>,
    #[serde(with = "chrono::serde::ts_seconds")]
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ServiceStatus {
    display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run(json: bool, service_filter: Option<String>) -> Result<()> {
    let settings = Settings::load()?;

    let services = select_services(&settings, service_filter.as_deref())?;
    if services.is_empty() {
        anyhow::bail!("No service enabled. Check your configuration.");
    }

    let registry = ProviderRegistry::new(&settings);
    let results = collect_status(&registry, &services).await;

    if json {
        let output = StatusOutput {
            services: results,
            fetched_at: Utc::now(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&services, &results);
    }

    Ok(())
}

fn select_services(settings: &Settings, filter: Option<&str>) -> Result<Vec<Service>> {
    match filter {
        Some(name) => Ok(vec![name.parse()?]),
        None => Ok(Service::ALL
            .into_iter()
            .filter(|s| settings.is_enabled(*s))
            .collect()),
    }
}

async fn collect_status(
    registry: &ProviderRegistry,
    services: &[Service],
) -> BTreeMap<String, ServiceStatus> {
    let mut results = BTreeMap::new();

    for service in services {
        let status = match registry.get(*service) {
            Some(provider) => fetch_service_status(provider.as_ref()).await,
            None => ServiceStatus {
                display: NOT_CONFIGURED_TEXT.to_string(),
                balance: None,
                error: None,
            },
        };
        results.insert(service.key().to_string(), status);
    }

    results
}

async fn fetch_service_status(provider: &dyn BalanceProvider) -> ServiceStatus {
    if !provider.has_valid_credentials() {
        return ServiceStatus {
            display: NOT_CONFIGURED_TEXT.to_string(),
            balance: None,
            error: Some(provider.credential_error_hint().to_string()),
        };
    }

    let mut session = match Session::for_service(provider.service()) {
        Ok(session) => session,
        Err(e) => {
            return ServiceStatus {
                display: "Error".to_string(),
                balance: None,
                error: Some(e.to_string()),
            }
        }
    };

    let outcome = provider.refresh(&mut session).await;
    tracing::debug!(service = %provider.service(), ?outcome, "One-shot fetch finished");

    match outcome {
        FetchOutcome::Success(balance) => ServiceStatus {
            display: balance.clone(),
            balance: Some(balance),
            error: None,
        },
        // A freshly issued token was rejected straight away.
        FetchOutcome::AuthExpired => ServiceStatus {
            display: LOGIN_ERROR_TEXT.to_string(),
            balance: None,
            error: Some("Access token rejected".to_string()),
        },
        other => ServiceStatus {
            display: display_text(&other).unwrap_or_default(),
            balance: None,
            error: Some(describe(&other)),
        },
    }
}

fn describe(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::LoginFailed => "Login rejected".to_string(),
        FetchOutcome::HttpError(status) => format!("HTTP status {status}"),
        FetchOutcome::NetworkError => "Network unreachable".to_string(),
        _ => "Unexpected response".to_string(),
    }
}

fn print_text_output(services: &[Service], results: &BTreeMap<String, ServiceStatus>) {
    for service in services {
        let Some(status) = results.get(service.key()) else {
            continue;
        };

        println!("{:<10} {}", format!("{}:", service.name()), status.display);
        if let Some(error) = &status.error {
            println!("  {error}");
            if status.balance.is_none() && status.display != NOT_CONFIGURED_TEXT {
                println!("  Check {}", service.dashboard_url());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_select_services() {
        let mut settings = Settings::default();
        assert_eq!(
            select_services(&settings, None).unwrap(),
            vec![Service::EarnApp, Service::Honeygain]
        );

        settings.set_enabled(Service::EarnApp, false);
        assert_eq!(
            select_services(&settings, None).unwrap(),
            vec![Service::Honeygain]
        );
        assert_eq!(
            select_services(&settings, Some("EarnApp")).unwrap(),
            vec![Service::EarnApp]
        );
        assert!(select_services(&settings, Some("swagbucks")).is_err());
    }

    #[tokio::test]
    async fn test_collect_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/dashboard/api/money");
                then.status(200).json_body(serde_json::json!({ "balance": 1.25 }));
            })
            .await;

        let mut settings = Settings::default();
        settings.services.earnapp.cookie = "session=1".to_string();
        settings.services.earnapp.base_url = Some(server.base_url());

        let registry = ProviderRegistry::new(&settings);
        let results = collect_status(&registry, &Service::ALL).await;

        let earnapp = &results["earnapp"];
        assert_eq!(earnapp.display, "$1.25");
        assert_eq!(earnapp.balance.as_deref(), Some("$1.25"));
        assert!(earnapp.error.is_none());

        let honeygain = &results["honeygain"];
        assert_eq!(honeygain.display, NOT_CONFIGURED_TEXT);
        assert!(honeygain.error.is_some());
    }

    #[tokio::test]
    async fn test_collect_status_login_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/users/tokens");
                then.status(403);
            })
            .await;

        let mut settings = Settings::default();
        settings.services.honeygain.email = "me@example.com".to_string();
        settings.services.honeygain.password = "hunter2".to_string();
        settings.services.honeygain.base_url = Some(server.base_url());

        let registry = ProviderRegistry::new(&settings);
        let results = collect_status(&registry, &[Service::Honeygain]).await;

        let honeygain = &results["honeygain"];
        assert_eq!(honeygain.display, LOGIN_ERROR_TEXT);
        assert_eq!(honeygain.error.as_deref(), Some("Login rejected"));
    }
}
