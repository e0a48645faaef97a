use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    EarnApp,
    Honeygain,
}

impl Service {
    pub const ALL: [Service; 2] = [Service::EarnApp, Service::Honeygain];

    pub fn name(&self) -> &'static str {
        match self {
            Service::EarnApp => "EarnApp",
            Service::Honeygain => "Honeygain",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Service::EarnApp => "earnapp",
            Service::Honeygain => "honeygain",
        }
    }

    pub fn dashboard_url(&self) -> &'static str {
        match self {
            Service::EarnApp => "https://earnapp.com/dashboard",
            Service::Honeygain => "https://dashboard.honeygain.com/",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Service {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "earnapp" => Ok(Service::EarnApp),
            "honeygain" => Ok(Service::Honeygain),
            other => anyhow::bail!("Unknown service: {other}. Valid services: earnapp, honeygain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(String),
    AuthExpired,
    LoginFailed,
    HttpError(u16),
    NetworkError,
    UnknownError,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

pub fn format_usd(amount: f64) -> String {
    format!("${amount:.2}")
}

pub fn format_credits(credits: f64, usd_cents: f64) -> String {
    format!("{} credits ({})", format_count(credits), format_usd(usd_cents / 100.0))
}

fn format_count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
