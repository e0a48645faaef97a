use crate::core::models::FetchOutcome;

pub const DISABLED_TEXT: &str = "Disabled";
pub const WAITING_TEXT: &str = "Waiting...";
pub const NOT_CONFIGURED_TEXT: &str = "Not configured";
pub const LOGIN_ERROR_TEXT: &str = "Error (Login)";

pub fn display_text(outcome: &FetchOutcome) -> Option<String> {
    let text = match outcome {
        FetchOutcome::Success(balance) => return Some(balance.clone()),
        FetchOutcome::AuthExpired => return None,
        FetchOutcome::LoginFailed => LOGIN_ERROR_TEXT,
        FetchOutcome::HttpError(_) => "Error (HTTP)",
        FetchOutcome::NetworkError => "Error (Network)",
        FetchOutcome::UnknownError => "Error",
    };
    Some(text.to_string())
}
