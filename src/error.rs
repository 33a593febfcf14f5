use thiserror::Error;

/// Failures surfaced to the operator. Every variant is scoped to the action
/// that triggered it; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Query, auth or storage failure reported by the hosted backend.
    #[error("{0}")]
    Service(String),

    /// Input rejected before any network call was attempted.
    #[error("{0}")]
    Validation(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("not signed in")]
    Unauthenticated,

    /// Structured error body returned by the notification dispatch function.
    #[error("{}", format_dispatch(.message, .details.as_deref()))]
    Dispatch {
        message: String,
        details: Option<String>,
    },
}

fn format_dispatch(message: &str, details: Option<&str>) -> String {
    match details {
        Some(details) if !details.is_empty() => format!("{message} ({details})"),
        _ => message.to_string(),
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(e: reqwest::Error) -> Self {
        ConsoleError::Service(e.to_string())
    }
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;
