use thiserror::Error;

pub const BLANK_CITY_MESSAGE: &str = "Please enter a city name";

/// Classified failure of a single HTTP request.
///
/// Produced by the fetch client; the access layer turns it into a
/// [`LookupError`] with a message that is safe to show to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("resource not found (HTTP 404)")]
    NotFound,

    #[error("request rejected as unauthorized (HTTP 401)")]
    Unauthorized,

    #[error("rate limited by provider (HTTP 429)")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("no response from server: {0}")]
    NetworkUnreachable(String),

    #[error("unexpected server response (status {status:?}): {detail}")]
    UnknownServer { status: Option<u16>, detail: String },
}

impl FetchError {
    /// Response arrived but could not be understood.
    pub fn malformed(detail: impl Into<String>) -> Self {
        FetchError::UnknownServer { status: None, detail: detail.into() }
    }
}

/// What the failed lookup was for. Only affects the wording of the message.
#[derive(Debug, Clone, Copy)]
pub enum LookupTarget<'a> {
    City(&'a str),
    Coordinates,
}

/// Failure of an access-layer lookup.
///
/// `Display` yields the user-facing message; the underlying kind stays
/// available for callers that need to branch on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LookupError {
    pub kind: FetchError,
    pub message: String,
}

impl LookupError {
    pub fn new(kind: FetchError, target: LookupTarget<'_>) -> Self {
        let message = user_message(&kind, target);
        Self { kind, message }
    }
}

fn user_message(kind: &FetchError, target: LookupTarget<'_>) -> String {
    match (kind, target) {
        (FetchError::NotFound, LookupTarget::City(name)) => {
            format!("City '{name}' not found. Please check the spelling and try again.")
        }
        // Credentials are never mentioned to the user.
        (FetchError::Unauthorized, _) => {
            "Weather service is currently unavailable. Please try again later.".to_string()
        }
        (FetchError::RateLimited, _) => {
            "Too many requests. Please wait a moment and try again.".to_string()
        }
        (FetchError::Timeout, _) => {
            "Request timed out. Please check your connection and try again.".to_string()
        }
        (FetchError::NetworkUnreachable(_), _) => {
            "Network error. Please check your internet connection and try again.".to_string()
        }
        (FetchError::NotFound | FetchError::UnknownServer { .. }, LookupTarget::Coordinates) => {
            "Failed to fetch weather data for your location. Please try again later.".to_string()
        }
        (FetchError::UnknownServer { .. }, LookupTarget::City(_)) => {
            "Failed to fetch weather data. Please try again later.".to_string()
        }
    }
}
