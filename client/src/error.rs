use snafu::Snafu;

/// Failure talking to the backend.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("Invalid backend URL {url}"))]
    InvalidUrl { url: String, source: url::ParseError },

    #[snafu(display("Failed to reach backend at {url}: {message}"))]
    Unreachable { url: String, message: String },

    #[snafu(display("Request to {url} timed out"))]
    Timeout { url: String },

    #[snafu(display("Backend returned {status} for {url}: {detail}"))]
    Status {
        url: String,
        status: u16,
        detail: String,
    },

    #[snafu(display("Failed to decode response from {url}: {message}"))]
    Decode { url: String, message: String },

    /// The backend answered 200 but flagged the operation as failed.
    #[snafu(display("{message}"))]
    Rejected { message: String },
}

/// User-facing classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    NotFound,
    Server,
    Auth,
    RateLimit,
    Timeout,
    /// The local model runtime (Ollama) is not reachable.
    LocalModel,
    Other,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unreachable { .. } => ErrorKind::Network,
            ApiError::Timeout { .. } => ErrorKind::Timeout,
            ApiError::Status { status, detail, .. } => classify_status(*status, detail),
            ApiError::Rejected { message } => classify_message(message).unwrap_or(ErrorKind::Other),
            ApiError::InvalidUrl { .. } | ApiError::Decode { .. } => ErrorKind::Other,
        }
    }

    /// Message text carried by the error, without the URL decoration.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Status { detail, .. } => detail.clone(),
            ApiError::Rejected { message }
            | ApiError::Unreachable { message, .. }
            | ApiError::Decode { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

fn classify_status(status: u16, detail: &str) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::Auth,
        404 => ErrorKind::NotFound,
        408 | 504 => ErrorKind::Timeout,
        429 => ErrorKind::RateLimit,
        500..=599 => classify_message(detail).unwrap_or(ErrorKind::Server),
        _ => classify_message(detail).unwrap_or(ErrorKind::Other),
    }
}

/// Backend error details often wrap provider failures in a 500; look inside.
fn classify_message(message: &str) -> Option<ErrorKind> {
    let lower = message.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("api key") || has("authentication") || has("unauthorized") {
        Some(ErrorKind::Auth)
    } else if has("rate limit") || has("429") {
        Some(ErrorKind::RateLimit)
    } else if has("ollama") || has("11434") {
        Some(ErrorKind::LocalModel)
    } else if has("timed out") || has("timeout") {
        Some(ErrorKind::Timeout)
    } else {
        None
    }
}
