#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use thiserror::Error;

/// Failure of a request to the QA service, rendered as a user facing message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", status_message(.code, .detail))]
    Status { code: u16, detail: Option<String> },

    #[error("network error, please check your connection")]
    Network(#[source] reqwest::Error),

    #[error("invalid response from server")]
    Decode(#[source] reqwest::Error),
}

impl ApiError {
    pub fn status(code: u16, detail: Option<String>) -> Self {
        ApiError::Status { code, detail }
    }

    pub fn http_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.http_code() == Some(401)
    }

    /// Text shown to the user. The server's `detail` wins for status errors,
    /// otherwise a fixed message per status or failure kind.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

fn status_message(code: &u16, detail: &Option<String>) -> String {
    if let Some(detail) = detail.as_deref().filter(|d| !d.is_empty()) {
        return detail.to_string();
    }
    match *code {
        400 => "invalid request parameters",
        401 => "unauthorized, please log in again",
        403 => "permission denied",
        404 => "requested resource not found",
        500 => "server error",
        _ => "request failed",
    }
    .to_string()
}

/// Render an error for display. An [`ApiError`] anywhere in the chain wins
/// over the outer context, since it already carries the user facing text.
pub fn describe_error(err: &eyre::Report) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .map(ApiError::user_message)
        .unwrap_or_else(|| err.to_string())
}
