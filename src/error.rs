use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Everything a submission can fail with, each variant mapping to one status.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Bot token or chat id missing from the deployment.
    #[error("Missing TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID")]
    Configuration,

    /// A required form field is missing or blank.
    #[error("{0}")]
    Validation(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Telegram answered with something other than success.
    #[error("Telegram error: {status}")]
    Downstream { status: u16, detail: String },

    /// Transport failures and anything else unforeseen. Logged, never shown.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Configuration | RelayError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Downstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (error, detail) = match self {
            RelayError::Unexpected(_) => ("Internal Error".to_string(), None),
            RelayError::Downstream { detail, .. } => (self.to_string(), Some(detail.clone())),
            other => (other.to_string(), None),
        };
        ErrorBody {
            ok: false,
            error,
            detail,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(self.body());
        if matches!(self, RelayError::MethodNotAllowed) {
            (status, [(header::ALLOW, "POST")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
