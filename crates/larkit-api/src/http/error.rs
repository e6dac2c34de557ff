//! Application error type mapping kernel failures to HTTP responses.
//!
//! Errors are returned as a JSON envelope:
//! `{"data": null, "meta": {"timestamp": ...}, "errors": [{"code", "message"}]}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use larkit_types::error::KernelError;

#[derive(Debug)]
pub enum AppError {
    Kernel(KernelError),
}

impl From<KernelError> for AppError {
    fn from(e: KernelError) -> Self {
        AppError::Kernel(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Kernel(e) => match e {
                KernelError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                KernelError::MalformedMessage(_) => (StatusCode::BAD_REQUEST, "MALFORMED_MESSAGE"),
                KernelError::DecryptFailure(_) => (StatusCode::BAD_REQUEST, "DECRYPT_FAILURE"),
                KernelError::InvalidReplyType { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_REPLY_TYPE")
                }
                KernelError::EncryptFailure(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "ENCRYPT_FAILURE")
                }
                KernelError::MissingConfiguration(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "MISSING_CONFIGURATION")
                }
                KernelError::TokenIssuanceFailure { .. } | KernelError::Transport(_) => {
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
                }
                KernelError::CacheWriteFailure { .. } | KernelError::Cache(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR")
                }
                KernelError::Handler(_) => (StatusCode::INTERNAL_SERVER_ERROR, "HANDLER_ERROR"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        // Server-side failure details stay in the logs.
        let message = match &self {
            AppError::Kernel(e) if e.is_client_error() => e.to_string(),
            AppError::Kernel(e) => {
                tracing::error!(error = %e, code, "webhook failed");
                status
                    .canonical_reason()
                    .unwrap_or("Internal Server Error")
                    .to_string()
            }
        };

        let body = json!({
            "data": null,
            "meta": {
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        for e in [
            KernelError::BadRequest("x".into()),
            KernelError::MalformedMessage("x".into()),
            KernelError::DecryptFailure("x".into()),
        ] {
            assert_eq!(AppError::from(e).parts().0, StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn server_errors_hide_details() {
        let response =
            AppError::from(KernelError::MissingConfiguration("webhook token".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_failures_map_to_502() {
        let e = KernelError::TokenIssuanceFailure {
            status: Some(500),
            body: "down".into(),
        };
        assert_eq!(AppError::from(e).parts(), (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"));
    }
}
