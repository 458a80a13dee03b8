//! Structured errors for the hearth gateway binary.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced by gateway handlers.
///
/// Strategy executors absorb network failures themselves; what reaches
/// this type is the unrecoverable remainder (database faults, broken
/// pass-through proxying), reported as 502 so the client still gets a
/// well-formed response. URLs rejected before any strategy runs are
/// reported as 400.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Forwarding a request to the origin failed outside the cached path.
    #[error("UPSTREAM_FAILED: {0}")]
    Upstream(String),

    /// Cache layer failure.
    #[error(transparent)]
    Cache(#[from] hearth_core::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        // A rejected URL is the caller's fault, not a broken upstream.
        let status = match &self {
            GatewayError::Cache(
                hearth_core::Error::InvalidInput(_) | hearth_core::Error::InvalidUrl(_),
            ) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        tracing::error!(error = %self, "gateway request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_maps_to_bad_gateway() {
        let response = GatewayError::Upstream("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_cache_error_converts() {
        let err: GatewayError = hearth_core::Error::InvalidUrl("nope".into()).into();
        assert!(err.to_string().contains("INVALID_URL"));
    }

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let err: GatewayError = hearth_core::Error::InvalidInput("unsupported scheme: file".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err: GatewayError = hearth_core::Error::InvalidUrl("nope".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_database_error_stays_bad_gateway() {
        let err: GatewayError = hearth_core::Error::MigrationFailed("boom".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
