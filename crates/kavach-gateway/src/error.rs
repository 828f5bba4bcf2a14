//! Boundary error body: `{ "status": "error", "error": <kind>, "message": <text> }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kavach_core::{FailureCause, InferenceError, KavachError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.into(),
        }
    }
}

fn status_for(err: &KavachError) -> StatusCode {
    match err {
        KavachError::AnalysisFailed(cause) | KavachError::EngagementFailed(cause) => match cause {
            FailureCause::Contract(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FailureCause::Inference(InferenceError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            FailureCause::Inference(_) => StatusCode::BAD_GATEWAY,
        },
        KavachError::SessionConflict(_) => StatusCode::CONFLICT,
        KavachError::UnknownSession(_) => StatusCode::NOT_FOUND,
        KavachError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        KavachError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<KavachError> for ApiError {
    fn from(err: KavachError) -> Self {
        Self {
            status: status_for(&err),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = self.kind, "{}", self.message);
        }
        let body = serde_json::json!({
            "status": "error",
            "error": self.kind,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kavach_core::ContractViolation;

    #[test]
    fn failure_causes_map_to_distinct_statuses() {
        let contract = KavachError::EngagementFailed(FailureCause::Contract(ContractViolation::new(
            "reply",
            "missing",
            "{}",
        )));
        let timeout = KavachError::AnalysisFailed(FailureCause::Inference(InferenceError::Timeout(std::time::Duration::from_secs(60))));
        let refused = KavachError::AnalysisFailed(FailureCause::Inference(InferenceError::Refused("x".into())));

        assert_eq!(ApiError::from(contract).status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::from(timeout).status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ApiError::from(refused).status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::from(KavachError::SessionConflict("s".into())).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(KavachError::UnknownSession("s".into())).kind,
            "unknown_session"
        );
    }
}
