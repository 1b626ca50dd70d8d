//! Maps `rla_core::RlaError` onto the HTTP/JSON boundary (§6 "Ambient
//! resolution"): every handler returns `Result<_, AppError>` and this is the
//! only place that picks a status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rla_core::RlaError;
use serde::Serialize;

#[derive(Debug)]
pub struct AppError(pub RlaError);

impl From<RlaError> for AppError {
    fn from(err: RlaError) -> Self {
        AppError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "errorType")]
    error_type: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RlaError::InputValidation(_) => StatusCode::BAD_REQUEST,
            RlaError::State(_) => StatusCode::CONFLICT,
            RlaError::NotFound(_) => StatusCode::NOT_FOUND,
            RlaError::Unauditable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RlaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error_type: self.0.error_type(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
