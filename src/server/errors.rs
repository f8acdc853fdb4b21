use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::loader::InputError;
use crate::pipeline::JobError;

pub fn input_error_to_response(err: InputError) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
}

pub fn job_error_to_response(err: JobError) -> Response {
    match err {
        JobError::Input(e) => input_error_to_response(e),
        JobError::Report(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "processing_error",
            format!("Error processing file: {e}"),
        ),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
