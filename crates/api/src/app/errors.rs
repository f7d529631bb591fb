use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use demandlens_infra::PipelineError;

pub fn pipeline_error_to_response(err: PipelineError) -> axum::response::Response {
    match err {
        PipelineError::Ingest(e) => json_error(StatusCode::BAD_REQUEST, "invalid_input", e.to_string()),
        PipelineError::Alignment(e) => json_error(StatusCode::BAD_REQUEST, "invalid_input", e.to_string()),
        PipelineError::Config(e) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_configuration", e.to_string())
        }
        e @ (PipelineError::Output { .. } | PipelineError::Encode { .. }) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "output_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
