use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use demandlens_infra::OutputLocations;

use crate::app::errors::json_error;
use crate::app::AppState;

/// `GET /ml-outputs/:name`: one of the four report tables as CSV.
pub async fn download(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    if !OutputLocations::file_names().contains(&name.as_str()) {
        return json_error(StatusCode::NOT_FOUND, "not_found", format!("unknown output '{name}'"));
    }

    match tokio::fs::read(state.config.output_dir.join(&name)).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("'{name}' has not been produced yet"),
        ),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "read_error", e.to_string()),
    }
}
