use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use demandlens_infra::run_forecast_pipeline;

use crate::app::dto::ForecastResponse;
use crate::app::errors::{json_error, pipeline_error_to_response};
use crate::app::AppState;

const SALES_FIELD: &str = "sales";
const INVENTORY_FIELD: &str = "inventory";

/// `POST /api/forecast`: multipart upload of the sales and inventory tables.
///
/// The run happens on a blocking thread. Only one run at a time touches the
/// output directory; the lock travels with the run, so a timed-out run keeps
/// it until it actually finishes. The timeout covers both waiting for the lock
/// and the run itself.
pub async fn upload_and_run(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut sales: Option<Bytes> = None;
    let mut inventory: Option<Bytes> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_upload", e.to_string()),
        };
        let name = field.name().unwrap_or_default().to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_upload", e.to_string()),
        };
        match name.as_str() {
            SALES_FIELD => sales = Some(data),
            INVENTORY_FIELD => inventory = Some(data),
            other => tracing::debug!(field = other, "ignoring unexpected upload field"),
        }
    }

    let (Some(sales), Some(inventory)) = (sales, inventory) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "missing_file",
            "both 'sales' and 'inventory' files are required",
        );
    };

    let uploads = match stage_uploads(&sales, &inventory).await {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!(error = %e, "failed to stage uploads");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "upload_storage", e.to_string());
        }
    };

    let run_lock = state.run_lock.clone();
    let output_dir = state.config.output_dir.clone();
    let pipeline = state.config.pipeline.clone();
    // Waiting for an earlier run counts against this request's timeout.
    let run = async move {
        let permit = run_lock.lock_owned().await;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let sales_path = uploads.path().join("sales.csv");
            let inventory_path = uploads.path().join("inventory.csv");
            run_forecast_pipeline(&sales_path, &inventory_path, &output_dir, &pipeline)
        })
        .await
    };

    match tokio::time::timeout(state.config.run_timeout, run).await {
        Err(_) => {
            tracing::warn!(timeout_secs = state.config.run_timeout.as_secs(), "pipeline run timed out");
            json_error(
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                "forecast run did not finish in time",
            )
        }
        Ok(Err(join_err)) => {
            tracing::error!(error = %join_err, "pipeline task failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", join_err.to_string())
        }
        Ok(Ok(Err(e))) => {
            tracing::warn!(error = %e, "pipeline run rejected");
            pipeline_error_to_response(e)
        }
        Ok(Ok(Ok(result))) => (StatusCode::OK, Json(ForecastResponse::from(&result))).into_response(),
    }
}

async fn stage_uploads(sales: &[u8], inventory: &[u8]) -> std::io::Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    tokio::fs::write(dir.path().join("sales.csv"), sales).await?;
    tokio::fs::write(dir.path().join("inventory.csv"), inventory).await?;
    Ok(dir)
}
