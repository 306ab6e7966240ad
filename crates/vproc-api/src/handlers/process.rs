//! Upload notification handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, info, Instrument};
use vproc_models::decode_push_envelope;
use vproc_worker::PipelineOutcome;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body returned when a job finishes in this request.
pub const PROCESSED_BODY: &str = "Processing finished successfully";

/// Process the raw video named in a push notification.
///
/// The body is taken as raw bytes so every envelope problem surfaces as the
/// same validation error. The run is detached from the connection: a client
/// that hangs up does not interrupt a job halfway through its stages.
pub async fn process_video(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let raw_name = decode_push_envelope(&body)?;
    info!("Received upload notification for {}", raw_name);

    let pipeline = state.pipeline.clone();
    let outcome = tokio::spawn(async move { pipeline.run(&raw_name).await }.in_current_span())
        .await
        .map_err(|e| {
            error!("Pipeline task failed: {}", e);
            ApiError::internal(format!("pipeline task failed: {}", e))
        })??;

    Ok(match outcome {
        PipelineOutcome::Completed { .. } => (StatusCode::OK, PROCESSED_BODY).into_response(),
        PipelineOutcome::AlreadyProcessed { .. } => StatusCode::ACCEPTED.into_response(),
    })
}
