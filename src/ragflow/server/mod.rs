// SPDX-License-Identifier: MIT

//! HTTP surface for registered workflows

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Instrument;

use crate::adk::error::{FailureKind, Result, WorkflowError};
use crate::ragflow::workflow::{WorkflowDescription, WorkflowRegistry};

pub fn router(registry: WorkflowRegistry) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/{id}", get(get_workflow))
        .route("/api/workflows/{id}/execute", post(execute_workflow))
        .route("/api/workflows/{id}/stream", post(stream_workflow))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(registry)
}

pub async fn serve(port: u16, registry: WorkflowRegistry) -> Result<()> {
    let app = router(registry);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// A failed request, rendered as `{status: "failed", error, kind}`
struct ApiError(WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = match kind {
            FailureKind::NotFound => StatusCode::NOT_FOUND,
            FailureKind::InvalidInput | FailureKind::Fatal => StatusCode::UNPROCESSABLE_ENTITY,
            FailureKind::Defect => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({
            "status": "failed",
            "error": self.0.to_string(),
            "kind": kind,
        });
        (status, Json(body)).into_response()
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_workflows(State(registry): State<WorkflowRegistry>) -> Json<Value> {
    let workflows: Vec<Value> = registry
        .list()
        .await
        .iter()
        .map(|w| json!({ "id": w.id(), "description": w.description() }))
        .collect();
    Json(json!(workflows))
}

async fn get_workflow(
    State(registry): State<WorkflowRegistry>,
    Path(id): Path<String>,
) -> std::result::Result<Json<WorkflowDescription>, ApiError> {
    let workflow = registry.require(&id).await?;
    Ok(Json(workflow.describe()))
}

async fn execute_workflow(
    State(registry): State<WorkflowRegistry>,
    Path(id): Path<String>,
    Json(input): Json<Value>,
) -> std::result::Result<Json<Value>, ApiError> {
    let workflow = registry.require(&id).await?;
    let outcome = workflow.run_tracked(input).await?;

    Ok(Json(json!({
        "status": "success",
        "run_id": outcome.run_id,
        "result": outcome.output,
    })))
}

async fn stream_workflow(
    State(registry): State<WorkflowRegistry>,
    Path(id): Path<String>,
    Json(input): Json<Value>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>, ApiError>
{
    let workflow = registry.require(&id).await?;
    let (tx, rx) = mpsc::channel(100);

    let span = tracing::info_span!("workflow_stream", workflow = %id);
    tokio::spawn(
        async move {
            // Failures are reported to the client as a run_failed event
            let _ = workflow.run_stream(input, tx).await;
        }
        .instrument(span),
    );

    let stream = ReceiverStream::new(rx).map(|event| Event::default().json_data(event));

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1))))
}
