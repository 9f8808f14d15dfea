//! Axum handlers and the router.
//!
//! Error contract: engine errors map to status codes by category —
//! `NotFound` 404, `InvalidState` 400, `RoleUnavailable` 503,
//! `MalformedAgentOutput` 502, `Storage` 500. Bodies are always
//! `{"error": "..."}`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use fractal_core::types::NodeKind;
use fractal_runtime::orchestrator::CreateNodeRequest;
use fractal_runtime::{Engine, EngineError, GraphOutcome};

use crate::api::{
    CopyBody, CopyResponse, CreateNodeBody, DeleteBody, DeleteResponse, GraphCounts,
    GraphResponse, MergeBody, MergeResponse, MessageResponse, NodeResponse, SendMessageBody,
    SummarizeResponse, TreeNodeResponse,
};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The orchestration engine.
    pub engine: Arc<Engine>,
}

/// Engine error adapted to an HTTP response.
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidState(_) => StatusCode::BAD_REQUEST,
            EngineError::RoleUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::MalformedAgentOutput(_) => StatusCode::BAD_GATEWAY,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Build the router with all API routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/nodes", post(create_node))
        .route("/api/v1/nodes/tree", get(get_tree))
        .route("/api/v1/nodes/merge", post(merge_nodes))
        .route(
            "/api/v1/nodes/{node_id}/messages",
            post(send_message).get(get_messages),
        )
        .route("/api/v1/nodes/{node_id}/summarize", post(summarize_node))
        .route("/api/v1/nodes/{node_id}/delete", post(delete_node))
        .route("/api/v1/nodes/{node_id}/copy", post(copy_node))
        .route("/api/v1/nodes/{node_id}/graph", get(get_graph))
        .route("/health", get(health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

async fn create_node(
    State(state): State<AppState>,
    Json(body): Json<CreateNodeBody>,
) -> ApiResult<Json<NodeResponse>> {
    let kind: NodeKind = body
        .node_type
        .parse()
        .map_err(EngineError::InvalidState)?;
    let node = state.engine.create(&CreateNodeRequest {
        parent_id: body.parent_id,
        title: body.title,
        kind,
    })?;
    Ok(Json(NodeResponse::from(node)))
}

async fn send_message(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    Json(body): Json<SendMessageBody>,
) -> ApiResult<Json<MessageResponse>> {
    let outcome = state.engine.send_message(&node_id, &body.content).await?;
    Ok(Json(MessageResponse::from(outcome)))
}

async fn get_messages(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let messages = state.engine.messages(&node_id)?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

async fn summarize_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> ApiResult<Json<SummarizeResponse>> {
    let outcome = state.engine.summarize(&node_id).await?;
    let summary: Value = serde_json::from_str(&outcome.summary.payload)
        .map_err(|e| EngineError::Storage(fractal_store::StoreError::from(e)))?;

    let (status, counts, error) = match outcome.graph {
        GraphOutcome::Success(update) => (
            "success",
            Some(GraphCounts {
                entities: update.entities,
                relations_added: update.relations_added,
                skipped: update.skipped,
            }),
            None,
        ),
        GraphOutcome::Failed { error } => ("failed", None, Some(error)),
    };

    Ok(Json(SummarizeResponse {
        summary_id: outcome.summary.id,
        node_id,
        summary,
        graph_extraction_status: status.to_string(),
        knowledge_graph: counts,
        graph_extraction_error: error,
    }))
}

async fn merge_nodes(
    State(state): State<AppState>,
    Json(body): Json<MergeBody>,
) -> ApiResult<Json<MergeResponse>> {
    let outcome = state
        .engine
        .merge(&body.source_node_id, &body.target_node_id)
        .await?;
    Ok(Json(MergeResponse::from(outcome)))
}

async fn delete_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    body: Option<Json<DeleteBody>>,
) -> ApiResult<Json<DeleteResponse>> {
    let cascade = body.map(|Json(b)| b.cascade).unwrap_or_default();
    let outcome = state.engine.delete(&node_id, cascade).await?;
    Ok(Json(DeleteResponse::from(outcome)))
}

async fn copy_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    body: Option<Json<CopyBody>>,
) -> ApiResult<Json<CopyResponse>> {
    let new_parent = body.and_then(|Json(b)| b.new_parent_id);
    let outcome = state.engine.copy(&node_id, new_parent.as_deref()).await?;
    Ok(Json(CopyResponse::from(outcome)))
}

async fn get_tree(State(state): State<AppState>) -> ApiResult<Json<Vec<TreeNodeResponse>>> {
    let tree = state.engine.tree()?;
    Ok(Json(tree.into_iter().map(TreeNodeResponse::from).collect()))
}

async fn get_graph(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> ApiResult<Json<GraphResponse>> {
    let view = state.engine.graph(&node_id)?;
    Ok(Json(GraphResponse::from_view(&node_id, view)))
}
