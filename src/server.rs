//! Passthrough HTTP API over the document store, plus the board view and the
//! static display page.

use std::path::Path;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::display::DisplayBoard;
use crate::error::ApiError;
use crate::store::{Document, DocumentStore, FindOptions, FindQuery};

/// Rough per-document size reported in `stats`.
const ESTIMATED_DOC_SIZE: u64 = 200;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub default_collection: String,
    pub board: DisplayBoard,
}

pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/test-connection", get(test_connection))
        .route("/api/mongodb-data", get(list_documents).post(find_documents))
        .route("/api/insert-sample", get(insert_sample))
        .route("/api/board", get(board));

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "passthrough server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            error!(error = %e, "cannot listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

async fn test_connection(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let collections = state.store.list_collections().await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Connected to document store. Found {} collections.", collections.len()),
        "collections": collections,
    })))
}

async fn list_documents(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let data = state.store.find(&state.default_collection, &FindQuery::all()).await?;
    Ok(Json(json!({ "success": true, "count": data.len(), "data": data })))
}

/// Body of `POST /api/mongodb-data`.
#[derive(Debug, Deserialize)]
pub struct FindRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub filter: Option<Document>,
    #[serde(default)]
    pub options: Option<FindOptions>,
}

async fn find_documents(
    State(state): State<AppState>,
    body: Result<Json<FindRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if request.action.as_deref() != Some("find") {
        return Err(ApiError::BadRequest("Invalid action".to_string()));
    }

    let collection = request
        .collection
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| state.default_collection.clone());
    info!(%collection, "loading documents");

    let query = FindQuery {
        filter: request.filter.unwrap_or_default(),
        options: request.options.unwrap_or_default(),
    };
    let data = state.store.find(&collection, &query).await?;
    let total = state.store.count(&collection).await?;

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
        "stats": {
            "count": total,
            "size": total * ESTIMATED_DOC_SIZE,
            "avgObjSize": if total > 0 { ESTIMATED_DOC_SIZE } else { 0 },
        },
    })))
}

/// Seed documents written by `GET /api/insert-sample`.
pub fn sample_documents() -> Vec<Document> {
    [
        json!({ "name": "Gold Price", "value": 36.599 }),
        json!({ "name": "Silver Price", "value": 0.295 }),
        json!({ "name": "Test Data", "value": "Sample entry" }),
    ]
    .into_iter()
    .filter_map(|doc| match doc {
        Value::Object(map) => Some(map),
        _ => None,
    })
    .collect()
}

async fn insert_sample(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let inserted = state.store.insert_many(&state.default_collection, sample_documents()).await?;
    Ok(Json(json!({ "success": true, "inserted": inserted })))
}

async fn board(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "fields": state.board.snapshot() }))
}
