//! HTTP surface for remote derivation calls.
//!
//! - `POST /api/derive/:source_id` runs the engine and returns a [`Derivation`].
//! - `POST /api/procedures/:name/:source_id` dispatches through the registry.
//! - `GET /api/sources/:source_id/actions` returns the source's [`VisibleActions`].

use crate::core::{DeriveError, RecordId};
use crate::derive::{Derivation, DerivationEngine, VisibleActions, reconcile_actions};
use crate::registry::DerivationRegistry;
use crate::storage::RecordStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_id: Option<RecordId>,
}

#[derive(Debug, Serialize)]
pub struct ProcedureResponse {
    pub derived_id: RecordId,
}

#[derive(Debug)]
pub struct WebError(DeriveError);

impl From<DeriveError> for WebError {
    fn from(err: DeriveError) -> Self {
        WebError(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, code) = match &err {
            DeriveError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            DeriveError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            DeriveError::UnknownHandler(_) => (StatusCode::NOT_FOUND, "unknown_handler"),
            DeriveError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
            DeriveError::PartialCascade { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "partial_cascade")
            }
            DeriveError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
        };

        let body = Json(ErrorResponse {
            error: err.to_string(),
            code: code.to_string(),
            derived_id: err.derived_id().cloned(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

pub struct WebState<S> {
    pub engine: DerivationEngine<S>,
    pub registry: Arc<DerivationRegistry>,
}

impl<S> Clone for WebState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

pub fn router<S: RecordStore + 'static>(
    engine: DerivationEngine<S>,
    registry: Arc<DerivationRegistry>,
) -> Router {
    Router::new()
        .route("/api/derive/:source_id", post(derive_handler::<S>))
        .route("/api/procedures/:name/:source_id", post(procedure_handler::<S>))
        .route("/api/sources/:source_id/actions", get(actions_handler::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(WebState { engine, registry })
}

async fn derive_handler<S: RecordStore + 'static>(
    State(state): State<WebState<S>>,
    Path(source_id): Path<String>,
) -> Result<Json<Derivation>> {
    let derivation = state.engine.derive(&RecordId::new(source_id)).await?;
    Ok(Json(derivation))
}

async fn procedure_handler<S: RecordStore + 'static>(
    State(state): State<WebState<S>>,
    Path((name, source_id)): Path<(String, String)>,
) -> Result<Json<ProcedureResponse>> {
    let derived_id = state
        .registry
        .invoke(&name, &RecordId::new(source_id))
        .await?;
    Ok(Json(ProcedureResponse { derived_id }))
}

async fn actions_handler<S: RecordStore + 'static>(
    State(state): State<WebState<S>>,
    Path(source_id): Path<String>,
) -> Result<Json<VisibleActions>> {
    let actions = reconcile_actions(
        &**state.engine.store(),
        state.engine.config(),
        &RecordId::new(source_id),
    )
    .await?;
    Ok(Json(actions))
}
