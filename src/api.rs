//! Read-only HTTP query API over the results table.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::storage::{ResultReader, ResultRow};

#[derive(Clone)]
pub struct ApiState {
    pub reader: ResultReader,
}

impl ApiState {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            reader: ResultReader::new(db_path),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Roleta not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Database(e) => {
                error!("[API] Query failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Internal(msg) => {
                error!("[API] {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match self {
            ApiError::NotFound => "Roleta not found".to_string(),
            _ => "Internal server error".to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn create_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/roletas", get(list_roletas))
        .route("/roletas/{token}", get(get_roleta));

    Router::new()
        .nest("/api", api_routes)
        .route("/static/swagger.json", get(swagger))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run a blocking reader call on the blocking pool.
async fn with_reader<T, F>(state: &ApiState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ResultReader) -> rusqlite::Result<T> + Send + 'static,
{
    let reader = state.reader.clone();
    tokio::task::spawn_blocking(move || f(&reader))
        .await
        .map_err(|e| ApiError::Internal(format!("reader task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub async fn list_roletas(State(state): State<ApiState>) -> Result<Json<Vec<ResultRow>>, ApiError> {
    let rows = with_reader(&state, |r| r.fetch_all()).await?;
    Ok(Json(rows))
}

pub async fn get_roleta(
    State(state): State<ApiState>,
    Path(token): Path<String>,
) -> Result<Json<ResultRow>, ApiError> {
    with_reader(&state, move |r| r.fetch_one(&token))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn swagger() -> Json<Value> {
    Json(openapi_document())
}

/// OpenAPI 3.0 description of the query API.
pub fn openapi_document() -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "API Roletas",
            "version": "1.0.0",
            "description": "API para gerenciamento de dados de roletas"
        },
        "paths": {
            "/api/roletas": {
                "get": {
                    "summary": "Lista todas as roletas",
                    "responses": {
                        "200": {
                            "description": "Lista de roletas",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Roleta" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "/api/roletas/{token}": {
                "get": {
                    "summary": "Busca uma roleta pelo gametoken",
                    "parameters": [{
                        "name": "token",
                        "in": "path",
                        "required": true,
                        "schema": { "type": "string" }
                    }],
                    "responses": {
                        "200": {
                            "description": "Roleta encontrada",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Roleta" }
                                }
                            }
                        },
                        "404": { "description": "Roleta not found" }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Roleta": {
                    "type": "object",
                    "properties": {
                        "gametoken": { "type": "string" },
                        "arialabel": { "type": "string" },
                        "initialresults": { "type": "string" },
                        "data": { "type": "string" }
                    }
                }
            }
        }
    })
}
