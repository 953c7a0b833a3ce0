//! Replay API routes
//!
//! - `POST /api/v1/replays` - Download, parse and store a replay
//! - `GET /api/v1/replays` - List active replays with pagination and filters
//! - `GET /api/v1/replays/:code` - Get an active replay by code
//! - `DELETE /api/v1/replays/:code` - Soft-delete a replay
//!
//! Business errors (409, 404) carry their localized message. System errors are
//! recorded in the error log and the caller only receives the log reference.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::{
    commands::{DeleteReplayCommand, DeleteReplayError, SaveReplayCommand, SaveReplayError},
    queries::{GetReplayError, GetReplayQuery, ListReplaysError, ListReplaysQuery},
};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::api::AppState;
use crate::error::{ErrorCategory, ReplayError};
use crate::error_log::{report, ErrorLogEntry};
use crate::middleware::Locale;

const SYSTEM_ERROR_MESSAGE: &str = "An internal error occurred";

pub fn replays_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(save_replay).get(list_replays))
        .route("/:code", get(get_replay).delete(delete_replay))
}

// ============================================================================
// Command Handlers
// ============================================================================

/// `201 Created` with the stored record
#[tracing::instrument(skip(state, payload), fields(file_name, owner_id))]
async fn save_replay(
    State(state): State<AppState>,
    Locale(locale): Locale,
    payload: Result<Json<SaveReplayCommand>, JsonRejection>,
) -> Response {
    // Malformed bodies get the same envelope as failed field validation.
    let command = match payload {
        Ok(Json(command)) => command,
        Err(rejection) => {
            return ReplayApiError::Validation(rejection.body_text())
                .respond(&state, Value::Null)
                .await
        },
    };
    tracing::Span::current()
        .record("file_name", command.file_name.as_str())
        .record("owner_id", command.owner_id.as_str());

    let cancel = state.shutdown.child_token();
    let context = json!({
        "method": "POST",
        "path": "/api/v1/replays",
        "fileName": command.file_name,
        "fileUrl": command.file_url,
        "ownerId": command.owner_id,
    });

    match super::commands::save::handle(&state.ingestor, command, &locale, &cancel).await {
        Ok(record) => {
            tracing::info!(code = %record.code, "Replay created via API");
            (StatusCode::CREATED, Json(ApiResponse::success(record))).into_response()
        },
        Err(e) => ReplayApiError::from(e).respond(&state, context).await,
    }
}

#[tracing::instrument(skip(state))]
async fn delete_replay(
    State(state): State<AppState>,
    Locale(locale): Locale,
    Path(code): Path<String>,
) -> Response {
    let context = json!({
        "method": "DELETE",
        "path": format!("/api/v1/replays/{code}"),
    });
    let command = DeleteReplayCommand { code };

    match super::commands::delete::handle(&state.ingestor, command, &locale).await {
        Ok(record) => (StatusCode::OK, Json(ApiResponse::success(record))).into_response(),
        Err(e) => ReplayApiError::from(e).respond(&state, context).await,
    }
}

// ============================================================================
// Query Handlers
// ============================================================================

#[tracing::instrument(skip(state))]
async fn get_replay(
    State(state): State<AppState>,
    Locale(locale): Locale,
    Path(code): Path<String>,
) -> Response {
    let context = json!({
        "method": "GET",
        "path": format!("/api/v1/replays/{code}"),
    });
    let query = GetReplayQuery { code };

    match super::queries::get::handle(&state.ingestor, query, &locale).await {
        Ok(record) => (StatusCode::OK, Json(ApiResponse::success(record))).into_response(),
        Err(e) => ReplayApiError::from(e).respond(&state, context).await,
    }
}

#[tracing::instrument(skip(state, query), fields(page = ?query.page, per_page = ?query.per_page))]
async fn list_replays(
    State(state): State<AppState>,
    Query(query): Query<ListReplaysQuery>,
) -> Response {
    let context = json!({
        "method": "GET",
        "path": "/api/v1/replays",
        "query": query,
    });

    match super::queries::list::handle(&state.ingestor, query).await {
        Ok(response) => {
            let meta = json!({ "pagination": response.pagination });
            (
                StatusCode::OK,
                Json(ApiResponse::success_with_meta(response.items, meta)),
            )
                .into_response()
        },
        Err(e) => ReplayApiError::from(e).respond(&state, context).await,
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum ReplayApiError {
    Validation(String),
    Replay(ReplayError),
}

impl From<SaveReplayError> for ReplayApiError {
    fn from(err: SaveReplayError) -> Self {
        match err {
            SaveReplayError::Validation(e) => Self::Validation(e.to_string()),
            SaveReplayError::Replay(e) => Self::Replay(e),
        }
    }
}

impl From<DeleteReplayError> for ReplayApiError {
    fn from(err: DeleteReplayError) -> Self {
        match err {
            DeleteReplayError::Validation(e) => Self::Validation(e.to_string()),
            DeleteReplayError::Replay(e) => Self::Replay(e),
        }
    }
}

impl From<GetReplayError> for ReplayApiError {
    fn from(err: GetReplayError) -> Self {
        match err {
            GetReplayError::Replay(e) => Self::Replay(e),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<ListReplaysError> for ReplayApiError {
    fn from(err: ListReplaysError) -> Self {
        match err {
            ListReplaysError::Replay(e) => Self::Replay(e),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl ReplayApiError {
    async fn respond(self, state: &AppState, context: Value) -> Response {
        let err = match self {
            ReplayApiError::Validation(message) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", message);
                return (StatusCode::BAD_REQUEST, Json(error)).into_response();
            },
            ReplayApiError::Replay(err) => err,
        };

        let status = err.status_code();
        let reference = if err.should_log() {
            let entry = ErrorLogEntry::from_error(&err, context);
            Some(report(state.error_logger.as_ref(), &entry).await)
        } else {
            None
        };

        let error = match err.category() {
            ErrorCategory::Business => ErrorResponse::new(err.error_code(), err.to_string()),
            ErrorCategory::System => {
                tracing::error!(error = %err, reference = ?reference, "Replay request failed");
                ErrorResponse::with_details(
                    err.error_code(),
                    SYSTEM_ERROR_MESSAGE,
                    json!({ "reference": reference }),
                )
            },
        };

        (status, Json(error)).into_response()
    }
}
