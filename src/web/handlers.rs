use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::{db::LabeledLogEntry, AppState};

use super::RECENT_LOG_LIMIT;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "log not found".into(),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("error: {err:#}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Log ids are row ids; anything that is not one names no log.
fn parse_log_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found())
}

#[derive(Debug, Deserialize)]
pub struct LabelForm {
    #[serde(default)]
    name: String,
}

pub async fn list_logs(
    State(state): State<AppState>,
) -> Result<Json<Vec<LabeledLogEntry>>, ApiError> {
    let logs = state.db.list_recent_logs(RECENT_LOG_LIMIT).await?;
    Ok(Json(logs))
}

pub async fn get_log(
    State(state): State<AppState>,
    Path(log_id): Path<String>,
) -> Result<Json<LabeledLogEntry>, ApiError> {
    let log_id = parse_log_id(&log_id)?;
    state
        .db
        .get_labeled_log(log_id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

pub async fn label_log(
    State(state): State<AppState>,
    Path(log_id): Path<String>,
    Form(form): Form<LabelForm>,
) -> Result<Json<LabeledLogEntry>, ApiError> {
    let log_id = parse_log_id(&log_id)?;
    if form.name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    state
        .db
        .label_log(log_id, &form.name)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

/// Sends a stored signal back out through the device that captured it.
pub async fn replay_log(
    State(state): State<AppState>,
    Path(log_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let log_id = parse_log_id(&log_id)?;
    let entry = state
        .db
        .get_log(log_id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    let signal = entry
        .signal()
        .map_err(|err| anyhow::Error::new(err).context(format!("log {log_id} has unreadable data")))?;

    state
        .remote
        .replay(&entry.deviceid, &signal)
        .await
        .map_err(|err| anyhow::Error::new(err).context(format!("failed to replay log {log_id}")))?;

    Ok(StatusCode::OK)
}
