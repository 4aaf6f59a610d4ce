//! REST API module.
//!
//! Contains all API routes and handlers following the browser client contract.

mod auth;
mod dashboard;
mod protocol;
mod quotes;
mod report_items;
mod reports;
mod search;
mod settings;
mod snapshot;
mod suppliers;
mod users;

pub use auth::*;
pub use dashboard::*;
pub use protocol::*;
pub use quotes::*;
pub use report_items::*;
pub use reports::*;
pub use search::*;
pub use settings::*;
pub use snapshot::*;
pub use suppliers::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::roles::View;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Reject the request unless the caller's role grants one of `views`.
fn authorize(
    user: &CurrentUser,
    views: &[View],
    revision_id: i64,
) -> Result<(), AppErrorWithRevision> {
    user.require_any(views).map_err(|error| {
        tracing::warn!("{} ({}) denied: {}", user.email, user.role.as_str(), error);
        AppErrorWithRevision { error, revision_id }
    })
}

/// Required text field check shared by the input validators.
fn require_text(value: &str, label: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", label)));
    }
    Ok(())
}
