//! User and role administration endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{authorize, error, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{CreateUserRequest, SystemUser, UpdateUserRequest};
use crate::roles::View;
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 8;

pub(super) fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::Validation(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}

fn validate_password(password: Option<&str>) -> Result<(), AppError> {
    match password {
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ))),
        _ => Ok(()),
    }
}

/// GET /api/users - List users and their roles.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<SystemUser>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Users], revision_id)?;

    match state.repo.get_settings().await {
        Ok(settings) => success(settings.users, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/users - Add a user, optionally with a login password.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<Vec<SystemUser>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Users], revision_id)?;

    let email = match normalize_email(&request.email)
        .and_then(|email| validate_password(request.password.as_deref()).map(|_| email))
    {
        Ok(email) => email,
        Err(e) => return error(e, revision_id),
    };

    let settings = match state
        .repo
        .add_user(&email, request.role, request.password.as_deref())
        .await
    {
        Ok(settings) => settings,
        Err(e) => return error(e, revision_id),
    };

    tracing::info!("{} added {} as {}", user.email, email, request.role.as_str());
    let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
    success(settings.users, new_revision)
}

/// PUT /api/users/:email - Change role and optionally reset the password.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(email): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Vec<SystemUser>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Users], revision_id)?;

    let email = email.trim().to_lowercase();
    if let Err(e) = validate_password(request.password.as_deref()) {
        return error(e, revision_id);
    }

    let settings = match state
        .repo
        .update_user(&email, request.role, request.password.as_deref())
        .await
    {
        Ok(settings) => settings,
        Err(e) => return error(e, revision_id),
    };

    let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
    success(settings.users, new_revision)
}

/// DELETE /api/users/:email - Remove a user with their login and sessions.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(email): Path<String>,
) -> ApiResult<Vec<SystemUser>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Users], revision_id)?;

    let email = email.trim().to_lowercase();
    match state.repo.remove_user(&email).await {
        Ok(settings) => {
            tracing::info!("{} removed {}", user.email, email);
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(settings.users, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
