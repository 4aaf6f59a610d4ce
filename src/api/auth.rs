//! Login, logout and session introspection.

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::auth::{resolve_role, CurrentUser};
use crate::errors::AppError;
use crate::roles::{allowed_views, default_view, Role, View};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub email: String,
    pub role: Role,
}

/// Who the caller is and where the client may take them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user: UserInfo,
    pub views: Vec<View>,
    pub default_view: View,
}

impl SessionInfo {
    fn new(email: String, role: Role) -> Self {
        Self {
            user: UserInfo { email, role },
            views: allowed_views(role).to_vec(),
            default_view: default_view(role),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    #[serde(flatten)]
    pub session: SessionInfo,
}

/// POST /api/auth/login - Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let email = request.email.trim().to_lowercase();

    match state.repo.verify_credentials(&email, &request.password).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Failed login for {}", email);
            return error(
                AppError::Unauthorized("Invalid email or password".to_string()),
                revision_id,
            );
        }
        Err(e) => return error(e, revision_id),
    }

    let role = match state.repo.get_settings().await {
        Ok(settings) => resolve_role(&settings, &email),
        Err(e) => return error(e, revision_id),
    };

    match state
        .repo
        .create_session(&email, state.config.session_ttl_hours)
        .await
    {
        Ok(session) => {
            tracing::info!("{} logged in as {}", email, role.as_str());
            success(
                LoginResponse {
                    token: session.token,
                    expires_at: session.expires_at,
                    session: SessionInfo::new(session.email, role),
                },
                revision_id,
            )
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/auth/logout - End the current session.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_session(&user.token).await {
        Ok(()) => success((), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/auth/me - The caller's identity, role and views.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<SessionInfo> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    success(SessionInfo::new(user.email, user.role), revision_id)
}
