//! Branding and settings endpoints.

use axum::{extract::State, Extension, Json};

use super::{authorize, error, require_text, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Branding, SystemSettings};
use crate::roles::View;
use crate::AppState;

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub(super) fn validate_branding(branding: &Branding) -> Result<(), AppError> {
    require_text(&branding.name, "Name")?;
    if !is_hex_color(&branding.accent_color) {
        return Err(AppError::Validation(
            "Accent color must look like #RRGGBB".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/branding - Public branding for the login screen.
pub async fn get_branding(State(state): State<AppState>) -> ApiResult<Branding> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_settings().await {
        Ok(settings) => success(settings.branding, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/settings - Branding plus the user list.
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<SystemSettings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Settings], revision_id)?;

    match state.repo.get_settings().await {
        Ok(settings) => success(settings, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/settings/branding - Replace the branding block.
pub async fn update_branding(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(mut branding): Json<Branding>,
) -> ApiResult<SystemSettings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Settings], revision_id)?;

    branding.accent_color = branding.accent_color.trim().to_uppercase();
    if let Err(e) = validate_branding(&branding) {
        return error(e, revision_id);
    }

    match state.repo.update_branding(&branding).await {
        Ok(settings) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(settings, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
