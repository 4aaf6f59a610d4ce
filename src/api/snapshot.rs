//! Whole-store export and import.

use axum::{extract::State, Extension, Json};

use super::report_items::validate_item_value;
use super::reports::validate_record;
use super::settings::validate_branding;
use super::users::normalize_email;
use super::{authorize, error, require_text, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{RevisionInfo, Snapshot};
use crate::roles::{Role, View};
use crate::AppState;

fn labelled(label: String, e: AppError) -> AppError {
    AppError::Validation(format!("{}: {}", label, e.message()))
}

/// Rejects a snapshot that the per-record endpoints would not have produced.
/// `importer` must stay an administrator afterwards.
fn validate_snapshot(snapshot: &Snapshot, importer: &str) -> Result<(), AppError> {
    let settings = &snapshot.settings;
    validate_branding(&settings.branding).map_err(|e| labelled("Branding".to_string(), e))?;

    for user in &settings.users {
        let normalized = normalize_email(&user.email)?;
        if normalized != user.email {
            return Err(AppError::Validation(format!(
                "User email '{}' must be trimmed and lower-case",
                user.email
            )));
        }
    }
    if let Some(email) = settings.duplicate_email() {
        return Err(AppError::Validation(format!(
            "User '{}' is listed more than once",
            email
        )));
    }
    if settings.admin_count() == 0 {
        return Err(AppError::Validation(
            "Snapshot must list at least one admin user".to_string(),
        ));
    }
    if settings.role_of(importer) != Some(Role::Admin) {
        return Err(AppError::Validation(format!(
            "Snapshot must keep {} as an admin user",
            importer
        )));
    }

    for quote in &snapshot.quotes {
        let label = || format!("Quote {}", quote.id);
        require_text(&quote.id, "Id").map_err(|e| labelled(label(), e))?;
        require_text(&quote.supplier_name, "Supplier name").map_err(|e| labelled(label(), e))?;
        require_text(&quote.prefix, "Prefix").map_err(|e| labelled(label(), e))?;
    }
    for report in &snapshot.reports {
        let label = || format!("Report {}", report.id);
        require_text(&report.id, "Id").map_err(|e| labelled(label(), e))?;
        validate_record(report).map_err(|e| labelled(label(), e))?;
    }
    for item in &snapshot.report_items {
        validate_item_value(item.category, &item.value)
            .map_err(|e| labelled(format!("Report item {}", item.id), e))?;
    }
    for supplier in &snapshot.suppliers {
        require_text(&supplier.name, "Name")
            .map_err(|e| labelled(format!("Supplier {}", supplier.id), e))?;
    }
    Ok(())
}

/// GET /api/snapshot - Export every table.
pub async fn get_snapshot(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Snapshot> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Settings], revision_id)?;

    match state.repo.get_snapshot().await {
        Ok(snapshot) => success(snapshot, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/snapshot - Replace every table and rebuild the search index.
pub async fn replace_snapshot(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(snapshot): Json<Snapshot>,
) -> ApiResult<RevisionInfo> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Settings], revision_id)?;

    if let Err(e) = validate_snapshot(&snapshot, &user.email) {
        tracing::warn!("Rejected snapshot import from {}: {}", user.email, e.message());
        return error(e, revision_id);
    }

    if let Err(e) = state.repo.replace_snapshot(&snapshot).await {
        return error(e, revision_id);
    }

    if let Err(e) = state.search.rebuild(&snapshot.reports).await {
        tracing::error!("Failed to rebuild search index after import: {}", e);
    }

    tracing::info!(
        "{} imported a snapshot with {} quotes and {} reports",
        user.email,
        snapshot.quotes.len(),
        snapshot.reports.len()
    );

    match state.repo.get_revision_info().await {
        Ok(info) => success(info.clone(), info.revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/snapshot/revision - Current revision for change detection.
pub async fn get_revision(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> ApiResult<RevisionInfo> {
    match state.repo.get_revision_info().await {
        Ok(info) => success(info.clone(), info.revision_id),
        Err(e) => error(e, 0),
    }
}

