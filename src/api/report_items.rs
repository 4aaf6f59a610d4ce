//! Dropdown list item endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{authorize, error, require_text, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    DeliveryStatus, ListCategory, ListItemQuery, ListOptions, ReportListItem, ReportListItemInput,
};
use crate::roles::View;
use crate::AppState;

/// Views that show report dropdowns.
const DROPDOWN_VIEWS: &[View] = &[View::Reports, View::Protocol, View::Settings];

/// Values must be non-empty; delivery values must name a delivery status.
pub(super) fn validate_item_value(category: ListCategory, value: &str) -> Result<(), AppError> {
    require_text(value, "Value")?;
    if category == ListCategory::Delivery && DeliveryStatus::parse(value.trim()).is_none() {
        let allowed: Vec<&str> = DeliveryStatus::ALL.iter().map(|d| d.as_str()).collect();
        return Err(AppError::Validation(format!(
            "Delivery values must be one of: {}",
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_item(input: &ReportListItemInput) -> Result<(), AppError> {
    validate_item_value(input.category, &input.value)
}

/// GET /api/report-items - List dropdown items.
pub async fn list_report_items(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListItemQuery>,
) -> ApiResult<Vec<ReportListItem>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, DROPDOWN_VIEWS, revision_id)?;

    match state.repo.list_report_items(query.category).await {
        Ok(items) => success(items, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/report-items/options - Dropdown values grouped by category.
pub async fn list_options(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<ListOptions> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, DROPDOWN_VIEWS, revision_id)?;

    match state.repo.list_options().await {
        Ok(options) => success(options, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/report-items - Create a dropdown item.
pub async fn create_report_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<ReportListItemInput>,
) -> ApiResult<ReportListItem> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Settings], revision_id)?;

    if let Err(e) = validate_item(&input) {
        return error(e, revision_id);
    }

    match state.repo.create_report_item(&input).await {
        Ok(item) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(item, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/report-items/:id - Overwrite a dropdown item.
pub async fn update_report_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<ReportListItemInput>,
) -> ApiResult<ReportListItem> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Settings], revision_id)?;

    if let Err(e) = validate_item(&input) {
        return error(e, revision_id);
    }

    match state.repo.update_report_item(&id, &input).await {
        Ok(item) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(item, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/report-items/:id - Delete a dropdown item.
pub async fn delete_report_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Settings], revision_id)?;

    match state.repo.delete_report_item(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
