//! Report record API endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{authorize, error, require_text, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{ReportInput, ReportRecord};
use crate::query::{group_reports, GroupBy, ReportGroup, ReportQuery};
use crate::roles::View;
use crate::AppState;

/// Grouping parameter for `/api/reports/grouped`.
#[derive(Debug, Deserialize)]
pub struct GroupParam {
    pub by: GroupBy,
}

fn validate_date(value: &str, label: &str) -> Result<(), AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| AppError::Validation(format!("{} must be a YYYY-MM-DD date", label)))
}

fn validate_fields(
    request_date: &str,
    approval_date: Option<&str>,
    required: [(&str, &str); 3],
    total: f64,
) -> Result<(), AppError> {
    validate_date(request_date, "Request date")?;
    if let Some(approval_date) = approval_date {
        if !approval_date.trim().is_empty() {
            validate_date(approval_date, "Approval date")?;
        }
    }
    for (value, label) in required {
        require_text(value, label)?;
    }
    if !total.is_finite() || total < 0.0 {
        return Err(AppError::Validation(
            "Total must be a non-negative amount".to_string(),
        ));
    }
    Ok(())
}

fn validate_report(input: &ReportInput) -> Result<(), AppError> {
    validate_fields(
        &input.request_date,
        input.approval_date.as_deref(),
        [
            (input.prefix.as_str(), "Prefix"),
            (input.department.as_str(), "Department"),
            (input.description.as_str(), "Description"),
        ],
        input.total,
    )
}

/// Same rules as [`validate_report`], for records arriving through an import.
pub(super) fn validate_record(record: &ReportRecord) -> Result<(), AppError> {
    validate_fields(
        &record.request_date,
        record.approval_date.as_deref(),
        [
            (record.prefix.as_str(), "Prefix"),
            (record.department.as_str(), "Department"),
            (record.description.as_str(), "Description"),
        ],
        record.total,
    )
}

/// Keep the search index in step with a written record.
async fn reindex(state: &AppState, report: &ReportRecord) {
    if let Err(e) = state.search.index_report(report).await {
        tracing::warn!("Failed to index report {}: {}", report.id, e);
    }
}

/// GET /api/reports - List report records with filters and sorting.
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<ReportRecord>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Reports], revision_id)?;

    match state.repo.list_reports().await {
        Ok(reports) => success(query.apply(reports), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/reports/grouped - Filtered records bucketed by one field.
pub async fn grouped_reports(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(group): Query<GroupParam>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<ReportGroup>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Reports], revision_id)?;

    match state.repo.list_reports().await {
        Ok(reports) => success(group_reports(query.apply(reports), group.by), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/reports/:id - Get a single report record.
pub async fn get_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<ReportRecord> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Reports, View::Protocol], revision_id)?;

    match state.repo.get_report(&id).await {
        Ok(Some(report)) => success(report, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Report {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/reports - Create a report record.
pub async fn create_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<ReportInput>,
) -> ApiResult<ReportRecord> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Reports], revision_id)?;

    if let Err(e) = validate_report(&input) {
        return error(e, revision_id);
    }

    match state.repo.create_report(&input, &user.email).await {
        Ok(report) => {
            reindex(&state, &report).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(report, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/reports/:id - Overwrite a report record.
pub async fn update_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<ReportInput>,
) -> ApiResult<ReportRecord> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Reports], revision_id)?;

    if let Err(e) = validate_report(&input) {
        return error(e, revision_id);
    }

    match state.repo.update_report(&id, &input, &user.email).await {
        Ok(report) => {
            reindex(&state, &report).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(report, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/reports/:id - Delete a report record.
pub async fn delete_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Reports], revision_id)?;

    match state.repo.delete_report(&id).await {
        Ok(()) => {
            if let Err(e) = state.search.remove_report(&id).await {
                tracing::warn!("Failed to remove report {} from index: {}", id, e);
            }
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
