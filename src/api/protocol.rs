//! Protocol (delivery confirmation) endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{authorize, error, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{DeliveryStatus, DeliveryUpdateRequest, ProtocolConfirmRequest, ReportRecord};
use crate::query::{sort_reports, SortKey, SortOrder};
use crate::roles::View;
use crate::AppState;

/// PUT /api/reports/:id/delivery - Rewrite the delivery status of a record.
pub async fn set_delivery_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<DeliveryUpdateRequest>,
) -> ApiResult<ReportRecord> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Protocol], revision_id)?;

    match state
        .repo
        .set_delivery_status(&id, request.delivery_status, &user.email)
        .await
    {
        Ok(report) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(report, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/protocol/confirm - Protocol several records in one go.
pub async fn confirm_protocol(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<ProtocolConfirmRequest>,
) -> ApiResult<Vec<ReportRecord>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Protocol], revision_id)?;

    if request.ids.is_empty() {
        return error(
            AppError::Validation("At least one report id is required".to_string()),
            revision_id,
        );
    }

    match state.repo.confirm_protocol(&request.ids, &user.email).await {
        Ok(reports) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(reports, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/protocol/pending - Records still waiting for protocol, oldest first.
pub async fn pending_protocol(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<ReportRecord>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Protocol], revision_id)?;

    match state.repo.list_reports().await {
        Ok(reports) => {
            let mut pending: Vec<ReportRecord> = reports
                .into_iter()
                .filter(|r| r.delivery_status != DeliveryStatus::Protocoled)
                .collect();
            sort_reports(&mut pending, SortKey::RequestDate, SortOrder::Asc);
            success(pending, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}
