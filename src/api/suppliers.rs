//! Supplier API endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{authorize, error, require_text, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Supplier, SupplierInput};
use crate::roles::View;
use crate::AppState;

/// Views that read the supplier directory.
const READ_VIEWS: &[View] = &[View::Suppliers, View::NewQuote, View::Quotes];

/// GET /api/suppliers - List all suppliers.
pub async fn list_suppliers(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Supplier>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, READ_VIEWS, revision_id)?;

    match state.repo.list_suppliers().await {
        Ok(suppliers) => success(suppliers, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/suppliers/:id - Get a single supplier.
pub async fn get_supplier(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Supplier> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, READ_VIEWS, revision_id)?;

    match state.repo.get_supplier(&id).await {
        Ok(Some(supplier)) => success(supplier, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Supplier {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/suppliers - Create a new supplier.
pub async fn create_supplier(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<SupplierInput>,
) -> ApiResult<Supplier> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Suppliers], revision_id)?;

    if let Err(e) = require_text(&input.name, "Supplier name") {
        return error(e, revision_id);
    }

    match state.repo.create_supplier(&input).await {
        Ok(supplier) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(supplier, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/suppliers/:id - Overwrite a supplier.
pub async fn update_supplier(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<SupplierInput>,
) -> ApiResult<Supplier> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Suppliers], revision_id)?;

    if let Err(e) = require_text(&input.name, "Supplier name") {
        return error(e, revision_id);
    }

    match state.repo.update_supplier(&id, &input).await {
        Ok(supplier) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(supplier, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/suppliers/:id - Delete a supplier.
pub async fn delete_supplier(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Suppliers], revision_id)?;

    match state.repo.delete_supplier(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
