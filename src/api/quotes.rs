//! Quote API endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{authorize, error, require_text, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::message::{ComposedMessage, MessageFields, MessageSource};
use crate::models::{Quote, QuoteFilter, QuoteInput};
use crate::query::filter_quotes;
use crate::roles::View;
use crate::AppState;

fn validate_quote(input: &QuoteInput) -> Result<(), AppError> {
    require_text(&input.supplier_name, "Supplier name")?;
    require_text(&input.prefix, "Prefix")?;
    Ok(())
}

/// Use the caller's observation when given, otherwise compose one.
async fn observation_for(state: &AppState, input: &QuoteInput) -> ComposedMessage {
    let fields = MessageFields::from_input(input);
    match input.observation.as_deref().map(str::trim) {
        Some(observation) if !observation.is_empty() => {
            ComposedMessage::new(&fields, observation.to_string(), MessageSource::Stored)
        }
        _ => state.textgen.compose(&fields, &input.description).await,
    }
}

/// GET /api/quotes - List quotes, newest first.
pub async fn list_quotes(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(filter): Query<QuoteFilter>,
) -> ApiResult<Vec<Quote>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Quotes], revision_id)?;

    match state.repo.list_quotes().await {
        Ok(quotes) => success(filter_quotes(quotes, &filter), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/quotes/:id - Get a single quote.
pub async fn get_quote(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Quote> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Quotes], revision_id)?;

    match state.repo.get_quote(&id).await {
        Ok(Some(quote)) => success(quote, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Quote {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/quotes/compose - Preview the message without saving.
pub async fn compose_quote(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<QuoteInput>,
) -> ApiResult<ComposedMessage> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::NewQuote], revision_id)?;

    if let Err(e) = validate_quote(&input) {
        return error(e, revision_id);
    }

    success(observation_for(&state, &input).await, revision_id)
}

/// GET /api/quotes/:id/message - Render the stored quote.
pub async fn quote_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<ComposedMessage> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Quotes], revision_id)?;

    match state.repo.get_quote(&id).await {
        Ok(Some(quote)) => {
            let fields = MessageFields::from_quote(&quote);
            success(
                ComposedMessage::new(&fields, quote.observation, MessageSource::Stored),
                revision_id,
            )
        }
        Ok(None) => error(
            AppError::NotFound(format!("Quote {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/quotes - Create a new quote.
pub async fn create_quote(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<QuoteInput>,
) -> ApiResult<Quote> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::NewQuote], revision_id)?;

    if let Err(e) = validate_quote(&input) {
        return error(e, revision_id);
    }

    let composed = observation_for(&state, &input).await;
    match state.repo.create_quote(&input, composed.observation).await {
        Ok(quote) => {
            tracing::info!("Quote {} created by {}", quote.id, user.email);
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(quote, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/quotes/:id - Overwrite a quote.
pub async fn update_quote(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<QuoteInput>,
) -> ApiResult<Quote> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Quotes], revision_id)?;

    if let Err(e) = validate_quote(&input) {
        return error(e, revision_id);
    }

    let composed = observation_for(&state, &input).await;
    match state.repo.update_quote(&id, &input, composed.observation).await {
        Ok(quote) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(quote, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/quotes/:id - Delete a quote.
pub async fn delete_quote(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Quotes], revision_id)?;

    match state.repo.delete_quote(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
