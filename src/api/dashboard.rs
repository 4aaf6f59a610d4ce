//! Dashboard summary endpoint.

use axum::{extract::State, Extension};
use serde::Serialize;

use super::{authorize, error, success, ApiResult};
use crate::auth::CurrentUser;
use crate::models::{DeliveryStatus, QuoteType};
use crate::query::{group_reports, GroupBy};
use crate::roles::View;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub delivery_status: DeliveryStatus,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentTotal {
    pub department: String,
    pub count: usize,
    pub total: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteCounts {
    pub request: usize,
    pub approval: usize,
}

/// Headline numbers for the dashboard view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub report_count: usize,
    pub report_total: f64,
    pub by_delivery_status: Vec<StatusCount>,
    pub by_department: Vec<DepartmentTotal>,
    pub quotes: QuoteCounts,
}

/// GET /api/dashboard - Counts and totals across reports and quotes.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<DashboardSummary> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    authorize(&user, &[View::Dashboard], revision_id)?;

    let reports = match state.repo.list_reports().await {
        Ok(reports) => reports,
        Err(e) => return error(e, revision_id),
    };
    let quotes = match state.repo.list_quotes().await {
        Ok(quotes) => quotes,
        Err(e) => return error(e, revision_id),
    };

    let by_delivery_status = DeliveryStatus::ALL
        .iter()
        .map(|status| StatusCount {
            delivery_status: *status,
            count: reports
                .iter()
                .filter(|r| r.delivery_status == *status)
                .count(),
        })
        .collect();

    let report_count = reports.len();
    let report_total: f64 = reports.iter().map(|r| r.total).sum();

    let by_department = group_reports(reports, GroupBy::Department)
        .into_iter()
        .map(|group| DepartmentTotal {
            department: group.key,
            count: group.count,
            total: group.total,
        })
        .collect();

    let approval = quotes
        .iter()
        .filter(|q| q.quote_type == QuoteType::Approval)
        .count();

    success(
        DashboardSummary {
            report_count,
            report_total,
            by_delivery_status,
            by_department,
            quotes: QuoteCounts {
                request: quotes.len() - approval,
                approval,
            },
        },
        revision_id,
    )
}
