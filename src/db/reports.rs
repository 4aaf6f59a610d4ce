//! Report records, protocol transitions and dropdown list items.

use std::collections::BTreeSet;

use sqlx::{Row, SqliteConnection};

use super::repository::{bump_revision, now, Repository};
use crate::errors::AppError;
use crate::models::{
    DeliveryStatus, ListCategory, ListOptions, ReportInput, ReportListItem, ReportListItemInput,
    ReportRecord,
};

impl Repository {
    // ==================== REPORT OPERATIONS ====================

    /// List all report records, newest request first.
    pub async fn list_reports(&self) -> Result<Vec<ReportRecord>, AppError> {
        let rows = sqlx::query("SELECT * FROM reports ORDER BY request_date DESC, created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(report_from_row).collect())
    }

    /// Get a report record by ID.
    pub async fn get_report(&self, id: &str) -> Result<Option<ReportRecord>, AppError> {
        let row = sqlx::query("SELECT * FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(report_from_row))
    }

    /// Create a new report record.
    pub async fn create_report(
        &self,
        input: &ReportInput,
        actor: &str,
    ) -> Result<ReportRecord, AppError> {
        let mut report = report_from_input(uuid::Uuid::new_v4().to_string(), input, now());
        stamp_protocol(&mut report, None, input.delivery_status, actor);

        let mut tx = self.pool.begin().await?;
        insert_report(&mut tx, &report).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(report)
    }

    /// Overwrite a report record. Protocol stamps survive while the record stays `Protocoled`.
    pub async fn update_report(
        &self,
        id: &str,
        input: &ReportInput,
        actor: &str,
    ) -> Result<ReportRecord, AppError> {
        let existing = self
            .get_report(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

        let mut report = report_from_input(existing.id.clone(), input, existing.created_at.clone());
        stamp_protocol(&mut report, Some(&existing), input.delivery_status, actor);

        let mut tx = self.pool.begin().await?;
        write_report(&mut tx, &report).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(report)
    }

    /// Delete a report record.
    pub async fn delete_report(&self, id: &str) -> Result<(), AppError> {
        self.delete_by_id("reports", "Report", id).await
    }

    // ==================== PROTOCOL OPERATIONS ====================

    /// Rewrite the delivery status of one record on behalf of `actor`.
    pub async fn set_delivery_status(
        &self,
        id: &str,
        status: DeliveryStatus,
        actor: &str,
    ) -> Result<ReportRecord, AppError> {
        let mut report = self
            .get_report(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

        let previous = report.clone();
        stamp_protocol(&mut report, Some(&previous), status, actor);

        let mut tx = self.pool.begin().await?;
        write_report(&mut tx, &report).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!(
            "Report {} delivery status {} -> {} by {}",
            id,
            previous.delivery_status.as_str(),
            status.as_str(),
            actor
        );
        Ok(report)
    }

    /// Mark several records `Protocoled` atomically. Any unknown id aborts the batch.
    pub async fn confirm_protocol(
        &self,
        ids: &[String],
        actor: &str,
    ) -> Result<Vec<ReportRecord>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let row = sqlx::query("SELECT * FROM reports WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

            let previous = row
                .as_ref()
                .map(report_from_row)
                .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

            let mut report = previous.clone();
            stamp_protocol(
                &mut report,
                Some(&previous),
                DeliveryStatus::Protocoled,
                actor,
            );
            write_report(&mut tx, &report).await?;
            results.push(report);
        }

        // Increment revision once for the entire batch
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("{} report(s) protocoled by {}", results.len(), actor);
        Ok(results)
    }

    // ==================== LIST ITEM OPERATIONS ====================

    /// List dropdown items, optionally for one category.
    pub async fn list_report_items(
        &self,
        category: Option<ListCategory>,
    ) -> Result<Vec<ReportListItem>, AppError> {
        let rows = match category {
            Some(category) => {
                sqlx::query(
                    "SELECT * FROM report_items WHERE category = ? ORDER BY value COLLATE NOCASE",
                )
                .bind(category.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM report_items ORDER BY category, value COLLATE NOCASE")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.iter().filter_map(report_item_from_row).collect())
    }

    /// Get a dropdown item by ID.
    pub async fn get_report_item(&self, id: &str) -> Result<Option<ReportListItem>, AppError> {
        let row = sqlx::query("SELECT * FROM report_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(report_item_from_row))
    }

    /// Create a dropdown item.
    pub async fn create_report_item(
        &self,
        input: &ReportListItemInput,
    ) -> Result<ReportListItem, AppError> {
        let item = ReportListItem {
            id: uuid::Uuid::new_v4().to_string(),
            category: input.category,
            value: input.value.trim().to_string(),
            created_at: now(),
        };

        let mut tx = self.pool.begin().await?;
        insert_report_item(&mut tx, &item).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Overwrite a dropdown item.
    pub async fn update_report_item(
        &self,
        id: &str,
        input: &ReportListItemInput,
    ) -> Result<ReportListItem, AppError> {
        let existing = self
            .get_report_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("List item {} not found", id)))?;

        let item = ReportListItem {
            id: existing.id,
            category: input.category,
            value: input.value.trim().to_string(),
            created_at: existing.created_at,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE report_items SET category = ?, value = ? WHERE id = ?")
            .bind(item.category.as_str())
            .bind(&item.value)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Delete a dropdown item.
    pub async fn delete_report_item(&self, id: &str) -> Result<(), AppError> {
        self.delete_by_id("report_items", "List item", id).await
    }

    /// Sorted, de-duplicated dropdown values per category.
    pub async fn list_options(&self) -> Result<ListOptions, AppError> {
        let items = self.list_report_items(None).await?;

        let mut sets: [BTreeSet<String>; 4] = Default::default();
        for item in items {
            let slot = match item.category {
                ListCategory::Department => 0,
                ListCategory::Supplier => 1,
                ListCategory::Status => 2,
                ListCategory::Delivery => 3,
            };
            sets[slot].insert(item.value);
        }

        let [department, supplier, status, delivery] =
            sets.map(|s| s.into_iter().collect::<Vec<String>>());
        Ok(ListOptions {
            department,
            supplier,
            status,
            delivery,
        })
    }
}

/// Keep `protocoledAt`/`protocoledBy` consistent with the delivery status.
fn stamp_protocol(
    report: &mut ReportRecord,
    previous: Option<&ReportRecord>,
    status: DeliveryStatus,
    actor: &str,
) {
    report.delivery_status = status;

    if status != DeliveryStatus::Protocoled {
        report.protocoled_at = None;
        report.protocoled_by = None;
        return;
    }

    match previous {
        Some(prev) if prev.delivery_status == DeliveryStatus::Protocoled => {
            report.protocoled_at = prev.protocoled_at.clone();
            report.protocoled_by = prev.protocoled_by.clone();
        }
        _ => {
            report.protocoled_at = Some(now());
            report.protocoled_by = Some(actor.to_string());
        }
    }
}

fn report_from_input(id: String, input: &ReportInput, created_at: String) -> ReportRecord {
    ReportRecord {
        id,
        request_date: input.request_date.trim().to_string(),
        approval_date: input
            .approval_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        prefix: input.prefix.trim().to_string(),
        department: input.department.trim().to_string(),
        description: input.description.trim().to_string(),
        supplier: input.supplier.trim().to_string(),
        approval_numbers: input.approval_numbers.trim().to_string(),
        total: input.total,
        invoice: input.invoice.clone().filter(|v| !v.trim().is_empty()),
        status: input.status.trim().to_string(),
        delivery_status: input.delivery_status,
        notes: input.notes.clone().filter(|v| !v.trim().is_empty()),
        protocoled_at: None,
        protocoled_by: None,
        created_at,
    }
}

pub(super) async fn insert_report(
    conn: &mut SqliteConnection,
    report: &ReportRecord,
) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO reports (
            id, request_date, approval_date, prefix, department, description, supplier,
            approval_numbers, total, invoice, status, delivery_status, notes,
            protocoled_at, protocoled_by, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&report.id)
    .bind(&report.request_date)
    .bind(&report.approval_date)
    .bind(&report.prefix)
    .bind(&report.department)
    .bind(&report.description)
    .bind(&report.supplier)
    .bind(&report.approval_numbers)
    .bind(report.total)
    .bind(&report.invoice)
    .bind(&report.status)
    .bind(report.delivery_status.as_str())
    .bind(&report.notes)
    .bind(&report.protocoled_at)
    .bind(&report.protocoled_by)
    .bind(&report.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

async fn write_report(conn: &mut SqliteConnection, report: &ReportRecord) -> Result<(), AppError> {
    sqlx::query(
        r#"UPDATE reports SET
            request_date = ?, approval_date = ?, prefix = ?, department = ?, description = ?,
            supplier = ?, approval_numbers = ?, total = ?, invoice = ?, status = ?,
            delivery_status = ?, notes = ?, protocoled_at = ?, protocoled_by = ?
        WHERE id = ?"#,
    )
    .bind(&report.request_date)
    .bind(&report.approval_date)
    .bind(&report.prefix)
    .bind(&report.department)
    .bind(&report.description)
    .bind(&report.supplier)
    .bind(&report.approval_numbers)
    .bind(report.total)
    .bind(&report.invoice)
    .bind(&report.status)
    .bind(report.delivery_status.as_str())
    .bind(&report.notes)
    .bind(&report.protocoled_at)
    .bind(&report.protocoled_by)
    .bind(&report.id)
    .execute(conn)
    .await?;

    Ok(())
}

pub(super) async fn insert_report_item(
    conn: &mut SqliteConnection,
    item: &ReportListItem,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO report_items (id, category, value, created_at) VALUES (?, ?, ?, ?)")
        .bind(&item.id)
        .bind(item.category.as_str())
        .bind(&item.value)
        .bind(&item.created_at)
        .execute(conn)
        .await?;
    Ok(())
}

fn report_from_row(row: &sqlx::sqlite::SqliteRow) -> ReportRecord {
    let delivery: String = row.get("delivery_status");
    ReportRecord {
        id: row.get("id"),
        request_date: row.get("request_date"),
        approval_date: row.get("approval_date"),
        prefix: row.get("prefix"),
        department: row.get("department"),
        description: row.get("description"),
        supplier: row.get("supplier"),
        approval_numbers: row.get("approval_numbers"),
        total: row.get("total"),
        invoice: row.get("invoice"),
        status: row.get("status"),
        delivery_status: DeliveryStatus::parse(&delivery).unwrap_or_default(),
        notes: row.get("notes"),
        protocoled_at: row.get("protocoled_at"),
        protocoled_by: row.get("protocoled_by"),
        created_at: row.get("created_at"),
    }
}

/// Rows with an unknown category are skipped.
fn report_item_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<ReportListItem> {
    let category: String = row.get("category");
    Some(ReportListItem {
        id: row.get("id"),
        category: ListCategory::parse(&category)?,
        value: row.get("value"),
        created_at: row.get("created_at"),
    })
}
