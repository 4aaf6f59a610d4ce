//! Database repository for CRUD operations.
//!
//! Writes are full-field overwrites; every write bumps the store revision.

use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::message::normalize_phone;
use crate::models::{
    Quote, QuoteInput, QuoteType, RevisionInfo, Snapshot, Supplier, SupplierInput,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

pub(super) fn now() -> String {
    Utc::now().to_rfc3339()
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    // ==================== SNAPSHOT ====================

    /// Export every table.
    pub async fn get_snapshot(&self) -> Result<Snapshot, AppError> {
        let meta =
            sqlx::query("SELECT schema_version, revision_id, generated_at FROM meta WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(Snapshot {
            schema_version: meta.get("schema_version"),
            revision_id: meta.get("revision_id"),
            generated_at: meta.get("generated_at"),
            quotes: self.list_quotes().await?,
            reports: self.list_reports().await?,
            report_items: self.list_report_items(None).await?,
            suppliers: self.list_suppliers().await?,
            settings: self.get_settings().await?,
        })
    }

    /// Replace every table with the snapshot contents in one transaction.
    ///
    /// Accounts and sessions are left alone so the caller stays logged in.
    pub async fn replace_snapshot(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for table in ["quotes", "reports", "report_items", "suppliers"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        for quote in &snapshot.quotes {
            insert_quote(&mut tx, quote).await?;
        }
        for report in &snapshot.reports {
            super::reports::insert_report(&mut tx, report).await?;
        }
        for item in &snapshot.report_items {
            super::reports::insert_report_item(&mut tx, item).await?;
        }
        for supplier in &snapshot.suppliers {
            insert_supplier(&mut tx, supplier).await?;
        }
        super::accounts::write_settings(&mut tx, &snapshot.settings).await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== QUOTE OPERATIONS ====================

    /// List all quotes, newest first.
    pub async fn list_quotes(&self) -> Result<Vec<Quote>, AppError> {
        let rows = sqlx::query("SELECT * FROM quotes ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(quote_from_row).collect())
    }

    /// Get a quote by ID.
    pub async fn get_quote(&self, id: &str) -> Result<Option<Quote>, AppError> {
        let row = sqlx::query("SELECT * FROM quotes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(quote_from_row))
    }

    /// Create a new quote with an already composed observation.
    pub async fn create_quote(
        &self,
        input: &QuoteInput,
        observation: String,
    ) -> Result<Quote, AppError> {
        let quote = quote_from_input(uuid::Uuid::new_v4().to_string(), input, observation, now());

        let mut tx = self.pool.begin().await?;
        insert_quote(&mut tx, &quote).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(quote)
    }

    /// Overwrite every field of a quote except its id and creation time.
    pub async fn update_quote(
        &self,
        id: &str,
        input: &QuoteInput,
        observation: String,
    ) -> Result<Quote, AppError> {
        let existing = self
            .get_quote(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quote {} not found", id)))?;

        let quote = quote_from_input(existing.id, input, observation, existing.created_at);
        let attachments_json = serde_json::to_string(&quote.attachments)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"UPDATE quotes SET
                quote_type = ?, supplier_name = ?, supplier_phone = ?, prefix = ?,
                first_quote_number = ?, second_quote_number = ?, description = ?,
                observation = ?, photo_url = ?, attachments = ?
            WHERE id = ?"#,
        )
        .bind(quote.quote_type.as_str())
        .bind(&quote.supplier_name)
        .bind(&quote.supplier_phone)
        .bind(&quote.prefix)
        .bind(&quote.first_quote_number)
        .bind(&quote.second_quote_number)
        .bind(&quote.description)
        .bind(&quote.observation)
        .bind(&quote.photo_url)
        .bind(&attachments_json)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(quote)
    }

    /// Delete a quote.
    pub async fn delete_quote(&self, id: &str) -> Result<(), AppError> {
        self.delete_by_id("quotes", "Quote", id).await
    }

    // ==================== SUPPLIER OPERATIONS ====================

    /// List all suppliers by name.
    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, phone, created_at FROM suppliers ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(supplier_from_row).collect())
    }

    /// Get a supplier by ID.
    pub async fn get_supplier(&self, id: &str) -> Result<Option<Supplier>, AppError> {
        let row = sqlx::query("SELECT id, name, phone, created_at FROM suppliers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(supplier_from_row))
    }

    /// Create a new supplier.
    pub async fn create_supplier(&self, input: &SupplierInput) -> Result<Supplier, AppError> {
        let supplier = Supplier {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            phone: normalize_phone(&input.phone),
            created_at: now(),
        };

        let mut tx = self.pool.begin().await?;
        insert_supplier(&mut tx, &supplier).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(supplier)
    }

    /// Overwrite a supplier.
    pub async fn update_supplier(
        &self,
        id: &str,
        input: &SupplierInput,
    ) -> Result<Supplier, AppError> {
        let existing = self
            .get_supplier(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Supplier {} not found", id)))?;

        let supplier = Supplier {
            id: existing.id,
            name: input.name.trim().to_string(),
            phone: normalize_phone(&input.phone),
            created_at: existing.created_at,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE suppliers SET name = ?, phone = ? WHERE id = ?")
            .bind(&supplier.name)
            .bind(&supplier.phone)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(supplier)
    }

    /// Delete a supplier.
    pub async fn delete_supplier(&self, id: &str) -> Result<(), AppError> {
        self.delete_by_id("suppliers", "Supplier", id).await
    }

    /// Remove a row by id from one of the id-keyed tables.
    pub(super) async fn delete_by_id(
        &self,
        table: &'static str,
        label: &str,
        id: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {} not found", label, id)));
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

pub(super) async fn bump_revision(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(now())
        .execute(conn)
        .await?;
    Ok(())
}

fn quote_from_input(
    id: String,
    input: &QuoteInput,
    observation: String,
    created_at: String,
) -> Quote {
    Quote {
        id,
        quote_type: input.quote_type,
        supplier_name: input.supplier_name.trim().to_string(),
        supplier_phone: normalize_phone(&input.supplier_phone),
        prefix: input.prefix.trim().to_string(),
        first_quote_number: input.first_quote_number.trim().to_string(),
        second_quote_number: input.second_quote_number.trim().to_string(),
        description: input.description.clone(),
        observation,
        photo_url: input.photo_url.clone().filter(|u| !u.trim().is_empty()),
        attachments: input.attachments.clone(),
        created_at,
    }
}

async fn insert_quote(conn: &mut SqliteConnection, quote: &Quote) -> Result<(), AppError> {
    let attachments_json = serde_json::to_string(&quote.attachments)?;

    sqlx::query(
        r#"INSERT INTO quotes (
            id, quote_type, supplier_name, supplier_phone, prefix, first_quote_number,
            second_quote_number, description, observation, photo_url, attachments, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&quote.id)
    .bind(quote.quote_type.as_str())
    .bind(&quote.supplier_name)
    .bind(&quote.supplier_phone)
    .bind(&quote.prefix)
    .bind(&quote.first_quote_number)
    .bind(&quote.second_quote_number)
    .bind(&quote.description)
    .bind(&quote.observation)
    .bind(&quote.photo_url)
    .bind(&attachments_json)
    .bind(&quote.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

async fn insert_supplier(conn: &mut SqliteConnection, supplier: &Supplier) -> Result<(), AppError> {
    sqlx::query("INSERT INTO suppliers (id, name, phone, created_at) VALUES (?, ?, ?, ?)")
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.phone)
        .bind(&supplier.created_at)
        .execute(conn)
        .await?;
    Ok(())
}

// Helper functions for row conversion

fn quote_from_row(row: &sqlx::sqlite::SqliteRow) -> Quote {
    let quote_type: String = row.get("quote_type");
    let attachments: Option<String> = row.get("attachments");
    Quote {
        id: row.get("id"),
        quote_type: QuoteType::parse(&quote_type).unwrap_or(QuoteType::Request),
        supplier_name: row.get("supplier_name"),
        supplier_phone: row.get("supplier_phone"),
        prefix: row.get("prefix"),
        first_quote_number: row.get("first_quote_number"),
        second_quote_number: row.get("second_quote_number"),
        description: row.get("description"),
        observation: row.get("observation"),
        photo_url: row.get("photo_url"),
        attachments: attachments
            .map(|s| parse_json_array(&s))
            .unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}

fn supplier_from_row(row: &sqlx::sqlite::SqliteRow) -> Supplier {
    Supplier {
        id: row.get("id"),
        name: row.get("name"),
        phone: row.get("phone"),
        created_at: row.get("created_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
