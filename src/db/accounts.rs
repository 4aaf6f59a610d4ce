//! System settings, the user/role list, login accounts and sessions.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, Sqlite, SqliteConnection, Transaction};

use super::repository::{bump_revision, now, Repository};
use crate::auth::{constant_time_compare, hash_password};
use crate::errors::AppError;
use crate::models::{Branding, SystemSettings, SystemUser};
use crate::roles::Role;

/// A live login session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub expires_at: String,
}

impl Repository {
    // ==================== SETTINGS OPERATIONS ====================

    /// Read the singleton settings row.
    pub async fn get_settings(&self) -> Result<SystemSettings, AppError> {
        let mut conn = self.pool.acquire().await?;
        read_settings(&mut conn).await
    }

    /// Overwrite the branding fields.
    pub async fn update_branding(&self, branding: &Branding) -> Result<SystemSettings, AppError> {
        let mut tx = self.begin_write().await?;
        let mut settings = read_settings(&mut tx).await?;

        settings.branding = branding.clone();
        settings.updated_at = now();
        write_settings(&mut tx, &settings).await?;
        tx.commit().await?;

        Ok(settings)
    }

    /// Add a user to the role list, with a login when `password` is given.
    pub async fn add_user(
        &self,
        email: &str,
        role: Role,
        password: Option<&str>,
    ) -> Result<SystemSettings, AppError> {
        let mut tx = self.begin_write().await?;
        let mut settings = read_settings(&mut tx).await?;

        if settings.role_of(email).is_some() {
            return Err(AppError::Validation(format!("User {} already exists", email)));
        }

        settings.users.push(SystemUser {
            email: email.to_string(),
            role,
            added_at: now(),
        });
        settings.updated_at = now();
        write_settings(&mut tx, &settings).await?;
        if let Some(password) = password {
            write_password(&mut tx, email, password).await?;
        }
        tx.commit().await?;

        Ok(settings)
    }

    /// Change the role of a listed user and optionally reset their password.
    pub async fn update_user(
        &self,
        email: &str,
        role: Role,
        password: Option<&str>,
    ) -> Result<SystemSettings, AppError> {
        let mut tx = self.begin_write().await?;
        let mut settings = read_settings(&mut tx).await?;

        let current = settings
            .role_of(email)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", email)))?;

        if current == Role::Admin && role != Role::Admin && settings.admin_count() <= 1 {
            return Err(AppError::Validation(
                "The last administrator cannot be demoted".to_string(),
            ));
        }

        for user in settings.users.iter_mut() {
            if user.email.eq_ignore_ascii_case(email) {
                user.role = role;
            }
        }
        settings.updated_at = now();
        write_settings(&mut tx, &settings).await?;
        if let Some(password) = password {
            write_password(&mut tx, email, password).await?;
        }
        tx.commit().await?;

        Ok(settings)
    }

    /// Remove a user together with their login and sessions.
    pub async fn remove_user(&self, email: &str) -> Result<SystemSettings, AppError> {
        let mut tx = self.begin_write().await?;
        let mut settings = read_settings(&mut tx).await?;

        let current = settings
            .role_of(email)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", email)))?;

        if current == Role::Admin && settings.admin_count() <= 1 {
            return Err(AppError::Validation(
                "The last administrator cannot be removed".to_string(),
            ));
        }

        settings
            .users
            .retain(|u| !u.email.eq_ignore_ascii_case(email));
        settings.updated_at = now();

        write_settings(&mut tx, &settings).await?;
        sqlx::query("DELETE FROM accounts WHERE email = ?")
            .bind(email)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE email = ?")
            .bind(email)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(settings)
    }

    /// Open a write transaction on the settings row.
    ///
    /// The revision bump runs first so the write lock is held before the
    /// user list is read; concurrent edits queue instead of overwriting.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        let mut tx = self.pool.begin().await?;
        bump_revision(&mut tx).await?;
        Ok(tx)
    }

    // ==================== ACCOUNT OPERATIONS ====================

    /// Create or reset the login for `email`.
    pub async fn set_password(&self, email: &str, password: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        write_password(&mut tx, email, password).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn has_account(&self, email: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Check a password against the stored digest.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT password_salt, password_hash FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(false);
        };

        let salt: String = row.get("password_salt");
        let expected: String = row.get("password_hash");
        Ok(constant_time_compare(&hash_password(&salt, password), &expected))
    }

    /// Make sure the bootstrap administrator can log in and is listed as admin.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        if !self.has_account(email).await? {
            self.set_password(email, password).await?;
            tracing::info!("Created bootstrap account {}", email);
        }

        let settings = self.get_settings().await?;
        match settings.role_of(email) {
            Some(Role::Admin) => {}
            Some(_) => {
                self.update_user(email, Role::Admin, None).await?;
            }
            None => {
                self.add_user(email, Role::Admin, None).await?;
                tracing::info!("Listed {} as administrator", email);
            }
        }
        Ok(())
    }

    // ==================== SESSION OPERATIONS ====================

    /// Open a session for `email` lasting `ttl_hours`.
    pub async fn create_session(&self, email: &str, ttl_hours: i64) -> Result<Session, AppError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let created = Utc::now();
        let expires_at = (created + Duration::hours(ttl_hours)).to_rfc3339();

        sqlx::query(
            "INSERT INTO sessions (token, email, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(email)
        .bind(created.to_rfc3339())
        .bind(&expires_at)
        .execute(&self.pool)
        .await?;

        Ok(Session {
            token,
            email: email.to_string(),
            expires_at,
        })
    }

    /// Resolve a token to its session, dropping it if expired.
    pub async fn find_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query("SELECT token, email, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let session = Session {
            token: row.get("token"),
            email: row.get("email"),
            expires_at: row.get("expires_at"),
        };

        let expired = DateTime::parse_from_rfc3339(&session.expires_at)
            .map(|t| t.with_timezone(&Utc) <= Utc::now())
            .unwrap_or(true);

        if expired {
            self.delete_session(token).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

async fn read_settings(conn: &mut SqliteConnection) -> Result<SystemSettings, AppError> {
    let row = sqlx::query(
        "SELECT name, subtitle, logo_url, accent_color, users, updated_at \
         FROM settings WHERE id = 1",
    )
    .fetch_one(conn)
    .await?;

    let users: String = row.get("users");
    Ok(SystemSettings {
        branding: Branding {
            name: row.get("name"),
            subtitle: row.get("subtitle"),
            logo_url: row.get("logo_url"),
            accent_color: row.get("accent_color"),
        },
        users: serde_json::from_str(&users).unwrap_or_default(),
        updated_at: row.get("updated_at"),
    })
}

/// Upsert the login for `email` and end sessions issued under the old password.
async fn write_password(
    conn: &mut SqliteConnection,
    email: &str,
    password: &str,
) -> Result<(), AppError> {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    let hash = hash_password(&salt, password);

    sqlx::query(
        r#"INSERT INTO accounts (email, password_salt, password_hash, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(email) DO UPDATE SET
            password_salt = excluded.password_salt,
            password_hash = excluded.password_hash"#,
    )
    .bind(email)
    .bind(&salt)
    .bind(&hash)
    .bind(now())
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM sessions WHERE email = ?")
        .bind(email)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(super) async fn write_settings(
    conn: &mut SqliteConnection,
    settings: &SystemSettings,
) -> Result<(), AppError> {
    let users_json = serde_json::to_string(&settings.users)?;
    let updated_at = if settings.updated_at.is_empty() {
        now()
    } else {
        settings.updated_at.clone()
    };

    sqlx::query(
        r#"INSERT INTO settings (id, name, subtitle, logo_url, accent_color, users, updated_at)
        VALUES (1, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            subtitle = excluded.subtitle,
            logo_url = excluded.logo_url,
            accent_color = excluded.accent_color,
            users = excluded.users,
            updated_at = excluded.updated_at"#,
    )
    .bind(&settings.branding.name)
    .bind(&settings.branding.subtitle)
    .bind(&settings.branding.logo_url)
    .bind(&settings.branding.accent_color)
    .bind(&users_json)
    .bind(&updated_at)
    .execute(conn)
    .await?;

    Ok(())
}
