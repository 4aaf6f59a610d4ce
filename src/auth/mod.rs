//! Session-based authentication.
//!
//! Passwords are stored as salted SHA-256 digests and compared in constant time.
//! Every authenticated request carries a [`CurrentUser`] with the resolved role.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{codes, ErrorDetails, ErrorResponse};
use crate::models::SystemSettings;
use crate::roles::{self, Role, View};
use crate::AppState;

/// Header carrying the session token when no bearer token is sent.
pub const SESSION_HEADER: &str = "x-session-token";

/// Role used for accounts missing from the settings user list.
pub const DEFAULT_ROLE: Role = Role::Buyer;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
    pub role: Role,
    pub token: String,
}

impl CurrentUser {
    /// Ok when the caller's role grants at least one of `views`.
    pub fn require_any(&self, views: &[View]) -> Result<(), crate::errors::AppError> {
        roles::require_any(self.role, views)
    }
}

/// Resolve the role of `email` from the settings user list.
pub fn resolve_role(settings: &SystemSettings, email: &str) -> Role {
    settings.role_of(email).unwrap_or(DEFAULT_ROLE)
}

/// Session authentication layer. Looks up the token, resolves the role and
/// stores a [`CurrentUser`] in the request extensions.
pub async fn session_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(&request) else {
        return unauthorized_response("Missing session token");
    };

    let session = match state.repo.find_session(&token).await {
        Ok(Some(session)) => session,
        Ok(None) => return unauthorized_response("Invalid or expired session"),
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            return unauthorized_response("Session lookup failed");
        }
    };

    let role = match state.repo.get_settings().await {
        Ok(settings) => resolve_role(&settings, &session.email),
        Err(e) => {
            tracing::error!("Settings lookup failed: {}", e);
            return unauthorized_response("Session lookup failed");
        }
    };

    request.extensions_mut().insert(CurrentUser {
        email: session.email,
        role,
        token,
    });

    next.run(request).await
}

fn extract_token(request: &Request) -> Option<String> {
    let headers = request.headers();

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    bearer
        .or_else(|| headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Hex SHA-256 digest of `salt:password`.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Perform constant-time string comparison.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
        },
        revision_id: 0,
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SystemUser;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_hash_password_is_salted() {
        let a = hash_password("salt-a", "hunter2");
        let b = hash_password("salt-b", "hunter2");
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(a, hash_password("salt-a", "hunter2"));
    }

    #[test]
    fn test_resolve_role_defaults_to_buyer() {
        let settings = SystemSettings {
            users: vec![SystemUser {
                email: "clerk@fleet.test".to_string(),
                role: Role::Clerk,
                added_at: String::new(),
            }],
            ..Default::default()
        };
        assert_eq!(resolve_role(&settings, "clerk@fleet.test"), Role::Clerk);
        assert_eq!(resolve_role(&settings, "new@fleet.test"), Role::Buyer);
    }

    #[test]
    fn test_extract_token_prefers_bearer() {
        let request = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc")
            .header(SESSION_HEADER, "def")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request), Some("abc".to_string()));

        let request = axum::http::Request::builder()
            .header(SESSION_HEADER, "  def ")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request), Some("def".to_string()));

        let request = axum::http::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request), None);
    }
}
