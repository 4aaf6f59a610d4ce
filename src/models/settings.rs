//! System settings: branding plus the user/role list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// A user entry used for role assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemUser {
    pub email: String,
    pub role: Role,
    pub added_at: String,
}

/// Branding shown by the client, also before login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    pub name: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub accent_color: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            name: "Fleet Desk".to_string(),
            subtitle: "Maintenance quotes and reports".to_string(),
            logo_url: None,
            accent_color: "#1F6FEB".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    #[serde(flatten)]
    pub branding: Branding,
    #[serde(default)]
    pub users: Vec<SystemUser>,
    #[serde(default)]
    pub updated_at: String,
}

impl SystemSettings {
    /// Role listed for `email`, compared case-insensitively.
    pub fn role_of(&self, email: &str) -> Option<Role> {
        self.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.role)
    }

    /// Distinct administrator emails, compared case-insensitively.
    pub fn admin_count(&self) -> usize {
        self.users
            .iter()
            .filter(|u| u.role == Role::Admin)
            .map(|u| u.email.to_lowercase())
            .collect::<HashSet<_>>()
            .len()
    }

    /// First email listed more than once, compared case-insensitively.
    pub fn duplicate_email(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.users
            .iter()
            .find(|u| !seen.insert(u.email.to_lowercase()))
            .map(|u| u.email.as_str())
    }
}

/// Request body for adding a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub role: Role,
    /// Creates or resets the login for this email
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for changing a user's role or password.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Role,
    #[serde(default)]
    pub password: Option<String>,
}
