//! Role-based view routing.
//!
//! Each role maps to a fixed set of views. The table is static; handlers check
//! the caller's role against the view(s) an endpoint belongs to.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Coarse role assigned to a user through the system settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    Manager,
    Buyer,
    Clerk,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Buyer => "buyer",
            Role::Clerk => "clerk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "buyer" => Some(Role::Buyer),
            "clerk" => Some(Role::Clerk),
            _ => None,
        }
    }
}

/// A screen of the client application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum View {
    Dashboard,
    Quotes,
    NewQuote,
    Reports,
    Protocol,
    Suppliers,
    Settings,
    Users,
}

const ADMIN_VIEWS: &[View] = &[
    View::Dashboard,
    View::Quotes,
    View::NewQuote,
    View::Reports,
    View::Protocol,
    View::Suppliers,
    View::Settings,
    View::Users,
];

const MANAGER_VIEWS: &[View] = &[
    View::Dashboard,
    View::Quotes,
    View::NewQuote,
    View::Reports,
    View::Protocol,
    View::Suppliers,
];

const BUYER_VIEWS: &[View] = &[View::Quotes, View::NewQuote, View::Suppliers];

const CLERK_VIEWS: &[View] = &[View::Protocol, View::Reports];

/// Views the role may open, in navigation order.
pub fn allowed_views(role: Role) -> &'static [View] {
    match role {
        Role::Admin => ADMIN_VIEWS,
        Role::Manager => MANAGER_VIEWS,
        Role::Buyer => BUYER_VIEWS,
        Role::Clerk => CLERK_VIEWS,
    }
}

/// The view a role lands on after login.
pub fn default_view(role: Role) -> View {
    allowed_views(role)[0]
}

pub fn can_access(role: Role, view: View) -> bool {
    allowed_views(role).contains(&view)
}

/// Ok when the role grants at least one of `views`.
pub fn require_any(role: Role, views: &[View]) -> Result<(), AppError> {
    if views.iter().any(|v| can_access(role, *v)) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role '{}' cannot access this resource",
            role.as_str()
        )))
    }
}
