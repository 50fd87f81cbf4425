//! Role-based route guarding
//!
//! Access is decided on the first path segment only: `/dashboard/42` is
//! checked as `/dashboard`. There is no wildcard or hierarchical matching.
//!
//! # Example
//!
//! ```rust
//! use zeto::guard::{AuthSession, GuardDecision, Role, RouteGuard, User};
//!
//! let guard = RouteGuard::default();
//! let session = AuthSession::signed_in(User::new("u-1", Role::Advertiser));
//!
//! assert_eq!(guard.check("/ads/12", &session), GuardDecision::Allow);
//! assert_eq!(
//!     guard.check("/users/5", &session),
//!     GuardDecision::Redirect("/".to_string())
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::config::RoutesConfig;
use crate::error::{ConfigError, Result};

/// Closed set of user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Owner,
    Manager,
    Advertiser,
    Client,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Owner,
        Role::Manager,
        Role::Advertiser,
        Role::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Advertiser => "advertiser",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "role".to_string(),
                value: s.to_string(),
            })
    }
}

/// Authenticated user as seen by the guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
}

impl User {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: None,
            role,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Source of the current authentication state
pub trait SessionSource {
    /// Signed-in user, if any
    fn current_user(&self) -> Option<&User>;

    /// Whether the session is still being resolved
    fn is_loading(&self) -> bool;
}

/// Plain authentication snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    pub user: Option<User>,
    pub loading: bool,
}

impl AuthSession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn resolving() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }
}

impl SessionSource for AuthSession {
    fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn is_loading(&self) -> bool {
        self.loading
    }
}

/// Outcome of a route check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; render nothing yet
    Pending,

    /// Render the requested route
    Allow,

    /// Navigate elsewhere instead
    Redirect(String),
}

impl fmt::Display for GuardDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardDecision::Pending => write!(f, "pending"),
            GuardDecision::Allow => write!(f, "allow"),
            GuardDecision::Redirect(to) => write!(f, "redirect {to}"),
        }
    }
}

/// Role to allowed first-segment table
#[derive(Debug, Clone)]
pub struct RouteGuard {
    access: HashMap<Role, BTreeSet<String>>,
    login_path: String,
    default_path: String,
}

const FULL_ACCESS: &[&str] = &[
    "/dashboard",
    "/modules",
    "/factures",
    "/users",
    "/contracts",
    "/parametres",
    "/transactions",
    "/companies",
    "/ads",
];

const STAFF_ACCESS: &[&str] = &[
    "/dashboard",
    "/modules",
    "/factures",
    "/contracts",
    "/parametres",
    "/transactions",
];

const ADVERTISER_ACCESS: &[&str] = &["/dashboard", "/factures", "/ads", "/contracts", "/parametres"];

impl Default for RouteGuard {
    fn default() -> Self {
        let mut access = HashMap::new();
        for role in Role::ALL {
            let paths = match role {
                Role::Admin | Role::Owner => FULL_ACCESS,
                Role::Manager | Role::Client => STAFF_ACCESS,
                Role::Advertiser => ADVERTISER_ACCESS,
            };
            access.insert(role, paths.iter().map(|p| p.to_string()).collect());
        }

        Self {
            access,
            login_path: "/login".to_string(),
            default_path: "/".to_string(),
        }
    }
}

impl RouteGuard {
    /// Build a guard from the `[routes]` configuration section.
    ///
    /// Roles missing from a configured access table get no routes at all.
    pub fn from_config(config: &RoutesConfig) -> Result<Self> {
        let mut guard = Self {
            login_path: config.login_path.clone(),
            default_path: config.default_path.clone(),
            ..Self::default()
        };

        if let Some(table) = &config.access {
            guard.access.clear();
            for (name, paths) in table {
                let role: Role = name.parse()?;
                let entry = guard.access.entry(role).or_default();
                for path in paths {
                    entry.insert(first_segment(path));
                }
            }
        }

        Ok(guard)
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    /// Allowed first segments of a role, sorted
    pub fn allowed_paths(&self, role: Role) -> Vec<&str> {
        self.access
            .get(&role)
            .map(|paths| paths.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether `role` may open `path`
    pub fn is_allowed(&self, role: Role, path: &str) -> bool {
        let segment = first_segment(path);
        self.access
            .get(&role)
            .is_some_and(|paths| paths.contains(&segment))
    }

    /// Decide what to render for `path` under the given session
    pub fn check(&self, path: &str, session: &impl SessionSource) -> GuardDecision {
        if session.is_loading() {
            return GuardDecision::Pending;
        }

        let Some(user) = session.current_user() else {
            debug!("Anonymous request for '{}', redirecting to login", path);
            return GuardDecision::Redirect(self.login_path.clone());
        };

        if self.is_allowed(user.role, path) {
            GuardDecision::Allow
        } else {
            debug!(
                "Role '{}' may not open '{}', redirecting to '{}'",
                user.role, path, self.default_path
            );
            GuardDecision::Redirect(self.default_path.clone())
        }
    }
}

/// Text between the first and second slash, re-prefixed with `/`:
/// `/users/5?tab=1` gives `/users`. Paths are expected to be absolute;
/// `contracts/9` gives `/9`.
pub fn first_segment(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segment = path.split('/').nth(1).unwrap_or_default();
    format!("/{segment}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> AuthSession {
        AuthSession::signed_in(User::new("u-1", role).with_email("user@zeto.app"))
    }

    #[test]
    fn test_advertiser_and_admin_on_users() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.check("/users/5", &session(Role::Advertiser)),
            GuardDecision::Redirect("/".to_string())
        );
        assert_eq!(
            guard.check("/users/5", &session(Role::Admin)),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_unauthenticated_and_loading() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.check("/dashboard", &AuthSession::anonymous()),
            GuardDecision::Redirect("/login".to_string())
        );
        assert_eq!(
            guard.check("/dashboard", &AuthSession::resolving()),
            GuardDecision::Pending
        );
    }

    #[test]
    fn test_first_segment() {
        assert_eq!(first_segment("/dashboard/42"), "/dashboard");
        assert_eq!(first_segment("/users?tab=roles"), "/users");
        assert_eq!(first_segment("/ads#top"), "/ads");
        assert_eq!(first_segment("/"), "/");
        assert_eq!(first_segment(""), "/");
        assert_eq!(first_segment("contracts/9"), "/9");
        assert_eq!(first_segment("//users"), "/");
    }

    #[test]
    fn test_exact_segment_membership_only() {
        let guard = RouteGuard::default();
        assert!(!guard.is_allowed(Role::Client, "/"));
        assert!(!guard.is_allowed(Role::Client, "/dashboards"));
        assert!(!guard.is_allowed(Role::Client, "/ads"));
        assert!(guard.is_allowed(Role::Client, "/transactions/2024/03"));
        assert!(!guard.is_allowed(Role::Manager, "/companies"));
        assert!(guard.is_allowed(Role::Owner, "/companies/1"));
        assert!(guard.is_allowed(Role::Advertiser, "/contracts/9"));
        assert!(!guard.is_allowed(Role::Advertiser, "contracts/9"));
    }

    #[test]
    fn test_default_table_sizes() {
        let guard = RouteGuard::default();
        assert_eq!(guard.allowed_paths(Role::Admin).len(), 9);
        assert_eq!(
            guard.allowed_paths(Role::Admin),
            guard.allowed_paths(Role::Owner)
        );
        assert_eq!(guard.allowed_paths(Role::Manager).len(), 6);
        assert_eq!(guard.allowed_paths(Role::Advertiser).len(), 5);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Advertiser".parse::<Role>().unwrap(), Role::Advertiser);
        assert_eq!(Role::Client.to_string(), "client");
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn test_from_config_overrides() {
        let mut table = HashMap::new();
        table.insert("client".to_string(), vec!["/portal/home".to_string()]);
        let config = RoutesConfig {
            login_path: "/signin".to_string(),
            default_path: "/home".to_string(),
            access: Some(table),
        };
        let guard = RouteGuard::from_config(&config).unwrap();

        assert!(guard.is_allowed(Role::Client, "/portal"));
        assert!(!guard.is_allowed(Role::Admin, "/dashboard"));
        assert_eq!(
            guard.check("/dashboard", &AuthSession::anonymous()),
            GuardDecision::Redirect("/signin".to_string())
        );
        assert_eq!(
            guard.check("/dashboard", &session(Role::Client)),
            GuardDecision::Redirect("/home".to_string())
        );

        let mut bad = HashMap::new();
        bad.insert("guest".to_string(), Vec::new());
        let config = RoutesConfig {
            access: Some(bad),
            ..RoutesConfig::default()
        };
        assert!(RouteGuard::from_config(&config).is_err());
    }
}
