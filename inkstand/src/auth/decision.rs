//! The access decision engine.
//!
//! Pure function from (route class, session state, profile fields) to an
//! access decision. The whole table lives in one `match` so every row can be
//! read off against the intended policy, and so the least-privilege fallback
//! (absent profile ≡ reader with no role) is visible in the binding, not
//! buried in branches. No I/O happens here; the middleware gathers the inputs
//! and renders the output.

use crate::auth::classifier::RouteClass;
use crate::auth::session::Session;
use crate::profiles::{AccountType, Profile, ProfileRole};

/// The landing page a signed-in user belongs on, computed from their profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleHome {
    Admin,
    Author,
    Bookstore,
}

impl RoleHome {
    /// Admin role wins over account type; readers (and anyone without a
    /// profile row) land in the bookstore.
    pub fn from_parts(role: Option<ProfileRole>, account_type: AccountType) -> Self {
        match (role, account_type) {
            (Some(ProfileRole::Admin), _) => RoleHome::Admin,
            (None, AccountType::Author) => RoleHome::Author,
            (None, AccountType::Reader) => RoleHome::Bookstore,
        }
    }

    pub fn for_profile(profile: Option<&Profile>) -> Self {
        Self::from_parts(
            profile.and_then(|p| p.role),
            profile.map(|p| p.account_type).unwrap_or(AccountType::Reader),
        )
    }

    pub fn path(self) -> &'static str {
        match self {
            RoleHome::Admin => "/admin",
            RoleHome::Author => "/author",
            RoleHome::Bookstore => "/bookstore",
        }
    }
}

/// What the gateway does with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Pass through to the application.
    Allow,
    /// Send to the login page; `return_to` becomes the `redirect` query
    /// parameter so the login flow can come back.
    RedirectToLogin { return_to: Option<String> },
    /// Send home with `error=unauthorized` attached.
    RedirectUnauthorized,
    /// Send to the user's role home.
    RedirectRoleHome(RoleHome),
}

/// Decide access for one request.
///
/// `profile` may be absent because no row exists or because the lookup
/// failed; both degrade to a reader with no role. Nothing in this table can
/// turn a missing profile into elevated access.
pub fn decide(class: RouteClass, session: Option<&Session>, profile: Option<&Profile>, path: &str) -> AccessDecision {
    let role = profile.and_then(|p| p.role);
    let account_type = profile.map(|p| p.account_type).unwrap_or(AccountType::Reader);

    match (class, session, role, account_type) {
        // Public listings and everything unclassified pass through untouched.
        (RouteClass::PublicExempt | RouteClass::Unrestricted, _, _, _) => AccessDecision::Allow,

        // Protected areas without a session: to login, remembering where the
        // user was headed.
        (RouteClass::ProtectedAuthor | RouteClass::ProtectedAdmin, None, _, _) => AccessDecision::RedirectToLogin {
            return_to: Some(path.to_owned()),
        },

        // Author workspace: admins and authors in, readers to the bookstore.
        (RouteClass::ProtectedAuthor, Some(_), Some(ProfileRole::Admin), _) => AccessDecision::Allow,
        (RouteClass::ProtectedAuthor, Some(_), None, AccountType::Author) => AccessDecision::Allow,
        (RouteClass::ProtectedAuthor, Some(_), None, AccountType::Reader) => {
            AccessDecision::RedirectRoleHome(RoleHome::Bookstore)
        }

        // Admin console: admin role only.
        (RouteClass::ProtectedAdmin, Some(_), Some(ProfileRole::Admin), _) => AccessDecision::Allow,
        (RouteClass::ProtectedAdmin, Some(_), None, _) => AccessDecision::RedirectUnauthorized,

        // Login/signup render for the signed-out; signed-in users are
        // bounced to wherever they belong.
        (RouteClass::AuthOnly, None, _, _) => AccessDecision::Allow,
        (RouteClass::AuthOnly, Some(_), role, account_type) => {
            AccessDecision::RedirectRoleHome(RoleHome::from_parts(role, account_type))
        }

        // /dashboard never renders: it dispatches by role, or to a bare
        // login page when signed out.
        (RouteClass::DashboardRedirect, None, _, _) => AccessDecision::RedirectToLogin { return_to: None },
        (RouteClass::DashboardRedirect, Some(_), role, account_type) => {
            AccessDecision::RedirectRoleHome(RoleHome::from_parts(role, account_type))
        }
    }
}
