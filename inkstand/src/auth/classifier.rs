//! Route classification.
//!
//! Maps a request path to the access category the decision engine operates
//! on. Classification is a pure function of the path string: nothing is
//! cached, and the query string never participates.

/// Access category of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Author workspace (`/author`, `/author/...`) - requires an author or admin
    ProtectedAuthor,
    /// Admin console (`/admin...`) - requires the admin role
    ProtectedAdmin,
    /// Public pages that collide with a protected prefix (`/authors...`)
    PublicExempt,
    /// Login and signup pages - only sensible without a session
    AuthOnly,
    /// `/dashboard` - a pure role dispatcher, never rendered
    DashboardRedirect,
    /// Everything else
    Unrestricted,
}

impl RouteClass {
    /// Whether the decision for this class depends on profile fields.
    /// Exempt and unrestricted paths must never trigger a profile lookup.
    pub fn needs_profile(self) -> bool {
        !matches!(self, RouteClass::PublicExempt | RouteClass::Unrestricted)
    }
}

/// Classify a normalized request path.
///
/// The public author listing lives at `/authors...`, one character away from
/// the protected `/author` workspace. Exempt membership is checked first so
/// the listing can never be swallowed by the protected prefix.
pub fn classify(path: &str) -> RouteClass {
    if path.starts_with("/authors") {
        RouteClass::PublicExempt
    } else if path == "/author" || path.starts_with("/author/") {
        RouteClass::ProtectedAuthor
    } else if path.starts_with("/admin") {
        RouteClass::ProtectedAdmin
    } else if path.starts_with("/login") || path.starts_with("/signup") {
        RouteClass::AuthOnly
    } else if path == "/dashboard" {
        RouteClass::DashboardRedirect
    } else {
        RouteClass::Unrestricted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_workspace_paths_are_protected() {
        assert_eq!(classify("/author"), RouteClass::ProtectedAuthor);
        assert_eq!(classify("/author/"), RouteClass::ProtectedAuthor);
        assert_eq!(classify("/author/manuscripts"), RouteClass::ProtectedAuthor);
        assert_eq!(classify("/author/books/42/edit"), RouteClass::ProtectedAuthor);
    }

    #[test]
    fn public_author_listing_is_exempt_despite_prefix_overlap() {
        assert_eq!(classify("/authors"), RouteClass::PublicExempt);
        assert_eq!(classify("/authors/"), RouteClass::PublicExempt);
        assert_eq!(classify("/authors/jane-doe"), RouteClass::PublicExempt);
    }

    #[test]
    fn author_prefix_without_separator_is_not_protected() {
        // "/authoring" shares the "/author" prefix but is neither the
        // workspace root nor under it.
        assert_eq!(classify("/authoring"), RouteClass::Unrestricted);
        assert_eq!(classify("/authorize"), RouteClass::Unrestricted);
    }

    #[test]
    fn admin_paths_are_protected() {
        assert_eq!(classify("/admin"), RouteClass::ProtectedAdmin);
        assert_eq!(classify("/admin/users"), RouteClass::ProtectedAdmin);
    }

    #[test]
    fn login_and_signup_are_auth_only() {
        assert_eq!(classify("/login"), RouteClass::AuthOnly);
        assert_eq!(classify("/signup"), RouteClass::AuthOnly);
        assert_eq!(classify("/signup/confirm"), RouteClass::AuthOnly);
    }

    #[test]
    fn dashboard_matches_exactly() {
        assert_eq!(classify("/dashboard"), RouteClass::DashboardRedirect);
        assert_eq!(classify("/dashboard/settings"), RouteClass::Unrestricted);
    }

    #[test]
    fn everything_else_is_unrestricted() {
        assert_eq!(classify("/"), RouteClass::Unrestricted);
        assert_eq!(classify("/bookstore"), RouteClass::Unrestricted);
        assert_eq!(classify("/books/123"), RouteClass::Unrestricted);
        assert_eq!(classify("/healthz"), RouteClass::Unrestricted);
    }

    #[test]
    fn profile_lookup_is_skipped_for_exempt_and_unrestricted() {
        assert!(!RouteClass::PublicExempt.needs_profile());
        assert!(!RouteClass::Unrestricted.needs_profile());
        assert!(RouteClass::ProtectedAuthor.needs_profile());
        assert!(RouteClass::ProtectedAdmin.needs_profile());
        assert!(RouteClass::AuthOnly.needs_profile());
        assert!(RouteClass::DashboardRedirect.needs_profile());
    }
}
