//! Authentication and route access control.
//!
//! This module implements the gateway's session/role pipeline:
//!
//! 1. **Session resolution** - every request's cookies are turned into an
//!    authenticated identity (or nothing). Access tokens are verified locally
//!    with the identity service's JWT secret; expired tokens are refreshed
//!    through the identity service, and rotated cookies are mirrored onto the
//!    outgoing response.
//! 2. **Route classification** - the request path is mapped to an access
//!    category (`protected author`, `protected admin`, `auth-only`, ...).
//! 3. **Access decision** - a pure decision table combines category, session
//!    state, and profile fields into allow-or-redirect. On any lookup failure
//!    the table fails open to the least-privileged outcome (reader), never to
//!    elevated access.
//! 4. **Response building** - the middleware renders the decision and always
//!    forwards refreshed session cookies, on pass-throughs and redirects
//!    alike.
//!
//! # Modules
//!
//! - [`classifier`]: Path-to-category mapping
//! - [`current_user`]: Session resolution and the handler extractor
//! - [`decision`]: The access decision table and role-home computation
//! - [`identity`]: HTTP client for the external identity service
//! - [`middleware`]: The route guard tying the pipeline together
//! - [`session`]: Token verification and session cookie handling
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use inkstand::auth::session::Session;
//!
//! async fn protected_handler(session: Session) -> String {
//!     format!("Hello, {}!", session.email)
//! }
//! ```

pub mod classifier;
pub mod current_user;
pub mod decision;
pub mod identity;
pub mod middleware;
pub mod session;
