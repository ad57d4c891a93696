//! OpenAPI documentation configuration.
//!
//! The rendered documentation is served at `/docs`.

use utoipa::OpenApi;

use crate::api::handlers::{auth, profiles};
use crate::api::models::auth::{LoginRequest, LogoutEnvelope, SessionEnvelope, SignupEnvelope, SignupRequest};
use crate::api::models::profiles::ProfileUpdateRequest;
use crate::auth::identity::IdentityUser;
use crate::profiles::{AccountType, Profile, ProfileRole};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::signup,
        auth::logout,
        auth::get_session,
        profiles::get_my_profile,
        profiles::update_my_profile,
    ),
    components(schemas(
        LoginRequest,
        SignupRequest,
        SessionEnvelope,
        SignupEnvelope,
        LogoutEnvelope,
        ProfileUpdateRequest,
        IdentityUser,
        Profile,
        AccountType,
        ProfileRole,
    )),
    tags(
        (name = "authentication", description = "Session lifecycle, delegated to the identity service"),
        (name = "profiles", description = "Profile reads and author onboarding"),
    ),
    info(
        title = "Inkstand Gateway API",
        description = "Session, role, and route access control for the Inkstand publishing platform"
    )
)]
pub struct ApiDoc;
