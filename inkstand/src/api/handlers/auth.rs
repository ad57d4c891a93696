//! Authentication handlers.
//!
//! These delegate credential handling entirely to the external identity
//! service; the gateway's own contribution is the session cookie pair, the
//! default profile row at sign-up, and the role-home hint the frontend uses
//! to route after login.

use axum::{Json, extract::State};
use tracing::{debug, warn};

use crate::{
    AppState,
    api::models::auth::{
        LoginRequest, LoginResponse, LogoutEnvelope, LogoutResponse, SessionEnvelope, SignupEnvelope, SignupRequest,
        SignupResponse,
    },
    auth::decision::RoleHome,
    auth::identity::TokenPair,
    auth::session::{Session, clear_cookie_values, session_tokens_from_headers, set_cookie_values},
    errors::Error,
    profiles::{AccountType, ProfileError},
    types::abbrev_uuid,
};

/// Build the session envelope for a signed-in user. Profile lookup failures
/// degrade to "no profile" - the user still gets a session, landing in the
/// bookstore until the profile store recovers.
async fn session_envelope(state: &AppState, pair: &TokenPair) -> SessionEnvelope {
    let profile = match state.profiles.get(pair.user.id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user_id = %abbrev_uuid(&pair.user.id), "profile lookup failed during login: {e}");
            None
        }
    };

    SessionEnvelope {
        user: pair.user.clone(),
        home: RoleHome::for_profile(profile.as_ref()).path().to_string(),
        profile,
    }
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = SessionEnvelope),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    let pair = state.identity.sign_in(&request.email, &request.password).await?;
    let body = session_envelope(&state, &pair).await;
    let cookies = set_cookie_values(&pair, &state.config.auth.session);

    Ok(LoginResponse { body, cookies })
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Account created", body = SignupEnvelope),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signup(State(state): State<AppState>, Json(request): Json<SignupRequest>) -> Result<SignupResponse, Error> {
    let outcome = state.identity.sign_up(&request.email, &request.password).await?;
    let user = outcome.user().clone();

    // Every identity gets exactly one profile row, reader by default. A
    // conflict means the row already exists (interrupted earlier signup);
    // fall back to reading it.
    let profile = match state.profiles.create(user.id, AccountType::Reader).await {
        Ok(profile) => profile,
        Err(ProfileError::Upstream { status: 409, .. }) => state
            .profiles
            .get(user.id)
            .await?
            .ok_or_else(|| Error::Internal {
                operation: "load existing profile after signup conflict".to_string(),
            })?,
        Err(e) => return Err(e.into()),
    };

    let (session, cookies) = match outcome.into_session() {
        Some(pair) => {
            let envelope = SessionEnvelope {
                user: pair.user.clone(),
                home: RoleHome::for_profile(Some(&profile)).path().to_string(),
                profile: Some(profile.clone()),
            };
            let cookies = set_cookie_values(&pair, &state.config.auth.session);
            (Some(envelope), cookies)
        }
        None => (None, Vec::new()),
    };

    let message = if session.is_some() {
        "Registration successful".to_string()
    } else {
        "Registration successful, confirm your email address to sign in".to_string()
    };

    Ok(SignupResponse {
        body: SignupEnvelope {
            user,
            profile,
            session,
            message,
        },
        cookies,
    })
}

/// Logout (revoke the session and clear cookies)
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = LogoutEnvelope),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Result<LogoutResponse, Error> {
    // Revocation is best-effort: the cookies are cleared regardless, and an
    // unreachable identity service must not trap users in a session.
    if let Some(access) = session_tokens_from_headers(&headers, &state.config.auth.session).access {
        if let Err(e) = state.identity.sign_out(&access).await {
            debug!("session revocation failed: {e}");
        }
    }

    Ok(LogoutResponse {
        body: LogoutEnvelope {
            message: "Logout successful".to_string(),
        },
        cookies: clear_cookie_values(&state.config.auth.session),
    })
}

/// Get the current session
#[utoipa::path(
    get,
    path = "/auth/session",
    tag = "authentication",
    responses(
        (status = 200, description = "Current session", body = SessionEnvelope),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_session(State(state): State<AppState>, session: Session) -> Result<Json<SessionEnvelope>, Error> {
    let profile = match state.profiles.get(session.user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user_id = %abbrev_uuid(&session.user_id), "profile lookup failed for session probe: {e}");
            None
        }
    };

    Ok(Json(SessionEnvelope {
        user: crate::auth::identity::IdentityUser {
            id: session.user_id,
            email: session.email,
        },
        home: RoleHome::for_profile(profile.as_ref()).path().to_string(),
        profile,
    }))
}
