//! The route guard.
//!
//! Every inbound request passes through here before path matching: resolve
//! the session (refreshing if needed), look up the caller's profile when the
//! route class requires it, run the decision engine, and render the outcome
//! as a pass-through or a redirect. Rotated session cookies are attached to
//! the response on every path out of this function, allow and redirect alike.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, instrument, warn};

use crate::AppState;
use crate::auth::classifier::classify;
use crate::auth::current_user::resolve_session;
use crate::auth::decision::{AccessDecision, decide};
use crate::auth::identity::TokenPair;
use crate::auth::session::set_cookie_values;
use crate::config::SessionConfig;
use crate::profiles::Profile;
use crate::types::abbrev_uuid;

/// Session/role-based access control, applied ahead of route matching.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn route_guard(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let class = classify(&path);

    let resolved = resolve_session(request.headers(), &state).await;

    // Downstream extractors must see the rotated tokens, not the stale
    // cookies the browser sent.
    if let Some(pair) = &resolved.rotated {
        rewrite_request_cookies(&mut request, pair, &state.config.auth.session);
    }

    let profile = match &resolved.session {
        Some(session) if class.needs_profile() => fetch_profile(&state, session.user_id).await,
        _ => None,
    };

    let decision = decide(class, resolved.session.as_ref(), profile.as_ref(), &path);
    debug!(?class, ?decision, "access decision");

    let mut response = match decision {
        AccessDecision::Allow => next.run(request).await,
        AccessDecision::RedirectToLogin { return_to } => Redirect::temporary(&login_location(return_to)).into_response(),
        AccessDecision::RedirectUnauthorized => Redirect::temporary("/?error=unauthorized").into_response(),
        AccessDecision::RedirectRoleHome(home) => Redirect::temporary(home.path()).into_response(),
    };

    if let Some(pair) = &resolved.rotated {
        append_session_cookies(&mut response, pair, &state.config.auth.session);
    }

    response
}

/// Profile lookup with least-privilege degradation: any error is logged and
/// reported as "no profile", which the decision engine treats as a reader.
async fn fetch_profile(state: &AppState, user_id: crate::types::UserId) -> Option<Profile> {
    match state.profiles.get(user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user_id = %abbrev_uuid(&user_id), "profile lookup failed, treating as reader: {e}");
            None
        }
    }
}

fn login_location(return_to: Option<String>) -> String {
    match return_to {
        Some(path) => {
            let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
            format!("/login?redirect={encoded}")
        }
        None => "/login".to_string(),
    }
}

/// Replace the session cookies in the request's `Cookie` header with the
/// rotated values, leaving unrelated cookies untouched.
fn rewrite_request_cookies(request: &mut Request, pair: &TokenPair, session: &SessionConfig) {
    let existing = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let mut cookies: Vec<String> = existing
        .split(';')
        .map(str::trim)
        .filter(|c| {
            let name = c.split_once('=').map(|(n, _)| n).unwrap_or(c);
            !c.is_empty() && name != session.access_cookie_name && name != session.refresh_cookie_name
        })
        .map(str::to_owned)
        .collect();

    cookies.push(format!("{}={}", session.access_cookie_name, pair.access_token));
    cookies.push(format!("{}={}", session.refresh_cookie_name, pair.refresh_token));

    if let Ok(value) = HeaderValue::from_str(&cookies.join("; ")) {
        request.headers_mut().insert(header::COOKIE, value);
    }
}

/// Mirror rotated tokens onto the outgoing response as `Set-Cookie` headers.
fn append_session_cookies(response: &mut Response, pair: &TokenPair, session: &SessionConfig) {
    for cookie in set_cookie_values(pair, session) {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
}
