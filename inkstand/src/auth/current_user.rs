//! Session resolution from request cookies.
//!
//! The session accessor turns a request's cookie jar into an authenticated
//! identity, refreshing through the identity service when the access token
//! has expired. Any token rotation it performs is reported back so the
//! caller can mirror the new cookies onto the outgoing response - dropping
//! that step silently signs users out on rotation.

use axum::http::HeaderMap;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, warn};

use crate::AppState;
use crate::auth::identity::TokenPair;
use crate::auth::session::{Session, SessionTokens, TokenError, decode_access_token, session_tokens_from_headers};
use crate::errors::{Error, Result};

/// The outcome of session resolution for one request.
#[derive(Debug, Default)]
pub struct ResolvedSession {
    /// The authenticated identity, if any.
    pub session: Option<Session>,
    /// A rotated token pair that must be persisted to the caller as cookies.
    pub rotated: Option<TokenPair>,
}

impl ResolvedSession {
    fn none() -> Self {
        Self::default()
    }
}

/// Resolve the session for a request.
///
/// A valid access token is used as-is. An expired, invalid, or missing
/// access token falls back to the refresh token, if present; every refresh
/// failure degrades to "no session". Nothing here returns an error: the
/// route guard treats an unresolvable session as signed-out.
#[instrument(skip_all)]
pub async fn resolve_session(headers: &HeaderMap, state: &AppState) -> ResolvedSession {
    let tokens = session_tokens_from_headers(headers, &state.config.auth.session);

    if let Some(access) = &tokens.access {
        match decode_access_token(access, state.config.jwt_secret()) {
            Ok(claims) => {
                return ResolvedSession {
                    session: Some(claims.into()),
                    rotated: None,
                };
            }
            Err(TokenError::Expired) => {
                debug!("access token expired, attempting refresh");
            }
            Err(TokenError::Invalid) => {
                debug!("access token invalid, attempting refresh");
            }
            Err(TokenError::Verification(reason)) => {
                warn!("access token verification failed: {reason}");
                return ResolvedSession::none();
            }
        }
    }

    try_refresh(&tokens, state).await
}

async fn try_refresh(tokens: &SessionTokens, state: &AppState) -> ResolvedSession {
    let Some(refresh) = &tokens.refresh else {
        return ResolvedSession::none();
    };

    let pair = match state.identity.refresh(refresh).await {
        Ok(pair) => pair,
        Err(e) => {
            debug!("session refresh failed: {e}");
            return ResolvedSession::none();
        }
    };

    match decode_access_token(&pair.access_token, state.config.jwt_secret()) {
        Ok(claims) => ResolvedSession {
            session: Some(claims.into()),
            rotated: Some(pair),
        },
        Err(e) => {
            warn!("identity service returned an unverifiable access token: {e}");
            ResolvedSession::none()
        }
    }
}

/// Extractor for handlers that require an authenticated caller.
///
/// Handlers run behind the route guard, which has already refreshed the
/// session and rewritten the request's cookies, so a plain token
/// verification is enough here - no network calls.
impl FromRequestParts<AppState> for Session {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let tokens = session_tokens_from_headers(&parts.headers, &state.config.auth.session);

        let access = tokens.access.ok_or(Error::Unauthenticated { message: None })?;
        let claims = decode_access_token(&access, state.config.jwt_secret())
            .map_err(|_| Error::Unauthenticated { message: None })?;

        Ok(claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_state, mint_access_token};
    use axum::http::header::COOKIE;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test-secret-key-for-jwt";

    fn cookie_headers(config: &crate::config::Config, access: Option<&str>, refresh: Option<&str>) -> HeaderMap {
        let mut parts = Vec::new();
        if let Some(access) = access {
            parts.push(format!("{}={access}", config.auth.session.access_cookie_name));
        }
        if let Some(refresh) = refresh {
            parts.push(format!("{}={refresh}", config.auth.session.refresh_cookie_name));
        }
        let mut headers = HeaderMap::new();
        if !parts.is_empty() {
            headers.insert(COOKIE, parts.join("; ").parse().unwrap());
        }
        headers
    }

    #[tokio::test]
    async fn valid_access_token_resolves_without_refresh() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;
        let state = create_test_state(create_test_config(&identity.uri(), &profiles.uri()));

        let user_id = Uuid::new_v4();
        let token = mint_access_token(user_id, "reader@example.com", SECRET, 3600);
        let headers = cookie_headers(&state.config, Some(&token), None);

        let resolved = resolve_session(&headers, &state).await;
        assert_eq!(resolved.session.unwrap().user_id, user_id);
        assert!(resolved.rotated.is_none());
    }

    #[tokio::test]
    async fn expired_access_token_refreshes_and_reports_rotation() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;
        let state = create_test_state(create_test_config(&identity.uri(), &profiles.uri()));

        let user_id = Uuid::new_v4();
        let expired = mint_access_token(user_id, "reader@example.com", SECRET, -3600);
        let fresh = mint_access_token(user_id, "reader@example.com", SECRET, 3600);

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": fresh,
                "refresh_token": "rotated-refresh",
                "expires_in": 3600,
                "user": { "id": user_id, "email": "reader@example.com" }
            })))
            .expect(1)
            .mount(&identity)
            .await;

        let headers = cookie_headers(&state.config, Some(&expired), Some("old-refresh"));
        let resolved = resolve_session(&headers, &state).await;

        assert_eq!(resolved.session.unwrap().user_id, user_id);
        let rotated = resolved.rotated.unwrap();
        assert_eq!(rotated.refresh_token, "rotated-refresh");
    }

    #[tokio::test]
    async fn refresh_failure_means_no_session() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;
        let state = create_test_state(create_test_config(&identity.uri(), &profiles.uri()));

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&identity)
            .await;

        let expired = mint_access_token(Uuid::new_v4(), "reader@example.com", SECRET, -3600);
        let headers = cookie_headers(&state.config, Some(&expired), Some("stale-refresh"));

        let resolved = resolve_session(&headers, &state).await;
        assert!(resolved.session.is_none());
        assert!(resolved.rotated.is_none());
    }

    #[tokio::test]
    async fn no_cookies_means_no_session_and_no_identity_calls() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&identity)
            .await;

        let state = create_test_state(create_test_config(&identity.uri(), &profiles.uri()));
        let resolved = resolve_session(&HeaderMap::new(), &state).await;
        assert!(resolved.session.is_none());
    }
}
