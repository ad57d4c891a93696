//! Access-token verification and session cookie handling.
//!
//! Sessions are issued by the external identity service as an HS256 JWT
//! access token plus an opaque refresh token, carried in a pair of HTTP-only
//! cookies. The gateway verifies access tokens locally with the identity
//! service's shared JWT secret; it never mints tokens of its own (outside of
//! tests).

use axum::http::HeaderMap;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::auth::identity::TokenPair;
use crate::config::SessionConfig;
use crate::types::UserId;

/// Claims the identity service puts in its access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// A verified session identity, as consumed by the route guard and handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
}

impl From<SessionClaims> for Session {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

/// Outcome of verifying an access token.
///
/// `Expired` is separated from `Invalid` because it is the one failure the
/// session accessor can recover from (by asking the identity service for a
/// refresh). Everything else is treated as "no session".
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("access token expired")]
    Expired,

    #[error("invalid access token")]
    Invalid,

    #[error("token verification failed: {0}")]
    Verification(String),
}

/// Verify and decode an access token with the identity service's JWT secret.
pub fn decode_access_token(token: &str, jwt_secret: &str) -> Result<SessionClaims, TokenError> {
    let key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,

        // Client errors: malformed tokens, bad signatures, invalid claims
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => TokenError::Invalid,

        // Server-side key problems
        _ => TokenError::Verification(e.to_string()),
    })?;

    Ok(token_data.claims)
}

/// The session token pair pulled from a request's cookies. Either half can be
/// missing independently (expired cookie, cleared by the browser, etc.).
#[derive(Debug, Default, Clone)]
pub struct SessionTokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// Extract the session cookies from a request's `Cookie` header.
pub fn session_tokens_from_headers(headers: &HeaderMap, session: &SessionConfig) -> SessionTokens {
    let mut tokens = SessionTokens::default();

    let Some(cookie_header) = headers.get(axum::http::header::COOKIE) else {
        return tokens;
    };
    let Ok(cookie_str) = cookie_header.to_str() else {
        return tokens;
    };

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == session.access_cookie_name {
                tokens.access = Some(value.to_string());
            } else if name == session.refresh_cookie_name {
                tokens.refresh = Some(value.to_string());
            }
        }
    }

    tokens
}

/// Render `Set-Cookie` values persisting a (possibly rotated) token pair.
///
/// The access cookie expires with the token; the refresh cookie lives for the
/// configured refresh TTL.
pub fn set_cookie_values(pair: &TokenPair, session: &SessionConfig) -> Vec<String> {
    vec![
        cookie_value(session, &session.access_cookie_name, &pair.access_token, pair.expires_in),
        cookie_value(
            session,
            &session.refresh_cookie_name,
            &pair.refresh_token,
            session.refresh_ttl.as_secs() as i64,
        ),
    ]
}

/// Render `Set-Cookie` values that clear both session cookies (logout).
pub fn clear_cookie_values(session: &SessionConfig) -> Vec<String> {
    vec![
        cookie_value(session, &session.access_cookie_name, "", 0),
        cookie_value(session, &session.refresh_cookie_name, "", 0),
    ]
}

fn cookie_value(session: &SessionConfig, name: &str, value: &str, max_age: i64) -> String {
    let same_site = match session.cookie_same_site.to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "none" => "None",
        _ => "Lax",
    };
    let secure = if session.cookie_secure { "; Secure" } else { "" };
    format!("{name}={value}; Path=/; HttpOnly{secure}; SameSite={same_site}; Max-Age={max_age}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::IdentityUser;
    use crate::test_utils::mint_access_token;
    use uuid::Uuid;

    const SECRET: &str = "test-secret-key-for-jwt";

    fn test_session_config() -> SessionConfig {
        SessionConfig::default()
    }

    #[test]
    fn mint_and_decode_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = mint_access_token(user_id, "reader@example.com", SECRET, 3600);

        let claims = decode_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "reader@example.com");

        let session = Session::from(claims);
        assert_eq!(session.user_id, user_id);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let token = mint_access_token(Uuid::new_v4(), "reader@example.com", SECRET, -3600);
        let err = decode_access_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let token = mint_access_token(Uuid::new_v4(), "reader@example.com", SECRET, 3600);
        let err = decode_access_token(&token, "a-different-secret").unwrap_err();
        assert!(matches!(err, TokenError::Invalid));
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        for token in ["not.a.token", "invalid", "", "too.many.parts.in.this.token"] {
            let err = decode_access_token(token, SECRET).unwrap_err();
            assert!(matches!(err, TokenError::Invalid), "token: {token}");
        }
    }

    #[test]
    fn cookie_parsing_picks_out_both_tokens() {
        let session = test_session_config();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            format!(
                "other=1; {}=access-value; theme=dark; {}=refresh-value",
                session.access_cookie_name, session.refresh_cookie_name
            )
            .parse()
            .unwrap(),
        );

        let tokens = session_tokens_from_headers(&headers, &session);
        assert_eq!(tokens.access.as_deref(), Some("access-value"));
        assert_eq!(tokens.refresh.as_deref(), Some("refresh-value"));
    }

    #[test]
    fn cookie_parsing_handles_missing_header() {
        let tokens = session_tokens_from_headers(&HeaderMap::new(), &test_session_config());
        assert!(tokens.access.is_none());
        assert!(tokens.refresh.is_none());
    }

    #[test]
    fn set_cookies_carry_token_values_and_attributes() {
        let session = test_session_config();
        let pair = TokenPair {
            access_token: "new-access".to_string(),
            refresh_token: "new-refresh".to_string(),
            expires_in: 3600,
            user: IdentityUser {
                id: Uuid::new_v4(),
                email: "reader@example.com".to_string(),
            },
        };

        let cookies = set_cookie_values(&pair, &session);
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with(&format!("{}=new-access;", session.access_cookie_name)));
        assert!(cookies[0].contains("Max-Age=3600"));
        assert!(cookies[0].contains("HttpOnly"));
        assert!(cookies[1].starts_with(&format!("{}=new-refresh;", session.refresh_cookie_name)));
    }

    #[test]
    fn clear_cookies_expire_immediately() {
        let session = test_session_config();
        for cookie in clear_cookie_values(&session) {
            assert!(cookie.contains("Max-Age=0"));
        }
    }
}
