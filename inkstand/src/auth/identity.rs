//! HTTP client for the external identity service.
//!
//! The identity service (a GoTrue-compatible auth server) owns credentials,
//! session issuance, refresh, and revocation. This client wraps the four
//! calls the gateway makes: password sign-in, sign-up, token refresh, and
//! sign-out. Everything else about identity lifecycle (email confirmation,
//! password recovery, OAuth providers) happens between the frontend and the
//! identity service directly.

use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;
use utoipa::ToSchema;

use crate::profiles::ensure_trailing_slash;
use crate::types::UserId;

/// The identity half of a session: who the token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentityUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
}

/// A session as issued by the identity service: a short-lived JWT access
/// token and the opaque refresh token used to rotate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: IdentityUser,
}

/// Sign-up result. When the identity service is configured to auto-confirm
/// email addresses it returns a full session; otherwise just the user record,
/// and the session arrives after confirmation via a normal sign-in.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    Session(TokenPair),
    User(IdentityUser),
}

impl SignUpOutcome {
    pub fn user(&self) -> &IdentityUser {
        match self {
            SignUpOutcome::Session(pair) => &pair.user,
            SignUpOutcome::User(user) => user,
        }
    }

    pub fn into_session(self) -> Option<TokenPair> {
        match self {
            SignUpOutcome::Session(pair) => Some(pair),
            SignUpOutcome::User(_) => None,
        }
    }
}

/// Errors from the identity service.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email address already exists")]
    EmailTaken,

    /// The identity service rejected the request (weak password, malformed
    /// email, registration disabled, ...). The message is safe to show.
    #[error("{message}")]
    Rejected { message: String },

    #[error("identity service request failed")]
    Transport(#[from] reqwest::Error),

    #[error("identity service returned {status}: {message}")]
    Upstream { status: u16, message: String },
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Error body shape used by GoTrue-compatible servers. Both spellings occur
/// depending on the endpoint.
#[derive(Deserialize)]
struct UpstreamErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
}

/// HTTP client for the identity service.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl IdentityClient {
    /// Build a client from validated configuration.
    pub fn new(config: &crate::config::IdentityConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base: ensure_trailing_slash(config.url.clone()),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str, grant_type: Option<&str>) -> Url {
        let mut url = self.base.join(path).expect("joining a fixed path segment");
        if let Some(grant) = grant_type {
            url.set_query(Some(&format!("grant_type={grant}")));
        }
        url
    }

    /// Exchange email/password credentials for a session.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError> {
        let response = self
            .http
            .post(self.endpoint("token", Some("password")))
            .header("apikey", &self.api_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(response.json().await?),
            reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNAUTHORIZED => Err(IdentityError::InvalidCredentials),
            _ => Err(upstream_error(response).await),
        }
    }

    /// Register a new identity.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, IdentityError> {
        let response = self
            .http
            .post(self.endpoint("signup", None))
            .header("apikey", &self.api_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(response.json().await?),
            reqwest::StatusCode::UNPROCESSABLE_ENTITY => Err(IdentityError::EmailTaken),
            reqwest::StatusCode::BAD_REQUEST => Err(IdentityError::Rejected {
                message: error_message(response).await,
            }),
            _ => Err(upstream_error(response).await),
        }
    }

    /// Rotate a session: trade the refresh token for a fresh token pair.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, IdentityError> {
        let response = self
            .http
            .post(self.endpoint("token", Some("refresh_token")))
            .header("apikey", &self.api_key)
            .json(&RefreshGrant { refresh_token })
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(response.json().await?),
            reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNAUTHORIZED => Err(IdentityError::InvalidCredentials),
            _ => Err(upstream_error(response).await),
        }
    }

    /// Revoke the session behind an access token.
    #[instrument(skip(self, access_token))]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .http
            .post(self.endpoint("logout", None))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(upstream_error(response).await)
        }
    }
}

async fn error_message(response: reqwest::Response) -> String {
    match response.json::<UpstreamErrorBody>().await {
        Ok(body) => body
            .error_description
            .or(body.msg)
            .unwrap_or_else(|| "request rejected".to_string()),
        Err(_) => "request rejected".to_string(),
    }
}

async fn upstream_error(response: reqwest::Response) -> IdentityError {
    let status = response.status().as_u16();
    let message = error_message(response).await;
    IdentityError::Upstream { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> IdentityClient {
        crate::test_utils::install_crypto_provider();
        IdentityClient {
            http: reqwest::Client::new(),
            base: ensure_trailing_slash(Url::parse(&server.uri()).unwrap()),
            api_key: "anon-key".to_string(),
        }
    }

    fn session_body(user_id: Uuid) -> serde_json::Value {
        json!({
            "access_token": "jwt-access",
            "refresh_token": "opaque-refresh",
            "expires_in": 3600,
            "user": { "id": user_id, "email": "reader@example.com" }
        })
    }

    #[tokio::test]
    async fn sign_in_parses_token_pair() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body(user_id)))
            .mount(&server)
            .await;

        let pair = client_for(&server).sign_in("reader@example.com", "hunter2").await.unwrap();
        assert_eq!(pair.access_token, "jwt-access");
        assert_eq!(pair.user.id, user_id);
        assert_eq!(pair.expires_in, 3600);
    }

    #[tokio::test]
    async fn sign_in_maps_bad_request_to_invalid_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).sign_in("reader@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
    }

    #[tokio::test]
    async fn sign_up_with_autoconfirm_returns_session() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body(user_id)))
            .mount(&server)
            .await;

        let outcome = client_for(&server).sign_up("reader@example.com", "hunter2").await.unwrap();
        assert_eq!(outcome.user().id, user_id);
        assert!(outcome.into_session().is_some());
    }

    #[tokio::test]
    async fn sign_up_without_session_returns_user_only() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/signup"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": user_id, "email": "reader@example.com" })),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server).sign_up("reader@example.com", "hunter2").await.unwrap();
        assert_eq!(outcome.user().id, user_id);
        assert!(outcome.into_session().is_none());
    }

    #[tokio::test]
    async fn sign_up_maps_duplicate_email() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/signup"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "msg": "User already registered"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).sign_up("reader@example.com", "hunter2").await.unwrap_err();
        assert!(matches!(err, IdentityError::EmailTaken));
    }

    #[tokio::test]
    async fn refresh_parses_rotated_pair() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body(user_id)))
            .mount(&server)
            .await;

        let pair = client_for(&server).refresh("opaque-refresh").await.unwrap();
        assert_eq!(pair.refresh_token, "opaque-refresh");
    }

    #[tokio::test]
    async fn sign_out_succeeds_on_no_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        client_for(&server).sign_out("jwt-access").await.unwrap();
    }
}
