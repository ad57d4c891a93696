//! Shared constructors for tests.
//!
//! Tests run the real router and route guard against `wiremock` stand-ins
//! for the identity service and profile store; nothing external is needed.

use axum::middleware::from_fn_with_state;
use axum::{Router, ServiceExt};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tower::Layer;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::auth::identity::IdentityClient;
use crate::auth::middleware::route_guard;
use crate::auth::session::SessionClaims;
use crate::config::Config;
use crate::profiles::ProfileStore;
use crate::{AppState, build_router};

/// The JWT secret used across tests; `create_test_config` installs it.
pub const TEST_JWT_SECRET: &str = "test-secret-key-for-jwt";

/// Tests build real `reqwest` clients, which need a process-level rustls
/// crypto provider; `main` installs it in production, tests do it here.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// A config pointing at mock identity/profile services.
pub fn create_test_config(identity_url: &str, profile_url: &str) -> Config {
    let mut config = Config::default();
    config.identity.url = Url::parse(identity_url).expect("valid identity url");
    config.identity.api_key = "test-anon-key".to_string();
    config.identity.jwt_secret = Some(TEST_JWT_SECRET.to_string());
    config.profile_store.url = Url::parse(profile_url).expect("valid profile url");
    config.profile_store.service_key = "test-service-key".to_string();
    config.auth.session.cookie_secure = false;
    config.validate().expect("test config should validate");
    config
}

/// Build an `AppState` with real clients against the configured URLs.
pub fn create_test_state(config: Config) -> AppState {
    install_crypto_provider();
    let identity = IdentityClient::new(&config.identity).expect("identity client");
    let profiles = ProfileStore::new(&config.profile_store).expect("profile store");
    AppState::builder()
        .config(config)
        .identity(identity)
        .profiles(profiles)
        .build()
}

/// A test server running the full stack: router plus the route guard applied
/// before path matching, exactly as `Application::serve` wires it.
pub async fn create_test_server(config: Config) -> axum_test::TestServer {
    let state = create_test_state(config);
    let router: Router = build_router(&state).expect("router should build");
    let middleware = from_fn_with_state(state, route_guard);
    let service = middleware.layer(router);
    axum_test::TestServer::new(service.into_make_service()).expect("Failed to create test server")
}

/// Mint an access token the way the identity service would. Pass a negative
/// `ttl_secs` for an expired token (keep it past the 60s validation leeway).
pub fn mint_access_token(user_id: Uuid, email: &str, secret: &str, ttl_secs: i64) -> String {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user_id,
        email: email.to_string(),
        exp: (now + chrono::Duration::seconds(ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).expect("token should encode")
}

/// Mount a profile row on the mock profile store.
pub async fn mock_profile(server: &MockServer, user_id: Uuid, account_type: &str, role: Option<&str>) {
    Mock::given(method("GET"))
        .and(path("/profiles"))
        .and(query_param("id", format!("eq.{user_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": user_id, "account_type": account_type, "role": role }
        ])))
        .mount(server)
        .await;
}
