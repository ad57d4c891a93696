//! # inkstand: Access Gateway for the Inkstand Publishing Platform
//!
//! `inkstand` is the web gateway fronting a publishing platform: an author
//! dashboard, an admin console, and a public bookstore, all served as a
//! single-page application. The gateway's job is deciding, for every inbound
//! request, whether the caller may see the page they asked for - and where to
//! send them if not.
//!
//! ## Overview
//!
//! The platform delegates the heavy lifting to two external services: an
//! identity service (a GoTrue-compatible auth server) owns credentials and
//! session issuance, and a data service owns row storage, including the
//! `profiles` table that extends each identity with an `account_type`
//! (`reader` or `author`) and an optional `admin` role. The gateway holds no
//! state of its own; it composes those two services into a per-request access
//! control pipeline.
//!
//! ### Request Flow
//!
//! Every request passes through the route guard before path matching:
//!
//! 1. **Session resolution** - the session cookie pair is verified locally
//!    against the identity service's JWT secret. An expired access token is
//!    transparently refreshed through the identity service, and the rotated
//!    cookies are mirrored onto whatever response ultimately goes out.
//! 2. **Classification** - the path is mapped to an access category. The
//!    public author listing (`/authors...`) is explicitly exempted before the
//!    protected author workspace prefix (`/author...`) is considered, because
//!    naive prefix matching conflates the two.
//! 3. **Decision** - a pure decision table combines category, session state,
//!    and profile fields into allow-or-redirect. Missing or unfetchable
//!    profiles degrade to the least-privileged outcome (reader), never to
//!    elevated access.
//! 4. **Response** - pass-throughs reach the JSON API or the embedded SPA
//!    assets; redirects point at the login page (with a `redirect` parameter
//!    preserving the destination), the caller's role home, or the landing
//!    page with `error=unauthorized`.
//!
//! Requests that pass the guard are served either by the JSON API (`/auth/*`
//! for session flows, `/api/v1/*` for profiles) or by the embedded frontend
//! assets with an SPA fallback.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use inkstand::{Application, Config, telemetry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = inkstand::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
mod openapi;
pub mod profiles;
mod static_assets;
pub mod telemetry;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::auth::identity::IdentityClient;
use crate::auth::middleware::route_guard;
use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::profiles::ProfileStore;

use axum::http::HeaderValue;
use axum::{
    Router, ServiceExt, http,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::UserId;

/// Application state shared across all request handlers.
///
/// Everything here is cheap to clone: the config is plain data and both
/// clients wrap an inner `reqwest::Client` handle. The state is built once at
/// startup from validated configuration and injected everywhere - there are
/// no lazily-initialized globals.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub identity: IdentityClient,
    pub profiles: ProfileStore,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// This constructs the Axum router with:
/// - Authentication routes (signup, login, logout, session probe)
/// - Profile routes (read, author onboarding)
/// - OpenAPI documentation at `/docs`
/// - Embedded static asset serving with SPA fallback
/// - CORS and tracing middleware
///
/// The route guard itself is NOT part of this router: it must run before
/// path matching, so it is layered around the router in
/// [`Application::serve`].
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Session flows, at root level next to the pages they serve
    let auth_routes = Router::new()
        .route("/auth/signup", post(api::handlers::auth::signup))
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/logout", post(api::handlers::auth::logout))
        .route("/auth/session", get(api::handlers::auth::get_session))
        .with_state(state.clone());

    // JSON API routes
    let api_routes = Router::new()
        .route(
            "/profiles/me",
            get(api::handlers::profiles::get_my_profile).patch(api::handlers::profiles::update_my_profile),
        )
        .with_state(state.clone());

    // Everything unmatched is the frontend: embedded assets, then the SPA
    // shell for client-routed paths
    let fallback = get(api::handlers::static_assets::serve_embedded_asset);

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .fallback_service(fallback);

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the service clients from
///    validated configuration and assembles the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let identity = IdentityClient::new(&config.identity)?;
        let profiles = ProfileStore::new(&config.profile_store)?;

        let app_state = AppState::builder()
            .config(config.clone())
            .identity(identity)
            .profiles(profiles)
            .build();

        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            app_state,
            config,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Inkstand gateway listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Apply the route guard before path matching so page routes served
        // by the SPA fallback are covered too
        let middleware = from_fn_with_state(self.app_state, route_guard);
        let service = middleware.layer(self.router);

        axum::serve(listener, service.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::test_utils::{create_test_config, create_test_server};
    use wiremock::MockServer;

    #[tokio::test]
    async fn healthz_is_served_and_unguarded() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;
        let server = create_test_server(create_test_config(&identity.uri(), &profiles.uri())).await;

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "OK");
    }

    #[tokio::test]
    async fn unknown_paths_serve_the_spa_shell() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;
        let server = create_test_server(create_test_config(&identity.uri(), &profiles.uri())).await;

        let response = server.get("/bookstore").await;
        response.assert_status_ok();
        assert!(response.text().contains("<div id=\"root\">"));
    }
}
