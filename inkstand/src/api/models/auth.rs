//! API request/response models for authentication.

use axum::Json;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::identity::IdentityUser;
use crate::profiles::Profile;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

/// The session as the frontend sees it: identity, profile, and the landing
/// path computed from the profile (used to honor a pending `redirect`
/// parameter after login).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionEnvelope {
    pub user: IdentityUser,
    pub profile: Option<Profile>,
    /// Role-home path: `/admin`, `/author`, or `/bookstore`.
    pub home: String,
}

/// Signup acknowledgement. `session` is absent when the identity service
/// requires email confirmation before issuing tokens.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupEnvelope {
    pub user: IdentityUser,
    pub profile: Profile,
    pub session: Option<SessionEnvelope>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogoutEnvelope {
    pub message: String,
}

/// A JSON body plus the `Set-Cookie` headers that persist (or clear) the
/// session in the browser.
#[derive(Debug)]
pub struct WithSessionCookies<T> {
    pub body: T,
    pub cookies: Vec<String>,
}

impl<T: Serialize> IntoResponse for WithSessionCookies<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        for cookie in self.cookies {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

pub type LoginResponse = WithSessionCookies<SessionEnvelope>;
pub type SignupResponse = WithSessionCookies<SignupEnvelope>;
pub type LogoutResponse = WithSessionCookies<LogoutEnvelope>;
