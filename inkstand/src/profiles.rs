//! Profile store client.
//!
//! Profiles are rows owned by the platform's data service and exposed through
//! its REST row interface. The gateway never opens a database connection of
//! its own: it reads (and, at sign-up, creates) profile rows over HTTP using
//! the service key.
//!
//! A profile extends an identity with two fields the route guard cares about:
//!
//! - `account_type`: `reader` (default at sign-up) or `author`
//! - `role`: `admin` or absent
//!
//! At most one profile exists per user id; the row store enforces this with a
//! primary key on `id`.

use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;
use utoipa::ToSchema;

use crate::types::{UserId, abbrev_uuid};

/// Whether an account is a plain reader or an enrolled author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Reader,
    Author,
}

/// Elevated role attached to a profile. Absent for almost all users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    Admin,
}

/// A profile row as stored by the data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    /// Same value as the identity service's user id.
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub account_type: AccountType,
    pub role: Option<ProfileRole>,
}

/// Errors talking to the profile store.
///
/// The route guard never surfaces these: a failed lookup degrades to "no
/// profile", which the decision engine treats as a reader with no role. The
/// JSON API handlers do surface them (as 502s).
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile store request failed")]
    Transport(#[from] reqwest::Error),

    #[error("profile store returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// A write that should have returned the row came back empty.
    #[error("profile row missing from response")]
    Missing,
}

/// HTTP client for the data service's `profiles` rows.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    http: reqwest::Client,
    base: Url,
    service_key: String,
}

impl ProfileStore {
    /// Build a client from validated configuration.
    pub fn new(config: &crate::config::ProfileStoreConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base: ensure_trailing_slash(config.url.clone()),
            service_key: config.service_key.clone(),
        })
    }

    fn rows_url(&self) -> Url {
        // Base is normalized with a trailing slash in the constructor, so join
        // cannot fail for a plain segment.
        self.base.join("profiles").expect("joining a fixed path segment")
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Fetch the profile for a user. `Ok(None)` means no row exists.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)))]
    pub async fn get(&self, user_id: UserId) -> Result<Option<Profile>, ProfileError> {
        let mut url = self.rows_url();
        url.set_query(Some(&format!("id=eq.{user_id}&limit=1")));

        let response = self.authed(self.http.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let mut rows: Vec<Profile> = response.json().await?;
        Ok(rows.pop())
    }

    /// Create the default profile row for a freshly signed-up user.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)))]
    pub async fn create(&self, user_id: UserId, account_type: AccountType) -> Result<Profile, ProfileError> {
        let row = Profile {
            id: user_id,
            account_type,
            role: None,
        };

        let response = self
            .authed(self.http.post(self.rows_url()))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let mut rows: Vec<Profile> = response.json().await?;
        rows.pop().ok_or(ProfileError::Missing)
    }

    /// Change a profile's account type. `role` is deliberately not writable
    /// through this client; it is administered directly in the data service.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)))]
    pub async fn set_account_type(&self, user_id: UserId, account_type: AccountType) -> Result<Profile, ProfileError> {
        let mut url = self.rows_url();
        url.set_query(Some(&format!("id=eq.{user_id}")));

        let response = self
            .authed(self.http.patch(url))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "account_type": account_type }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let mut rows: Vec<Profile> = response.json().await?;
        rows.pop().ok_or(ProfileError::Missing)
    }
}

async fn upstream_error(response: reqwest::Response) -> ProfileError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    ProfileError::Upstream { status, message }
}

pub(crate) fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    url
}
