//! Profile handlers: reads and author onboarding.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::profiles::ProfileUpdateRequest,
    auth::session::Session,
    errors::Error,
    profiles::{AccountType, Profile},
};

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/api/v1/profiles/me",
    tag = "profiles",
    responses(
        (status = 200, description = "The caller's profile", body = Profile),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No profile row exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_my_profile(State(state): State<AppState>, session: Session) -> Result<Json<Profile>, Error> {
    let profile = state.profiles.get(session.user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "profile".to_string(),
        id: session.user_id.to_string(),
    })?;

    Ok(Json(profile))
}

/// Update the caller's account type (author onboarding)
#[utoipa::path(
    patch,
    path = "/api/v1/profiles/me",
    request_body = ProfileUpdateRequest,
    tag = "profiles",
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 400, description = "Downgrade not supported"),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_my_profile(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<Profile>, Error> {
    let current = state.profiles.get(session.user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "profile".to_string(),
        id: session.user_id.to_string(),
    })?;

    // Enrolling as an author is self-service and idempotent; going back to a
    // reader account is not offered (published books would be orphaned).
    if current.account_type == AccountType::Author && request.account_type == AccountType::Reader {
        return Err(Error::BadRequest {
            message: "Author accounts cannot be downgraded to reader".to_string(),
        });
    }

    if current.account_type == request.account_type {
        return Ok(Json(current));
    }

    let updated = state.profiles.set_account_type(session.user_id, request.account_type).await?;
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_config, create_test_server, mint_access_token, mock_profile};
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test-secret-key-for-jwt";

    #[test_log::test(tokio::test)]
    async fn profile_endpoints_require_authentication() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;
        let config = create_test_config(&identity.uri(), &profiles.uri());
        let server = create_test_server(config).await;

        let response = server.get("/api/v1/profiles/me").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test_log::test(tokio::test)]
    async fn get_my_profile_returns_the_row() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;
        let user_id = Uuid::new_v4();
        mock_profile(&profiles, user_id, "reader", None).await;

        let config = create_test_config(&identity.uri(), &profiles.uri());
        let access_name = config.auth.session.access_cookie_name.clone();
        let token = mint_access_token(user_id, "reader@example.com", SECRET, 3600);
        let server = create_test_server(config).await;

        let response = server
            .get("/api/v1/profiles/me")
            .add_header("cookie", format!("{access_name}={token}"))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["account_type"], "reader");
    }

    #[test_log::test(tokio::test)]
    async fn reader_can_enroll_as_author() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;
        let user_id = Uuid::new_v4();
        mock_profile(&profiles, user_id, "reader", None).await;

        Mock::given(method("PATCH"))
            .and(path("/profiles"))
            .and(query_param("id", format!("eq.{user_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": user_id, "account_type": "author", "role": null }
            ])))
            .expect(1)
            .mount(&profiles)
            .await;

        let config = create_test_config(&identity.uri(), &profiles.uri());
        let access_name = config.auth.session.access_cookie_name.clone();
        let token = mint_access_token(user_id, "reader@example.com", SECRET, 3600);
        let server = create_test_server(config).await;

        let response = server
            .patch("/api/v1/profiles/me")
            .add_header("cookie", format!("{access_name}={token}"))
            .json(&json!({ "account_type": "author" }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["account_type"], "author");
    }

    #[test_log::test(tokio::test)]
    async fn author_cannot_downgrade_to_reader() {
        let identity = MockServer::start().await;
        let profiles = MockServer::start().await;
        let user_id = Uuid::new_v4();
        mock_profile(&profiles, user_id, "author", None).await;

        let config = create_test_config(&identity.uri(), &profiles.uri());
        let access_name = config.auth.session.access_cookie_name.clone();
        let token = mint_access_token(user_id, "author@example.com", SECRET, 3600);
        let server = create_test_server(config).await;

        let response = server
            .patch("/api/v1/profiles/me")
            .add_header("cookie", format!("{access_name}={token}"))
            .json(&json!({ "account_type": "reader" }))
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
}
