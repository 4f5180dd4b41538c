//! End-to-end session flows over HTTP.
//!
//! Each test spawns the real router with an in-memory session store and
//! a mock identity-provider key endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use auth_service::repositories::SessionStore;
use auth_test_utils::{IdentityTokenBuilder, MockKeyServer, SessionTokenAssertions, TestAuthServer};
use reqwest::StatusCode;
use serde_json::Value;

struct Harness {
    _keys: MockKeyServer,
    server: TestAuthServer,
    client: reqwest::Client,
}

impl Harness {
    async fn start() -> Result<Self> {
        let keys = MockKeyServer::start().await;
        keys.serve_default_keys().await;
        let server = TestAuthServer::spawn(&keys.keys_url()).await?;

        Ok(Self {
            _keys: keys,
            server,
            client: reqwest::Client::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.url(), path)
    }

    async fn login(&self, user: &str) -> Result<reqwest::Response> {
        let identity_token = IdentityTokenBuilder::new().for_user(user).sign()?;
        Ok(self
            .client
            .post(self.url("/api/v1/login"))
            .bearer_auth(identity_token)
            .send()
            .await?)
    }

    /// Log in and return `(access_token, refresh_token)`.
    async fn login_pair(&self, user: &str) -> Result<(String, String)> {
        let response = self.login(user).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await?;
        Ok((
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        ))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/api/v1/token"))
            .bearer_auth(refresh_token)
            .send()
            .await?)
    }

    async fn get_user(&self, user: &str, access_token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(&format!("/api/v1/user/{user}")))
            .bearer_auth(access_token)
            .send()
            .await?)
    }
}

async fn error_code(response: reqwest::Response) -> Result<String> {
    let body: Value = response.json().await?;
    Ok(body["error"]["code"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn test_login_returns_token_pair() -> Result<()> {
    let h = Harness::start().await?;

    let response = h.login("alice").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await?;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 24 * 3600);
    assert_eq!(body["refresh_expires_in"], 168 * 3600);

    body["access_token"]
        .as_str()
        .unwrap()
        .to_string()
        .assert_session_token()
        .assert_for_subject("alice")
        .assert_lifetime_secs(24 * 3600);
    body["refresh_token"]
        .as_str()
        .unwrap()
        .to_string()
        .assert_session_token()
        .assert_for_subject("alice")
        .assert_lifetime_secs(168 * 3600);

    let record = h.server.store().get_by_id("alice").await?.unwrap();
    assert_eq!(record.access_token, body["access_token"].as_str().unwrap());
    Ok(())
}

#[tokio::test]
async fn test_login_then_logout() -> Result<()> {
    let h = Harness::start().await?;
    let (access, _refresh) = h.login_pair("u1").await?;

    let response = h.get_user("u1", &access).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["active"], true);

    let response = h
        .client
        .put(h.url("/api/v1/user/u1/logout"))
        .bearer_auth(&access)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = h.get_user("u1", &access).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await?, "SESSION_STALE");
    Ok(())
}

#[tokio::test]
async fn test_refresh_token_cannot_revive_logged_out_session() -> Result<()> {
    let h = Harness::start().await?;
    let (access, refresh) = h.login_pair("u1").await?;

    h.client
        .put(h.url("/api/v1/user/u1/logout"))
        .bearer_auth(&access)
        .send()
        .await?;

    let response = h.refresh(&refresh).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await?, "SESSION_STALE");
    Ok(())
}

#[tokio::test]
async fn test_refresh_rotates_tokens() -> Result<()> {
    let h = Harness::start().await?;
    let (old_access, old_refresh) = h.login_pair("u1").await?;

    let response = h.refresh(&old_refresh).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    let new_access = body["access_token"].as_str().unwrap().to_string();
    let new_refresh = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(new_access, old_access);
    assert_ne!(new_refresh, old_refresh);

    // Superseded access token still verifies but is no longer current
    let response = h.get_user("u1", &old_access).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await?, "SESSION_STALE");

    let response = h.get_user("u1", &new_access).await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Refresh tokens are single use
    let response = h.refresh(&old_refresh).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() -> Result<()> {
    let h = Harness::start().await?;
    let (access, _refresh) = h.login_pair("u1").await?;

    let response = h.refresh(&access).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await?, "INVALID_TOKEN");
    Ok(())
}

#[tokio::test]
async fn test_second_login_supersedes_first() -> Result<()> {
    let h = Harness::start().await?;
    let (first_access, _) = h.login_pair("u1").await?;
    let (second_access, _) = h.login_pair("u1").await?;

    assert_eq!(
        h.get_user("u1", &first_access).await?.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        h.get_user("u1", &second_access).await?.status(),
        StatusCode::OK
    );
    Ok(())
}

#[tokio::test]
async fn test_signed_token_without_session_is_stale() -> Result<()> {
    let h = Harness::start().await?;
    let audience = &h.server.config().session_audience;
    let access = h.server.tokens().issue_access(audience, "u7")?;
    let refresh = h.server.tokens().issue_refresh(audience, "u7")?;

    let response = h.get_user("u7", access.token()).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await?, "SESSION_STALE");

    let response = h.refresh(refresh.token()).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await?, "SESSION_STALE");
    Ok(())
}

#[tokio::test]
async fn test_invalid_identity_token_is_unauthorized() -> Result<()> {
    let h = Harness::start().await?;
    let identity_token = IdentityTokenBuilder::new()
        .with_audience("someone-elses-project")
        .sign()?;

    let response = h
        .client
        .post(h.url("/api/v1/login"))
        .bearer_auth(identity_token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(challenge.starts_with("Bearer realm=\"catalog-api\""));
    assert_eq!(error_code(response).await?, "INVALID_TOKEN");

    // No session was created
    assert!(h.server.store().get_by_id("test-user").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_missing_or_malformed_credential_is_bad_request() -> Result<()> {
    let h = Harness::start().await?;

    let response = h.client.get(h.url("/api/v1/user/u1")).send().await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await?, "MALFORMED_CREDENTIAL");

    let response = h
        .client
        .post(h.url("/api/v1/login"))
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h
        .client
        .post(h.url("/api/v1/login"))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_cannot_touch_another_users_session() -> Result<()> {
    let h = Harness::start().await?;
    let (alice_access, _) = h.login_pair("alice").await?;
    h.login_pair("bob").await?;

    let response = h.get_user("bob", &alice_access).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = h
        .client
        .delete(h.url("/api/v1/user/bob"))
        .bearer_auth(&alice_access)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(h.server.store().get_by_id("bob").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_delete_session() -> Result<()> {
    let h = Harness::start().await?;
    let (access, _) = h.login_pair("u1").await?;

    let response = h
        .client
        .delete(h.url("/api/v1/user/u1"))
        .bearer_auth(&access)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(h.server.store().get_by_id("u1").await?.is_none());

    let response = h.get_user("u1", &access).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_key_endpoint_outage_is_internal_error() -> Result<()> {
    let keys = MockKeyServer::start().await;
    keys.fail_with(503).await;
    let server = TestAuthServer::spawn(&keys.keys_url()).await?;

    let identity_token = IdentityTokenBuilder::new().sign()?;
    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/login", server.url()))
        .bearer_auth(identity_token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    // Upstream detail is not exposed
    assert!(!body.to_string().contains("503"));
    Ok(())
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let h = Harness::start().await?;

    let response = h.client.get(h.url("/health")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    Ok(())
}
