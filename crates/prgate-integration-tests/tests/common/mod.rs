//! Common test utilities for prgate integration tests
//!
//! This module provides:
//! - The App key pair fixture and credential builders
//! - A wiremock matcher that verifies app assertions with the public key
//! - Helpers that mount a fake API: installation lookup, token exchange and
//!   paginated collections

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use prgate_github::auth::{AppId, ApplicationCredential, StaticPrivateKey};
use prgate_github::client::{ClientConfig, GitHubClient};
use serde::Deserialize;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const APP_ID: &str = "123456";
pub const APP_KEY_PEM: &str = include_str!("../fixtures/app_key.pem");
pub const APP_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/app_key.pub.pem");

pub const REPOSITORY_PATH: &str = "/repos/octo/widgets";
pub const TOKEN_PATH: &str = "/app/installations/42/access_tokens";
pub const FILES_PATH: &str = "/repos/octo/widgets/pulls/7/files";
pub const INSTALLATION_TOKEN: &str = "ghs_integration";

// ============================================================================
// Credentials
// ============================================================================

#[allow(dead_code)]
pub fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(ClientConfig::new("prgate-integration/0.1").with_github_api_url(server.uri()))
        .expect("client should build")
}

#[allow(dead_code)]
pub fn app_credential() -> Arc<ApplicationCredential> {
    Arc::new(ApplicationCredential::new(
        AppId::new(APP_ID).expect("valid app id"),
        Arc::new(StaticPrivateKey::new(APP_KEY_PEM)),
    ))
}

#[derive(Deserialize)]
struct Claims {
    iss: String,
    iat: i64,
    exp: i64,
}

/// Matches requests whose `Authorization` is `Bearer <assertion>` signed by
/// the fixture key for [`APP_ID`].
pub struct ValidAppAssertion;

impl Match for ValidAppAssertion {
    fn matches(&self, request: &Request) -> bool {
        let Some(token) = request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
        else {
            return false;
        };

        let Ok(key) = DecodingKey::from_rsa_pem(APP_PUBLIC_KEY_PEM.as_bytes()) else {
            return false;
        };

        decode::<Claims>(token, &key, &Validation::new(Algorithm::RS256))
            .map(|data| data.claims.iss == APP_ID && data.claims.iat < data.claims.exp)
            .unwrap_or(false)
    }
}

// ============================================================================
// Fake API
// ============================================================================

/// Mount the installation lookup for `octo/widgets` and its token exchange,
/// each expected exactly `times` times.
#[allow(dead_code)]
pub async fn mount_installation(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{}/installation", REPOSITORY_PATH)))
        .and(ValidAppAssertion)
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 42,
            "app_id": 123456,
            "access_tokens_url": format!("{}{}", server.uri(), TOKEN_PATH)
        })))
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(ValidAppAssertion)
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": INSTALLATION_TOKEN,
            "expires_at": "2030-01-01T00:00:00Z"
        })))
        .expect(times)
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub fn repository_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), REPOSITORY_PATH)
}

#[allow(dead_code)]
pub fn files_page_url(server: &MockServer, page: usize) -> String {
    format!("{}{}?page={}", server.uri(), FILES_PATH, page)
}

/// Mount `pages` as a paginated collection at [`FILES_PATH`].
///
/// Each page but the last links to its successor and to the last page.
/// `expected[i]` is how many times page `i + 1` must be requested.
#[allow(dead_code)]
pub async fn mount_pages(server: &MockServer, pages: &[serde_json::Value], expected: &[u64]) {
    let count = pages.len();
    for (index, body) in pages.iter().enumerate() {
        let page = index + 1;
        let mut response = ResponseTemplate::new(200)
            .insert_header("x-ratelimit-limit", "5000")
            .insert_header("x-ratelimit-remaining", "4000")
            .insert_header("x-ratelimit-reset", "1900000000")
            .set_body_json(body.clone());
        if page < count {
            let link = format!(
                "<{}>; rel=\"next\", <{}>; rel=\"last\"",
                files_page_url(server, page + 1),
                files_page_url(server, count)
            );
            response = response.insert_header("link", link.as_str());
        }

        Mock::given(method("GET"))
            .and(path(FILES_PATH))
            .and(query_param("page", page.to_string()))
            .respond_with(response)
            .expect(expected.get(index).copied().unwrap_or(1))
            .mount(server)
            .await;
    }
}

/// A files-endpoint element.
#[allow(dead_code)]
pub fn file(filename: &str) -> serde_json::Value {
    serde_json::json!({
        "sha": "bbcd538c8e72b8c175046e27cc8f907076331401",
        "filename": filename,
        "status": "modified",
        "additions": 3,
        "deletions": 1,
        "changes": 4
    })
}
