//! Pushes the current invite URL to the external web service.
//!
//! The service requires a short-lived key fetched from a separate endpoint.
//! A 403 on the update means the key rotated; the key is re-fetched and the
//! update retried, up to a configured number of refreshes.

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::common::error::SyncError;

/// JSON field holding the key in the credential response.
const CREDENTIAL_FIELD: &str = "DISCORD-BOT-APP-KEY";

/// Header carrying the key on invite updates.
const CREDENTIAL_HEADER: &str = "X-API-KEY";

/// Bearer key for the sync service. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential(String);

impl ApiCredential {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

#[derive(Debug, Deserialize)]
struct CredentialResponse {
    #[serde(rename = "DISCORD-BOT-APP-KEY")]
    key: Option<String>,
}

/// Result of a successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Credential refreshes needed before the update was accepted.
    pub refreshes: u32,
}

/// Client for the invite sync service.
#[derive(Debug, Clone)]
pub struct InviteSync {
    client: reqwest::Client,
    key_url: String,
    update_url: String,
    max_refreshes: u32,
}

impl InviteSync {
    pub fn new(client: reqwest::Client, key_url: String, update_url: String, max_refreshes: u32) -> Self {
        Self {
            client,
            key_url,
            update_url,
            max_refreshes,
        }
    }

    /// Publish `invite_url`, refreshing the credential on 403.
    pub async fn push(&self, invite_url: &str) -> Result<SyncOutcome, SyncError> {
        let mut credential = self.fetch_credential().await?;
        let mut refreshes = 0;

        loop {
            let status = self.post_invite(invite_url, &credential).await?;
            match status {
                StatusCode::CREATED => {
                    info!("Invite saved to sync service");
                    return Ok(SyncOutcome { refreshes });
                }
                StatusCode::FORBIDDEN if refreshes < self.max_refreshes => {
                    warn!("Sync service rejected credential, fetching a fresh one");
                    credential = self.fetch_credential().await?;
                    refreshes += 1;
                }
                StatusCode::FORBIDDEN => {
                    return Err(SyncError::CredentialRejected { refreshes });
                }
                other => {
                    return Err(SyncError::UnexpectedStatus {
                        status: other.as_u16(),
                    });
                }
            }
        }
    }

    async fn fetch_credential(&self) -> Result<ApiCredential, SyncError> {
        let response = self.client.get(&self.key_url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(SyncError::CredentialStatus {
                status: response.status().as_u16(),
            });
        }

        let body: CredentialResponse = response.json().await?;
        match body.key {
            Some(key) if !key.is_empty() => Ok(ApiCredential(key)),
            _ => {
                warn!("Credential response has no {} field", CREDENTIAL_FIELD);
                Err(SyncError::MissingCredential)
            }
        }
    }

    async fn post_invite(&self, invite_url: &str, credential: &ApiCredential) -> Result<StatusCode, SyncError> {
        let response = self
            .client
            .post(&self.update_url)
            .header(CREDENTIAL_HEADER, credential.as_str())
            .json(&json!({ "url": invite_url }))
            .send()
            .await?;
        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INVITE: &str = "https://discord.gg/fresh";

    fn sync(server: &MockServer, max_refreshes: u32) -> InviteSync {
        InviteSync::new(
            reqwest::Client::new(),
            format!("{}/key", server.uri()),
            format!("{}/invite", server.uri()),
            max_refreshes,
        )
    }

    async fn mount_key(server: &MockServer, key: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "DISCORD-BOT-APP-KEY": key })))
            .up_to_n_times(times)
            .expect(times)
            .mount(server)
            .await;
    }

    async fn mount_update(server: &MockServer, key: &str, status: u16, times: u64) {
        Mock::given(method("POST"))
            .and(path("/invite"))
            .and(header(CREDENTIAL_HEADER, key))
            .and(body_json(json!({ "url": INVITE })))
            .respond_with(ResponseTemplate::new(status))
            .up_to_n_times(times)
            .expect(times)
            .mount(server)
            .await;
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = ApiCredential("secret".to_string());
        assert!(!format!("{:?}", credential).contains("secret"));
    }

    #[tokio::test]
    async fn test_created_on_first_try_no_retry() {
        let server = MockServer::start().await;
        mount_key(&server, "k1", 1).await;
        mount_update(&server, "k1", 201, 1).await;

        let outcome = sync(&server, 1).push(INVITE).await.unwrap();

        assert_eq!(outcome, SyncOutcome { refreshes: 0 });
    }

    #[tokio::test]
    async fn test_forbidden_refreshes_once_and_retries() {
        let server = MockServer::start().await;
        mount_key(&server, "stale", 1).await;
        mount_key(&server, "fresh", 1).await;
        mount_update(&server, "stale", 403, 1).await;
        mount_update(&server, "fresh", 201, 1).await;

        let outcome = sync(&server, 1).push(INVITE).await.unwrap();

        assert_eq!(outcome, SyncOutcome { refreshes: 1 });
    }

    #[tokio::test]
    async fn test_forbidden_after_refresh_gives_up() {
        let server = MockServer::start().await;
        mount_key(&server, "stale", 2).await;
        mount_update(&server, "stale", 403, 2).await;

        let result = sync(&server, 1).push(INVITE).await;

        assert!(matches!(result, Err(SyncError::CredentialRejected { refreshes: 1 })));
    }

    #[tokio::test]
    async fn test_zero_refreshes_configured() {
        let server = MockServer::start().await;
        mount_key(&server, "stale", 1).await;
        mount_update(&server, "stale", 403, 1).await;

        let result = sync(&server, 0).push(INVITE).await;

        assert!(matches!(result, Err(SyncError::CredentialRejected { refreshes: 0 })));
    }

    #[tokio::test]
    async fn test_key_endpoint_failure_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let result = sync(&server, 1).push(INVITE).await;

        assert!(matches!(result, Err(SyncError::CredentialStatus { status: 500 })));
    }

    #[tokio::test]
    async fn test_missing_key_field_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "other": "x" })))
            .mount(&server)
            .await;

        let result = sync(&server, 1).push(INVITE).await;

        assert!(matches!(result, Err(SyncError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_other_status_is_not_retried() {
        let server = MockServer::start().await;
        mount_key(&server, "k1", 1).await;
        mount_update(&server, "k1", 500, 1).await;

        let result = sync(&server, 1).push(INVITE).await;

        assert!(matches!(result, Err(SyncError::UnexpectedStatus { status: 500 })));
    }

    /// Address with nothing listening on it.
    fn unreachable_url(path: &str) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}{}", port, path)
    }

    #[tokio::test]
    async fn test_key_endpoint_unreachable_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        let sync = InviteSync::new(
            reqwest::Client::new(),
            unreachable_url("/key"),
            format!("{}/invite", server.uri()),
            1,
        );

        let result = sync.push(INVITE).await;

        assert!(matches!(result, Err(SyncError::Http(_))));
    }

    #[tokio::test]
    async fn test_update_endpoint_unreachable_aborts() {
        let server = MockServer::start().await;
        mount_key(&server, "k1", 1).await;
        let sync = InviteSync::new(
            reqwest::Client::new(),
            format!("{}/key", server.uri()),
            unreachable_url("/invite"),
            1,
        );

        let result = sync.push(INVITE).await;

        assert!(matches!(result, Err(SyncError::Http(_))));
    }

    #[tokio::test]
    async fn test_refetch_failure_after_forbidden_aborts() {
        let server = MockServer::start().await;
        mount_key(&server, "stale", 1).await;
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        mount_update(&server, "stale", 403, 1).await;

        let result = sync(&server, 1).push(INVITE).await;

        assert!(matches!(result, Err(SyncError::CredentialStatus { status: 500 })));
        let posts = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|request| request.method.as_str() == "POST")
            .count();
        assert_eq!(posts, 1);
    }
}
