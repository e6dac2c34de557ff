//! reqwest-backed token issuer.
//!
//! `GET` sends the credential set as query parameters, `POST` as a JSON
//! body. The status code and raw body are handed back unchanged; the token
//! manager decides what counts as a usable reply.

use std::time::Duration;

use larkit_core::token::{IssuerResponse, TokenIssuer};
use larkit_types::config::{CredentialConfig, HttpConfig, IssueMethod};
use larkit_types::credential::CredentialSet;
use larkit_types::error::KernelError;
use tracing::debug;
use url::Url;

pub struct HttpTokenIssuer {
    client: reqwest::Client,
    endpoint: Option<String>,
    base_uri: Option<String>,
    method: IssueMethod,
}

impl HttpTokenIssuer {
    /// Build an issuer whose requests are bounded by `http.timeout_secs`.
    pub fn new(credentials: &CredentialConfig, http: &HttpConfig) -> Result<Self, KernelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .build()
            .map_err(|e| KernelError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: credentials.endpoint.clone(),
            base_uri: http.base_uri.clone(),
            method: credentials.method,
        })
    }

    /// Absolute endpoint URL, resolving a relative endpoint against `base_uri`.
    pub fn endpoint_url(&self) -> Result<Url, KernelError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                KernelError::MissingConfiguration("No endpoint for access token request.".into())
            })?;

        let resolved = match &self.base_uri {
            Some(base) => Url::parse(base).and_then(|b| b.join(endpoint)),
            None => Url::parse(endpoint),
        };
        resolved.map_err(|e| {
            KernelError::MissingConfiguration(format!("invalid token endpoint '{endpoint}': {e}"))
        })
    }
}

impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self, credentials: &CredentialSet) -> Result<IssuerResponse, KernelError> {
        let url = self.endpoint_url()?;
        let request = match self.method {
            IssueMethod::Get => self.client.get(url).query(credentials.pairs()),
            IssueMethod::Post => self.client.post(url).json(credentials),
        };

        let response = request
            .send()
            .await
            .map_err(|e| KernelError::Transport(format!("token request failed: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| KernelError::Transport(format!("failed to read token response: {e}")))?;

        debug!(status, body_len = body.len(), "token endpoint responded");
        Ok(IssuerResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    use super::*;

    async fn spawn_issuer() -> String {
        let app = Router::new()
            .route(
                "/cgi-bin/token",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    Json(serde_json::json!({
                        "access_token": format!("get-{}", q.get("appid").cloned().unwrap_or_default()),
                        "expires_in": 7200
                    }))
                }),
            )
            .route(
                "/cgi-bin/stable_token",
                post(|Json(body): Json<serde_json::Value>| async move {
                    Json(serde_json::json!({
                        "access_token": format!("post-{}", body["appid"].as_str().unwrap_or_default()),
                    }))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn credentials() -> CredentialSet {
        CredentialSet::new([("grant_type", "client_credential"), ("appid", "wx1")])
    }

    #[test]
    fn missing_endpoint_is_missing_configuration() {
        let issuer =
            HttpTokenIssuer::new(&CredentialConfig::default(), &HttpConfig::default()).unwrap();
        let err = issuer.endpoint_url().unwrap_err();
        assert!(matches!(err, KernelError::MissingConfiguration(_)));
        assert_eq!(
            err.to_string(),
            "missing configuration: No endpoint for access token request."
        );
    }

    #[test]
    fn relative_endpoint_resolves_against_base_uri() {
        let credentials = CredentialConfig {
            endpoint: Some("cgi-bin/token".into()),
            ..Default::default()
        };
        let http = HttpConfig {
            base_uri: Some("https://api.example.com/".into()),
            ..Default::default()
        };
        let issuer = HttpTokenIssuer::new(&credentials, &http).unwrap();
        assert_eq!(
            issuer.endpoint_url().unwrap().as_str(),
            "https://api.example.com/cgi-bin/token"
        );
    }

    #[tokio::test]
    async fn get_sends_credentials_as_query() {
        let base = spawn_issuer().await;
        let config = CredentialConfig {
            endpoint: Some(format!("{base}/cgi-bin/token")),
            ..Default::default()
        };
        let issuer = HttpTokenIssuer::new(&config, &HttpConfig::default()).unwrap();

        let response = issuer.issue(&credentials()).await.unwrap();
        assert!(response.is_success());
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["access_token"], "get-wx1");
    }

    #[tokio::test]
    async fn post_sends_credentials_as_json() {
        let base = spawn_issuer().await;
        let config = CredentialConfig {
            endpoint: Some(format!("{base}/cgi-bin/stable_token")),
            method: IssueMethod::Post,
            ..Default::default()
        };
        let issuer = HttpTokenIssuer::new(&config, &HttpConfig::default()).unwrap();

        let response = issuer.issue(&credentials()).await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["access_token"], "post-wx1");
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_raised() {
        let base = spawn_issuer().await;
        let config = CredentialConfig {
            endpoint: Some(format!("{base}/nope")),
            ..Default::default()
        };
        let issuer = HttpTokenIssuer::new(&config, &HttpConfig::default()).unwrap();

        let response = issuer.issue(&credentials()).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }
}
