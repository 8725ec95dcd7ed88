use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::config::defaults::SHEETS_READONLY_SCOPE;
use crate::core::config::settings::SheetsConfig;
use crate::core::errors::RagError;
use crate::llm::http::snippet;

const SERVICE: &str = "google-oauth";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Google service-account credentials exchanged for short-lived access tokens.
///
/// A signed RS256 assertion is posted to the token endpoint; the returned
/// token is reused until shortly before it expires.
pub struct ServiceAccountAuth {
    client: Client,
    email: String,
    key: EncodingKey,
    token_url: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(
        client: Client,
        email: impl Into<String>,
        private_key_pem: &str,
        token_url: impl Into<String>,
        scope: impl Into<String>,
    ) -> Result<Self, RagError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
            RagError::Config(format!("invalid service account private key: {}", e))
        })?;
        Ok(Self {
            client,
            email: email.into(),
            key,
            token_url: token_url.into(),
            scope: scope.into(),
            cached: Mutex::new(None),
        })
    }

    /// `None` unless both the account email and the private key are set.
    pub fn from_config(client: Client, config: &SheetsConfig) -> Result<Option<Self>, RagError> {
        let email = config.service_account_email.as_deref().map(str::trim);
        let key = config.private_key.as_deref().map(str::trim);
        match (email, key) {
            (Some(email), Some(key)) if !email.is_empty() && !key.is_empty() => Self::new(
                client,
                email,
                key,
                config.token_url.clone(),
                SHEETS_READONLY_SCOPE,
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns a cached token, or exchanges a fresh assertion for one.
    pub async fn access_token(&self) -> Result<String, RagError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fetched = self.exchange().await?;
        let lifetime = Duration::from_secs(
            fetched
                .expires_in
                .unwrap_or(ASSERTION_LIFETIME_SECS as u64),
        );
        let value = fetched.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        });
        tracing::debug!("[{}] token refreshed for {}", SERVICE, self.email);
        Ok(value)
    }

    fn assertion(&self) -> Result<String, RagError> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.email.clone(),
            scope: self.scope.clone(),
            aud: self.token_url.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| RagError::Config(format!("failed to sign service account assertion: {}", e)))
    }

    async fn exchange(&self) -> Result<TokenResponse, RagError> {
        let assertion = self.assertion()?;
        let response = self
            .client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| RagError::upstream(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Upstream {
                service: SERVICE,
                status: Some(status.as_u16()),
                message: snippet(&text),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RagError::malformed(SERVICE, e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(RagError::malformed(SERVICE, "empty access_token"));
        }
        Ok(token)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::spawn_mock;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use jsonwebtoken::{DecodingKey, Validation};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub(crate) const TEST_KEY: &str = include_str!("fixtures/service_account_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("fixtures/service_account_pub.pem");
    const EMAIL: &str = "indexer@events.iam.gserviceaccount.com";

    /// Token endpoint that checks the assertion signature and counts exchanges.
    pub(crate) fn token_router(calls: Arc<AtomicUsize>, audience: String) -> Router {
        Router::new()
            .route(
                "/token",
                post(
                    |State((calls, audience)): State<(Arc<AtomicUsize>, String)>,
                     Form(form): Form<HashMap<String, String>>| async move {
                        assert_eq!(
                            form.get("grant_type").map(String::as_str),
                            Some(JWT_BEARER_GRANT)
                        );
                        let mut validation = Validation::new(Algorithm::RS256);
                        validation.set_audience(&[audience.as_str()]);
                        let decoded = jsonwebtoken::decode::<AssertionClaims>(
                            form.get("assertion").map(String::as_str).unwrap_or_default(),
                            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
                            &validation,
                        );
                        let Ok(decoded) = decoded else {
                            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" })));
                        };
                        assert_eq!(decoded.claims.iss, EMAIL);
                        assert_eq!(decoded.claims.scope, SHEETS_READONLY_SCOPE);
                        assert_eq!(decoded.claims.exp - decoded.claims.iat, 3600);
                        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                        (
                            StatusCode::OK,
                            Json(json!({
                                "access_token": format!("ya29.test-{}", n),
                                "expires_in": 3599,
                                "token_type": "Bearer"
                            })),
                        )
                    },
                ),
            )
            .with_state((calls, audience))
    }

    pub(crate) async fn mock_token_endpoint() -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        // Audience must equal the URL the client posts to, known only after binding.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let token_url = format!("http://{}/token", listener.local_addr().unwrap());
        let router = token_router(calls.clone(), token_url.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (token_url, calls)
    }

    #[tokio::test]
    async fn exchanges_signed_assertion_and_caches_token() {
        let (token_url, calls) = mock_token_endpoint().await;
        let auth = ServiceAccountAuth::new(
            Client::new(),
            EMAIL,
            TEST_KEY,
            token_url,
            SHEETS_READONLY_SCOPE,
        )
        .unwrap();

        let first = auth.access_token().await.unwrap();
        let second = auth.access_token().await.unwrap();

        assert_eq!(first, "ya29.test-1");
        assert_eq!(second, "ya29.test-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_is_exchanged_again() {
        let (token_url, calls) = mock_token_endpoint().await;
        let auth = ServiceAccountAuth::new(
            Client::new(),
            EMAIL,
            TEST_KEY,
            token_url,
            SHEETS_READONLY_SCOPE,
        )
        .unwrap();

        auth.access_token().await.unwrap();
        if let Some(token) = auth.cached.lock().await.as_mut() {
            token.refresh_at = Instant::now();
        }
        let refreshed = auth.access_token().await.unwrap();

        assert_eq!(refreshed, "ya29.test-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejected_grant_is_upstream_error() {
        let router = Router::new().route(
            "/token",
            post(|| async { (StatusCode::BAD_REQUEST, "invalid_grant") }),
        );
        let base = spawn_mock(router).await;
        let auth = ServiceAccountAuth::new(
            Client::new(),
            EMAIL,
            TEST_KEY,
            format!("{}/token", base),
            SHEETS_READONLY_SCOPE,
        )
        .unwrap();

        let err = auth.access_token().await.unwrap_err();

        assert!(matches!(
            err,
            RagError::Upstream { status: Some(400), ref message, .. } if message == "invalid_grant"
        ));
    }

    #[test]
    fn garbage_key_is_config_error() {
        let result = ServiceAccountAuth::new(
            Client::new(),
            EMAIL,
            "not a pem",
            "http://localhost/token",
            SHEETS_READONLY_SCOPE,
        );
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn from_config_needs_email_and_key() {
        let partial = SheetsConfig {
            service_account_email: Some(EMAIL.to_string()),
            ..SheetsConfig::default()
        };
        assert!(ServiceAccountAuth::from_config(Client::new(), &partial)
            .unwrap()
            .is_none());

        let full = SheetsConfig {
            service_account_email: Some(EMAIL.to_string()),
            private_key: Some(TEST_KEY.to_string()),
            ..SheetsConfig::default()
        };
        let auth = ServiceAccountAuth::from_config(Client::new(), &full)
            .unwrap()
            .unwrap();
        assert_eq!(auth.email(), EMAIL);
    }
}
