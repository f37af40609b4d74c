// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Token sources.
//!
//! A [`TokenSource`] mints an access token from discovered credentials:
//! service account keys are exchanged through the OAuth2 JWT-bearer
//! assertion flow, while workloads on GCE ask the metadata server. An
//! [`ImpersonatedTokenSource`] layers the IAM Credentials
//! `generateAccessToken` exchange on top of either.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::{Credentials, ServiceAccountKey};
use crate::error::{ApiError, Error};

/// Scope that grants access to every Google Cloud API the caller's IAM
/// bindings allow. Required on the base token of an impersonation
/// exchange.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const IAM_CREDENTIALS_URL: &str = "https://iamcredentials.googleapis.com/v1";

// Slack applied when deciding whether a token is still usable, so a
// token never expires mid-operation.
const EXPIRY_SLACK_SECONDS: i64 = 30;

/// A short-lived OAuth2 access token.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at - chrono::Duration::seconds(EXPIRY_SLACK_SECONDS) <= Utc::now()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Mints access tokens from ambient credentials.
#[derive(Clone, Debug)]
pub struct TokenSource {
    client: reqwest::Client,
    credentials: Credentials,
    scopes: Vec<String>,
}

impl TokenSource {
    pub fn new(credentials: Credentials, scopes: &[&str]) -> TokenSource {
        let client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .expect("must build Client");
        TokenSource {
            client,
            credentials,
            scopes: scopes.iter().map(|s| (*s).into()).collect(),
        }
    }

    /// Fetches a fresh access token. Nothing is cached between calls.
    pub async fn token(&self) -> Result<AccessToken, Error> {
        match &self.credentials {
            Credentials::ServiceAccount(key) => self.token_from_key(key).await,
            Credentials::MetadataServer => self.token_from_metadata().await,
        }
    }

    async fn token_from_key(&self, key: &ServiceAccountKey) -> Result<AccessToken, Error> {
        let now = Utc::now();
        let claims = AssertionClaims::new(key, &self.scopes, now);
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.private_key_id.clone());
        let assertion = jsonwebtoken::encode(
            &header,
            &claims,
            &EncodingKey::from_rsa_pem(key.private_key.as_bytes())?,
        )?;
        debug!(client_email = %key.client_email, "exchanging service account assertion");
        let res: TokenResponse = send(
            self.client
                .post(&key.token_uri)
                .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)]),
        )
        .await?;
        Ok(res.into_access_token(now))
    }

    async fn token_from_metadata(&self) -> Result<AccessToken, Error> {
        let now = Utc::now();
        debug!("requesting access token from metadata server");
        let res: TokenResponse = send(
            self.client
                .get(METADATA_TOKEN_URL)
                .header("Metadata-Flavor", "Google")
                .query(&[("scopes", self.scopes.join(","))]),
        )
        .await?;
        Ok(res.into_access_token(now))
    }

    fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Exchanges tokens from a base source for tokens that act as a target
/// service account.
///
/// The base token must carry [`CLOUD_PLATFORM_SCOPE`]; the minted token
/// carries the scopes requested here. The caller's principal needs the
/// Service Account Token Creator role on the target.
#[derive(Clone, Debug)]
pub struct ImpersonatedTokenSource {
    base: TokenSource,
    target_principal: String,
    scopes: Vec<String>,
}

impl ImpersonatedTokenSource {
    pub fn new(base: TokenSource, target_principal: &str, scopes: &[&str]) -> Self {
        ImpersonatedTokenSource {
            base,
            target_principal: target_principal.into(),
            scopes: scopes.iter().map(|s| (*s).into()).collect(),
        }
    }

    pub async fn token(&self) -> Result<AccessToken, Error> {
        let base = self.base.token().await?;
        debug!(target = %self.target_principal, "impersonating service account");
        let url = format!(
            "{}/projects/-/serviceAccounts/{}:generateAccessToken",
            IAM_CREDENTIALS_URL, self.target_principal
        );
        let res: GenerateAccessTokenResponse = send(
            self.base
                .client()
                .post(&url)
                .bearer_auth(&base.token)
                .json(&GenerateAccessTokenRequest {
                    scope: &self.scopes,
                    lifetime: "3600s",
                }),
        )
        .await?;
        Ok(AccessToken {
            token: res.access_token,
            expires_at: res.expire_time,
        })
    }
}

async fn send<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> Result<T, Error> {
    let res = req.send().await?;
    let status = res.status();
    if status.is_success() {
        Ok(res.json().await?)
    } else {
        Err(Error::Api(ApiError {
            status_code: status,
            messages: vec![res.text().await?],
        }))
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl<'a> AssertionClaims<'a> {
    fn new(key: &'a ServiceAccountKey, scopes: &[String], now: DateTime<Utc>) -> Self {
        AssertionClaims {
            iss: &key.client_email,
            scope: scopes.join(" "),
            aud: &key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + 3600,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl TokenResponse {
    fn into_access_token(self, issued_at: DateTime<Utc>) -> AccessToken {
        AccessToken {
            token: self.access_token,
            expires_at: issued_at + chrono::Duration::seconds(self.expires_in),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAccessTokenRequest<'a> {
    scope: &'a [String],
    lifetime: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAccessTokenResponse {
    access_token: String,
    expire_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> ServiceAccountKey {
        ServiceAccountKey::from_json(
            r#"{
                "type": "service_account",
                "project_id": "my-project",
                "private_key_id": "abc123",
                "private_key": "unused",
                "client_email": "robot@my-project.iam.gserviceaccount.com",
                "token_uri": "https://oauth2.googleapis.com/token"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn assertion_claims_shape() {
        let key = test_key();
        let scopes = vec!["scope-a".to_string(), "scope-b".to_string()];
        let now = Utc::now();
        let claims = AssertionClaims::new(&key, &scopes, now);
        assert_eq!(claims.iss, key.client_email);
        assert_eq!(claims.aud, key.token_uri);
        assert_eq!(claims.scope, "scope-a scope-b");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_response_expiry() {
        let res: TokenResponse = serde_json::from_str(
            r#"{"access_token": "ya29.abc", "expires_in": 3599, "token_type": "Bearer"}"#,
        )
        .unwrap();
        let now = Utc::now();
        let token = res.into_access_token(now);
        assert_eq!(token.token, "ya29.abc");
        assert_eq!(token.expires_at, now + chrono::Duration::seconds(3599));
        assert!(!token.is_expired());
    }

    #[test]
    fn generate_access_token_response() {
        let res: GenerateAccessTokenResponse = serde_json::from_str(
            r#"{"accessToken": "ya29.xyz", "expireTime": "2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(res.access_token, "ya29.xyz");
        assert_eq!(res.expire_time.timestamp(), 1_767_225_600);
    }

    #[test]
    fn stale_token_is_expired() {
        let token = AccessToken {
            token: "t".into(),
            expires_at: Utc::now() - chrono::Duration::seconds(1),
        };
        assert!(token.is_expired());
    }

    #[test]
    fn debug_redacts_token() {
        let token = AccessToken {
            token: "secret".into(),
            expires_at: Utc::now(),
        };
        assert!(!format!("{:?}", token).contains("secret"));
    }
}
