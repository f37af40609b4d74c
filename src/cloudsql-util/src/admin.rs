// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A minimal SQL Admin API client.
//!
//! Only the two endpoints needed to dial an instance are implemented:
//! `connectSettings`, which reports where the instance listens and the
//! certificate authority its server certificate chains to, and
//! `generateEphemeralCert`, which signs a client certificate for a
//! caller-supplied public key.

use std::fmt;
use std::time::Duration;

use pgrole_gcp_auth::AccessToken;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{CloudSqlError, InstanceConnectionName};

const DEFAULT_API_BASE: &str = "https://sqladmin.googleapis.com";

/// An error returned by the SQL Admin API.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// The HTTP status code.
    pub status_code: StatusCode,
    /// A detailed message about the error conditions.
    pub messages: Vec<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (status {})",
            self.messages.join(","),
            self.status_code
        )
    }
}

impl std::error::Error for ApiError {}

/// Client for the SQL Admin API.
#[derive(Clone, Debug)]
pub struct AdminClient {
    inner: reqwest::Client,
    api_base: Url,
}

impl Default for AdminClient {
    fn default() -> Self {
        AdminClient::new()
    }
}

impl AdminClient {
    pub fn new() -> AdminClient {
        let inner = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .expect("must build Client");
        AdminClient {
            inner,
            api_base: DEFAULT_API_BASE.parse().expect("statically valid URL"),
        }
    }

    /// Points the client at a different API endpoint. Used by tests.
    pub fn with_api_base(mut self, api_base: Url) -> AdminClient {
        self.api_base = api_base;
        self
    }

    /// Fetches the connection metadata for an instance.
    pub async fn connect_settings(
        &self,
        token: &AccessToken,
        instance: &InstanceConnectionName,
    ) -> Result<ConnectSettings, CloudSqlError> {
        debug!(instance = %instance, "fetching connect settings");
        let url = format!(
            "{}sql/v1beta4/projects/{}/instances/{}/connectSettings",
            self.api_base, instance.project, instance.instance
        );
        self.send(self.inner.get(&url).bearer_auth(&token.token))
            .await
    }

    /// Asks the instance's CA to sign a client certificate for
    /// `public_key` (a PEM SubjectPublicKeyInfo block).
    ///
    /// When `access_token` is set the certificate is additionally bound
    /// to that token's principal, which lets the server authenticate
    /// the session through IAM instead of a database password.
    pub async fn generate_ephemeral_cert(
        &self,
        token: &AccessToken,
        instance: &InstanceConnectionName,
        public_key: &str,
        access_token: Option<&str>,
    ) -> Result<EphemeralCert, CloudSqlError> {
        debug!(instance = %instance, iam = access_token.is_some(), "minting ephemeral certificate");
        let url = format!(
            "{}sql/v1beta4/projects/{}/instances/{}:generateEphemeralCert",
            self.api_base, instance.project, instance.instance
        );
        let res: GenerateEphemeralCertResponse = self
            .send(
                self.inner
                    .post(&url)
                    .bearer_auth(&token.token)
                    .json(&GenerateEphemeralCertRequest {
                        public_key,
                        access_token,
                    }),
            )
            .await?;
        Ok(res.ephemeral_cert)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, CloudSqlError> {
        let res = req.send().await?;
        let status = res.status();
        if status.is_success() {
            Ok(res.json().await?)
        } else {
            Err(CloudSqlError::Api(ApiError {
                status_code: status,
                messages: vec![res.text().await?],
            }))
        }
    }
}

/// The subset of the `connectSettings` response this crate consumes.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectSettings {
    #[serde(default)]
    pub ip_addresses: Vec<IpMapping>,
    pub server_ca_cert: CertBlock,
    #[serde(default)]
    pub database_version: Option<String>,
}

impl ConnectSettings {
    /// The address to dial: the primary public address when the
    /// instance has one, otherwise whatever address is listed first.
    pub fn preferred_address(&self) -> Option<&str> {
        self.ip_addresses
            .iter()
            .find(|ip| ip.kind == "PRIMARY")
            .or_else(|| self.ip_addresses.first())
            .map(|ip| ip.ip_address.as_str())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpMapping {
    #[serde(rename = "type")]
    pub kind: String,
    pub ip_address: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertBlock {
    pub cert: String,
}

/// A client certificate minted by `generateEphemeralCert`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemeralCert {
    pub cert: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateEphemeralCertRequest<'a> {
    public_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateEphemeralCertResponse {
    ephemeral_cert: EphemeralCert,
}
