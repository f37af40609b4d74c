// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Utilities for reaching PostgreSQL databases hosted on Cloud SQL.
//!
//! Cloud SQL instances are not dialed like ordinary PostgreSQL servers:
//! the client asks the SQL Admin API where the instance lives and for a
//! short-lived client certificate, then speaks the PostgreSQL protocol
//! over a mutually-authenticated TLS session on the server proxy port.
//! This crate owns that exchange; the connection factory in
//! `pgrole-postgres-util` consumes the resolved address and TLS
//! connector it produces.

use std::fmt;
use std::str::FromStr;

mod admin;
mod dialer;

pub use admin::{AdminClient, ApiError, CertBlock, ConnectSettings, EphemeralCert, IpMapping};
pub use dialer::{Dialer, ResolvedInstance, SERVER_PROXY_PORT};

/// Scope required for the SQL Admin API calls this crate makes.
pub const SQL_ADMIN_SCOPE: &str = "https://www.googleapis.com/auth/sqlservice.admin";

/// An error produced while resolving or dialing a Cloud SQL instance.
#[derive(Debug, thiserror::Error)]
pub enum CloudSqlError {
    /// Any other error we bail on.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
    #[error("cloud sql error: transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cloud sql error: api: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    OpenSsl(#[from] openssl::error::ErrorStack),
    #[error(transparent)]
    Tls(#[from] pgrole_tls_util::TlsError),
    #[error("invalid instance connection name {name:?}: expected project:region:instance")]
    InvalidInstanceName { name: String },
    #[error("instance {instance} reports no usable IP address")]
    NoIpAddress { instance: String },
}

/// The fully qualified name of a Cloud SQL instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceConnectionName {
    pub project: String,
    pub region: String,
    pub instance: String,
}

impl InstanceConnectionName {
    pub fn new(project: &str, region: &str, instance: &str) -> InstanceConnectionName {
        InstanceConnectionName {
            project: project.into(),
            region: region.into(),
            instance: instance.into(),
        }
    }
}

impl FromStr for InstanceConnectionName {
    type Err = CloudSqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').collect::<Vec<_>>()[..] {
            [project, region, instance]
                if !project.is_empty() && !region.is_empty() && !instance.is_empty() =>
            {
                Ok(InstanceConnectionName::new(project, region, instance))
            }
            _ => Err(CloudSqlError::InvalidInstanceName { name: s.into() }),
        }
    }
}

impl fmt::Display for InstanceConnectionName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.project, self.region, self.instance)
    }
}
