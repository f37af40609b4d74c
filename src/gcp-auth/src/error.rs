// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// An error returned by a Google API endpoint.
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

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to read credentials: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid service account key: {0}")]
    InvalidKey(#[from] serde_json::Error),
    #[error("unsupported credential type {0:?}")]
    UnsupportedCredentialType(String),
    #[error("error signing token assertion: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),
    #[error("gcp auth error: transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gcp auth error: api: {0}")]
    Api(#[from] ApiError),
}
