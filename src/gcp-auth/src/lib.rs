// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Client to obtain Google Cloud OAuth2 access tokens.
//!
//! Tokens are minted from whichever credentials the environment
//! provides: a service account key named by
//! `GOOGLE_APPLICATION_CREDENTIALS` (or the gcloud default credentials
//! file), falling back to the GCE metadata server. A token from any
//! source can additionally be exchanged for one that impersonates a
//! target service account via the IAM Credentials API.
//!
//! Every call to [`TokenSource::token`] performs a fresh exchange;
//! nothing is cached. Callers that connect once per operation get a
//! token whose lifetime comfortably covers the operation.

mod credentials;
mod error;
mod tokens;

pub use credentials::{Credentials, ServiceAccountKey};
pub use error::{ApiError, Error};
pub use tokens::{AccessToken, ImpersonatedTokenSource, TokenSource, CLOUD_PLATFORM_SCOPE};
