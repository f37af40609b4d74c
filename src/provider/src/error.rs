// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

use pgrole_postgres_util::PostgresError;

/// An error aborting a single resource operation.
///
/// Operations fail whole: there is no retry and no partial result, and
/// PostgreSQL's statement atomicity means an aborted operation left the
/// database untouched.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to get database connection: {0}")]
    Connection(#[from] PostgresError),
    #[error("failed to execute sql {sql:?}: {source}")]
    Sql {
        sql: String,
        source: tokio_postgres::Error,
    },
    #[error("failed to query {what} for role {role:?}: {source}")]
    Read {
        what: &'static str,
        role: String,
        source: tokio_postgres::Error,
    },
    #[error("role {role:?} does not exist")]
    RoleNotFound { role: String },
    #[error("invalid value {value:?} for {attribute}: {message}")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
        message: &'static str,
    },
    #[error("invalid resource state: {0}")]
    State(#[from] serde_json::Error),
}
