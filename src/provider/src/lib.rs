// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Management of PostgreSQL role attributes on pre-existing roles.
//!
//! The provider connects to one PostgreSQL database, either directly or
//! through Cloud SQL, and exposes five resources that each govern a
//! single attribute of an existing role: BYPASSRLS, REPLICATION,
//! CONNECTION LIMIT, `statement_timeout`, and `pgaudit.log`. Roles are
//! never created or dropped here; every mutation is an `ALTER ROLE`,
//! and deleting a resource merely resets its attribute to the
//! PostgreSQL default.
//!
//! [`Provider::configure`] turns a validated provider block into the
//! connection factory all resources share; each resource operation then
//! opens one connection, runs one statement or query, and returns.

mod config;
mod diagnostics;
mod error;
mod resources;
mod schema;

pub use config::{configure, ProviderModel, DEFAULT_DATABASE, DEFAULT_PORT, DEFAULT_SSLMODE};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::ResourceError;
pub use resources::{
    Audit, AuditModel, BypassRls, BypassRlsModel, ConnectionLimit, ConnectionLimitModel,
    Replication, ReplicationModel, RoleResource, StatementTimeout, StatementTimeoutModel,
};
pub use schema::{Attribute, AttributeType, Schema};

pub use pgrole_postgres_util::{Config, ConnectionTarget, PostgresError};

/// The provider: a version tag, a configuration surface, and a
/// registry of resources.
pub struct Provider {
    version: String,
}

impl Provider {
    /// The prefix of every resource type name.
    pub const TYPE_NAME: &'static str = "pgrole";

    /// `version` is the release version, `dev` for local builds.
    pub fn new(version: &str) -> Provider {
        Provider {
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The provider block schema.
    pub fn schema() -> Schema {
        Schema::new(
            "A provider for managing roles' attributes inside a PostgreSQL instance \
             (Cloud SQL or standard).",
            vec![
                // Cloud SQL specific parameters
                Attribute::optional(
                    "project_id",
                    AttributeType::String,
                    "The Google Cloud project ID of the Cloud SQL instance. Required if \
                     using Cloud SQL.",
                ),
                Attribute::optional(
                    "region",
                    AttributeType::String,
                    "The region of the Cloud SQL instance. Required if using Cloud SQL.",
                ),
                Attribute::optional(
                    "instance",
                    AttributeType::String,
                    "The name of the Cloud SQL instance. Required if using Cloud SQL.",
                ),
                // Common parameters
                Attribute::optional(
                    "database",
                    AttributeType::String,
                    "The name of the database to connect to. Defaults to postgres.",
                ),
                Attribute::required(
                    "username",
                    AttributeType::String,
                    "Username for the server connection.",
                ),
                Attribute::optional(
                    "impersonate_service_account",
                    AttributeType::String,
                    "The service account to impersonate when connecting to the database.",
                ),
                // Standard PostgreSQL parameters
                Attribute::optional(
                    "host",
                    AttributeType::String,
                    "The host of the PostgreSQL server. Required if using standard \
                     PostgreSQL.",
                ),
                Attribute::optional(
                    "port",
                    AttributeType::Int64,
                    "The port of the PostgreSQL server. Default is 5432.",
                ),
                Attribute::optional(
                    "password",
                    AttributeType::String,
                    "Password for the server connection. Required if using standard \
                     PostgreSQL.",
                )
                .sensitive(),
                Attribute::optional(
                    "sslmode",
                    AttributeType::String,
                    "SSL mode for the server connection. Default is 'disable'.",
                ),
            ],
        )
    }

    /// Validates the provider block and builds the connection factory
    /// handed to every resource.
    pub fn configure(&self, model: &ProviderModel) -> Result<Config, Diagnostics> {
        config::configure(model)
    }

    /// Instantiates every resource against a configured connection
    /// factory.
    pub fn resources(config: &Config) -> Vec<Box<dyn RoleResource>> {
        vec![
            Box::new(BypassRls::new(config.clone())),
            Box::new(StatementTimeout::new(config.clone())),
            Box::new(ConnectionLimit::new(config.clone())),
            Box::new(Replication::new(config.clone())),
            Box::new(Audit::new(config.clone())),
        ]
    }
}
