// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Provider configuration.
//!
//! The provider block accepts two mutually exclusive sets of
//! attributes, selected by the presence of `host`: a standard
//! PostgreSQL connection (`host`, `port`, `password`, `sslmode`) or a
//! Cloud SQL connection (`project_id`, `region`, `instance`,
//! `impersonate_service_account`), with `database` and `username`
//! common to both. [`configure`] validates whichever set is active and
//! produces the connection factory every resource shares.

use serde::Deserialize;

use pgrole_postgres_util::Config;

use crate::diagnostics::Diagnostics;

pub const DEFAULT_DATABASE: &str = "postgres";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_SSLMODE: &str = "disable";

/// The raw provider block, before validation. Every attribute is
/// optional here; [`configure`] decides what is missing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProviderModel {
    // Cloud SQL connection parameters
    pub project_id: Option<String>,
    pub region: Option<String>,
    pub instance: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub impersonate_service_account: Option<String>,

    // Standard PostgreSQL connection parameters
    pub host: Option<String>,
    pub port: Option<u16>,
    pub password: Option<String>,
    pub sslmode: Option<String>,
}

/// Validates the provider block and builds the shared connection
/// factory.
///
/// All problems are reported together through the returned
/// [`Diagnostics`], scoped to the attribute that caused each one.
pub fn configure(model: &ProviderModel) -> Result<Config, Diagnostics> {
    let mut diagnostics = Diagnostics::new();

    let database = model
        .database
        .clone()
        .unwrap_or_else(|| DEFAULT_DATABASE.into());
    let port = model.port.unwrap_or(DEFAULT_PORT);
    let sslmode = model
        .sslmode
        .clone()
        .unwrap_or_else(|| DEFAULT_SSLMODE.into());
    let username = model.username.clone().unwrap_or_default();
    let password = model.password.clone().unwrap_or_default();

    if model.username.is_none() {
        diagnostics.add_attribute_error("username", "missing username", "username is required");
    }

    if let Some(host) = model.host.as_deref().filter(|h| !h.is_empty()) {
        // Standard PostgreSQL connection
        if diagnostics.has_errors() {
            return Err(diagnostics);
        }
        let url = format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            username, password, host, port, database, sslmode
        );
        Config::from_url(&url).map_err(|e| {
            diagnostics.add_error("failed to build connection configuration", &e.to_string());
            diagnostics
        })
    } else {
        // Cloud SQL connection
        let mut require = |value: Option<&str>, attribute: &str| -> String {
            match value {
                Some(v) if !v.is_empty() => v.into(),
                _ => {
                    diagnostics.add_attribute_error(
                        attribute,
                        &format!("missing {}", attribute),
                        &format!("{} is required for Cloud SQL connection", attribute),
                    );
                    String::new()
                }
            }
        };
        let project_id = require(model.project_id.as_deref(), "project_id");
        let region = require(model.region.as_deref(), "region");
        let instance = require(model.instance.as_deref(), "instance");
        let database = require(Some(database.as_str()), "database");
        let username = match model.username.as_deref() {
            // A wholly absent username was already reported above.
            None => String::new(),
            some => require(some, "username"),
        };
        if diagnostics.has_errors() {
            return Err(diagnostics);
        }

        let url = format!(
            "gcppostgres://{}@{}/{}/{}/{}",
            username, project_id, region, instance, database
        );
        let config = Config::from_url(&url).map_err(|e| {
            let mut diagnostics = Diagnostics::new();
            diagnostics.add_error("failed to build connection configuration", &e.to_string());
            diagnostics
        })?;
        match &model.impersonate_service_account {
            Some(service_account) if !service_account.is_empty() => config
                .with_impersonation(service_account)
                .map_err(|e| {
                    let mut diagnostics = Diagnostics::new();
                    diagnostics
                        .add_error("failed to build connection configuration", &e.to_string());
                    diagnostics
                }),
            _ => Ok(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use pgrole_postgres_util::ConnectionTarget;

    use super::*;

    fn cloudsql_model() -> ProviderModel {
        ProviderModel {
            project_id: Some("my-project".into()),
            region: Some("europe-west1".into()),
            instance: Some("pg-main".into()),
            database: Some("app".into()),
            username: Some("terraform".into()),
            ..Default::default()
        }
    }

    #[test]
    fn host_selects_standard_connection() {
        let model = ProviderModel {
            username: Some("alice".into()),
            password: Some("hunter2".into()),
            host: Some("db.internal".into()),
            port: Some(6432),
            database: Some("app".into()),
            sslmode: Some("require".into()),
            ..Default::default()
        };
        let config = configure(&model).unwrap();
        assert_eq!(config.target(), &ConnectionTarget::Direct);
        assert_eq!(config.inner().get_user(), Some("alice"));
        assert_eq!(config.inner().get_dbname(), Some("app"));
    }

    #[test]
    fn standard_connection_defaults() {
        let model = ProviderModel {
            username: Some("alice".into()),
            password: Some("pw".into()),
            host: Some("localhost".into()),
            ..Default::default()
        };
        let config = configure(&model).unwrap();
        // database defaults to postgres, port to 5432.
        assert_eq!(config.inner().get_dbname(), Some(DEFAULT_DATABASE));
        assert_eq!(config.inner().get_ports(), &[DEFAULT_PORT]);
    }

    #[test]
    fn absent_host_selects_cloudsql() {
        let config = configure(&cloudsql_model()).unwrap();
        match config.target() {
            ConnectionTarget::CloudSql {
                instance,
                impersonate,
            } => {
                assert_eq!(instance.to_string(), "my-project:europe-west1:pg-main");
                assert!(impersonate.is_none());
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[test]
    fn impersonation_is_plumbed_through() {
        let mut model = cloudsql_model();
        model.impersonate_service_account = Some("robot@my-project.iam.gserviceaccount.com".into());
        let config = configure(&model).unwrap();
        match config.target() {
            ConnectionTarget::CloudSql { impersonate, .. } => {
                assert_eq!(
                    impersonate.as_deref(),
                    Some("robot@my-project.iam.gserviceaccount.com")
                );
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[test]
    fn cloudsql_reports_every_missing_attribute() {
        let model = ProviderModel::default();
        let diagnostics = configure(&model).unwrap_err();
        let mut attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect();
        attributes.sort();
        assert_eq!(
            attributes,
            vec!["instance", "project_id", "region", "username"]
        );
    }

    #[test]
    fn missing_username_is_field_scoped() {
        let model = ProviderModel {
            host: Some("localhost".into()),
            ..Default::default()
        };
        let diagnostics = configure(&model).unwrap_err();
        assert!(diagnostics.has_errors());
        assert_eq!(
            diagnostics.iter().next().unwrap().attribute.as_deref(),
            Some("username")
        );
    }
}
