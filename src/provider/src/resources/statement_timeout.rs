// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `pgrole_statement_timeout` resource: per-role
//! `statement_timeout` setting.
//!
//! Unlike the flags in `pg_roles`, this attribute lives in the role's
//! `rolconfig` array. A role with no entry there runs with the server
//! default, which the resource models as `"0s"`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use pgrole_postgres_util::Config;

use crate::error::ResourceError;
use crate::resources::{execute, quote_ident, RoleResource};
use crate::schema::{Attribute, AttributeType, Schema};

/// The value reported when the role has no `statement_timeout` entry.
pub const UNSET_TIMEOUT: &str = "0s";

static TIMEOUT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+s$").expect("valid regex"));

const ROLCONFIG_PREFIX: &str = "statement_timeout=";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementTimeoutModel {
    pub role: String,
    pub timeout: String,
}

impl StatementTimeoutModel {
    /// Rejects timeout values that are not whole seconds, before any
    /// SQL is issued.
    fn validate(&self) -> Result<(), ResourceError> {
        if TIMEOUT_RE.is_match(&self.timeout) {
            Ok(())
        } else {
            Err(ResourceError::InvalidAttribute {
                attribute: "timeout",
                value: self.timeout.clone(),
                message: "must be an integer followed by \"s\", for example: 100s, 300s",
            })
        }
    }
}

pub struct StatementTimeout {
    config: Config,
}

impl StatementTimeout {
    pub const TYPE_NAME: &'static str = "pgrole_statement_timeout";

    pub fn new(config: Config) -> StatementTimeout {
        StatementTimeout { config }
    }

    pub fn schema() -> Schema {
        Schema::new(
            "Manage statement_timeout for an existing role.",
            vec![
                Attribute::required("role", AttributeType::String, "Name of the role."),
                Attribute::required(
                    "timeout",
                    AttributeType::String,
                    "The timeout value, must be an integer followed by character \"s\", \
                     e.g.: 100s.",
                ),
            ],
        )
    }

    pub async fn create(
        &self,
        plan: &StatementTimeoutModel,
    ) -> Result<StatementTimeoutModel, ResourceError> {
        plan.validate()?;
        let sql = sql_set_statement_timeout(&plan.role, &plan.timeout);
        execute(&self.config, "pgrole_statement_timeout_create", &sql).await?;
        Ok(plan.clone())
    }

    pub async fn read(
        &self,
        state: &StatementTimeoutModel,
    ) -> Result<StatementTimeoutModel, ResourceError> {
        let client = self.config.connect("pgrole_statement_timeout_read").await?;
        let row = client
            .query_opt(
                "SELECT setting
FROM (
    SELECT UNNEST(rolconfig) AS setting
    FROM pg_roles
    WHERE rolname = $1
) t
WHERE setting LIKE 'statement_timeout=%' LIMIT 1;",
                &[&state.role],
            )
            .await
            .map_err(|source| ResourceError::Read {
                what: "statement_timeout value",
                role: state.role.clone(),
                source,
            })?;
        // No matching rolconfig entry means the role runs with the
        // server default.
        let timeout = match row {
            None => UNSET_TIMEOUT.to_string(),
            Some(row) => {
                let setting: String = row.get(0);
                setting
                    .strip_prefix(ROLCONFIG_PREFIX)
                    .unwrap_or(&setting)
                    .to_string()
            }
        };
        debug!(
            role = %state.role,
            got = %timeout,
            want = %state.timeout,
            "read statement_timeout for role"
        );
        Ok(StatementTimeoutModel {
            role: state.role.clone(),
            timeout,
        })
    }

    pub async fn update(
        &self,
        plan: &StatementTimeoutModel,
    ) -> Result<StatementTimeoutModel, ResourceError> {
        plan.validate()?;
        let sql = sql_set_statement_timeout(&plan.role, &plan.timeout);
        execute(&self.config, "pgrole_statement_timeout_update", &sql).await?;
        Ok(plan.clone())
    }

    /// Clears the role's `statement_timeout` entry; the role itself
    /// persists.
    pub async fn delete(&self, state: &StatementTimeoutModel) -> Result<(), ResourceError> {
        let sql = sql_reset_statement_timeout(&state.role);
        execute(&self.config, "pgrole_statement_timeout_delete", &sql).await
    }

    pub fn import(role: &str) -> StatementTimeoutModel {
        StatementTimeoutModel {
            role: role.into(),
            timeout: UNSET_TIMEOUT.into(),
        }
    }
}

#[async_trait]
impl RoleResource for StatementTimeout {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema()
    }

    async fn create(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: StatementTimeoutModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.create(&plan).await?)?)
    }

    async fn read(&self, state: Value) -> Result<Value, ResourceError> {
        let state: StatementTimeoutModel = serde_json::from_value(state)?;
        Ok(serde_json::to_value(self.read(&state).await?)?)
    }

    async fn update(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: StatementTimeoutModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.update(&plan).await?)?)
    }

    async fn delete(&self, state: Value) -> Result<(), ResourceError> {
        let state: StatementTimeoutModel = serde_json::from_value(state)?;
        self.delete(&state).await
    }

    fn import(&self, role: &str) -> Result<Value, ResourceError> {
        Ok(serde_json::to_value(Self::import(role))?)
    }
}

fn sql_set_statement_timeout(role: &str, timeout: &str) -> String {
    format!(
        "ALTER ROLE {} SET statement_timeout = '{}';",
        quote_ident(role),
        timeout
    )
}

fn sql_reset_statement_timeout(role: &str) -> String {
    format!("ALTER ROLE {} RESET statement_timeout;", quote_ident(role))
}
