// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `pgrole_connection_limit` resource: CONNECTION LIMIT for an
//! existing role.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use pgrole_postgres_util::Config;

use crate::error::ResourceError;
use crate::resources::{execute, quote_ident, RoleResource};
use crate::schema::{Attribute, AttributeType, Schema};

/// Connection limit value PostgreSQL treats as "no limit", and the
/// initial value of every role.
pub const NO_LIMIT: i32 = -1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionLimitModel {
    pub role: String,
    pub connection_limit: i32,
}

pub struct ConnectionLimit {
    config: Config,
}

impl ConnectionLimit {
    pub const TYPE_NAME: &'static str = "pgrole_connection_limit";

    pub fn new(config: Config) -> ConnectionLimit {
        ConnectionLimit { config }
    }

    pub fn schema() -> Schema {
        Schema::new(
            "Manage CONNECTION LIMIT for an existing role.",
            vec![
                Attribute::required("role", AttributeType::String, "Name of the role."),
                Attribute::required(
                    "connection_limit",
                    AttributeType::Int32,
                    "Value for the connection limit for this role. The initial value in \
                     Postgres for all roles is -1, which means no limit.",
                ),
            ],
        )
    }

    pub async fn create(
        &self,
        plan: &ConnectionLimitModel,
    ) -> Result<ConnectionLimitModel, ResourceError> {
        let sql = sql_set_connection_limit(&plan.role, plan.connection_limit);
        execute(&self.config, "pgrole_connection_limit_create", &sql).await?;
        Ok(plan.clone())
    }

    pub async fn read(
        &self,
        state: &ConnectionLimitModel,
    ) -> Result<ConnectionLimitModel, ResourceError> {
        let client = self.config.connect("pgrole_connection_limit_read").await?;
        let row = client
            .query_opt(
                "SELECT rolconnlimit FROM pg_roles WHERE rolname = $1;",
                &[&state.role],
            )
            .await
            .map_err(|source| ResourceError::Read {
                what: "CONNECTION LIMIT value",
                role: state.role.clone(),
                source,
            })?
            .ok_or_else(|| ResourceError::RoleNotFound {
                role: state.role.clone(),
            })?;
        let connection_limit: i32 = row.get(0);
        debug!(
            role = %state.role,
            got = connection_limit,
            want = state.connection_limit,
            "read CONNECTION LIMIT for role"
        );
        Ok(ConnectionLimitModel {
            role: state.role.clone(),
            connection_limit,
        })
    }

    pub async fn update(
        &self,
        plan: &ConnectionLimitModel,
    ) -> Result<ConnectionLimitModel, ResourceError> {
        let sql = sql_set_connection_limit(&plan.role, plan.connection_limit);
        execute(&self.config, "pgrole_connection_limit_update", &sql).await?;
        Ok(plan.clone())
    }

    /// Resets the role to no connection limit; the role itself
    /// persists.
    pub async fn delete(&self, state: &ConnectionLimitModel) -> Result<(), ResourceError> {
        let sql = sql_set_connection_limit(&state.role, NO_LIMIT);
        execute(&self.config, "pgrole_connection_limit_delete", &sql).await
    }

    pub fn import(role: &str) -> ConnectionLimitModel {
        ConnectionLimitModel {
            role: role.into(),
            connection_limit: NO_LIMIT,
        }
    }
}

#[async_trait]
impl RoleResource for ConnectionLimit {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema()
    }

    async fn create(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: ConnectionLimitModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.create(&plan).await?)?)
    }

    async fn read(&self, state: Value) -> Result<Value, ResourceError> {
        let state: ConnectionLimitModel = serde_json::from_value(state)?;
        Ok(serde_json::to_value(self.read(&state).await?)?)
    }

    async fn update(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: ConnectionLimitModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.update(&plan).await?)?)
    }

    async fn delete(&self, state: Value) -> Result<(), ResourceError> {
        let state: ConnectionLimitModel = serde_json::from_value(state)?;
        self.delete(&state).await
    }

    fn import(&self, role: &str) -> Result<Value, ResourceError> {
        Ok(serde_json::to_value(Self::import(role))?)
    }
}

fn sql_set_connection_limit(role: &str, connection_limit: i32) -> String {
    format!(
        "ALTER ROLE {} CONNECTION LIMIT {};",
        quote_ident(role),
        connection_limit
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_statements() {
        assert_eq!(
            sql_set_connection_limit("reporting", 50),
            "ALTER ROLE \"reporting\" CONNECTION LIMIT 50;"
        );
        assert_eq!(
            sql_set_connection_limit("reporting", NO_LIMIT),
            "ALTER ROLE \"reporting\" CONNECTION LIMIT -1;"
        );
    }

    #[test]
    fn import_seeds_no_limit() {
        let model = ConnectionLimit::import("reporting");
        assert_eq!(model.role, "reporting");
        assert_eq!(model.connection_limit, NO_LIMIT);
    }
}
