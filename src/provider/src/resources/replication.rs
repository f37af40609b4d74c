// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `pgrole_replication` resource: REPLICATION status for an
//! existing role.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use pgrole_postgres_util::Config;

use crate::error::ResourceError;
use crate::resources::{execute, quote_ident, RoleResource};
use crate::schema::{Attribute, AttributeType, Schema};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationModel {
    pub role: String,
    #[serde(default)]
    pub enabled: bool,
}

pub struct Replication {
    config: Config,
}

impl Replication {
    pub const TYPE_NAME: &'static str = "pgrole_replication";

    pub fn new(config: Config) -> Replication {
        Replication { config }
    }

    pub fn schema() -> Schema {
        Schema::new(
            "Manage REPLICATION status for an existing role.",
            vec![
                Attribute::required("role", AttributeType::String, "Name of the role."),
                Attribute::optional(
                    "enabled",
                    AttributeType::Bool,
                    "Whether to enable REPLICATION for the role.",
                ),
            ],
        )
    }

    pub async fn create(&self, plan: &ReplicationModel) -> Result<ReplicationModel, ResourceError> {
        let sql = if plan.enabled {
            sql_enable_replication(&plan.role)
        } else {
            sql_disable_replication(&plan.role)
        };
        execute(&self.config, "pgrole_replication_create", &sql).await?;
        Ok(plan.clone())
    }

    pub async fn read(&self, state: &ReplicationModel) -> Result<ReplicationModel, ResourceError> {
        let client = self.config.connect("pgrole_replication_read").await?;
        let row = client
            .query_opt(
                "SELECT rolreplication FROM pg_roles WHERE rolname = $1;",
                &[&state.role],
            )
            .await
            .map_err(|source| ResourceError::Read {
                what: "REPLICATION status",
                role: state.role.clone(),
                source,
            })?
            .ok_or_else(|| ResourceError::RoleNotFound {
                role: state.role.clone(),
            })?;
        let enabled: bool = row.get(0);
        debug!(
            role = %state.role,
            got = enabled,
            want = state.enabled,
            "read REPLICATION for role"
        );
        Ok(ReplicationModel {
            role: state.role.clone(),
            enabled,
        })
    }

    pub async fn update(&self, plan: &ReplicationModel) -> Result<ReplicationModel, ResourceError> {
        let sql = if plan.enabled {
            sql_enable_replication(&plan.role)
        } else {
            sql_disable_replication(&plan.role)
        };
        execute(&self.config, "pgrole_replication_update", &sql).await?;
        Ok(plan.clone())
    }

    /// Resets the role to NOREPLICATION; the role itself persists.
    pub async fn delete(&self, state: &ReplicationModel) -> Result<(), ResourceError> {
        let sql = sql_disable_replication(&state.role);
        execute(&self.config, "pgrole_replication_delete", &sql).await
    }

    pub fn import(role: &str) -> ReplicationModel {
        ReplicationModel {
            role: role.into(),
            enabled: false,
        }
    }
}

#[async_trait]
impl RoleResource for Replication {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema()
    }

    async fn create(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: ReplicationModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.create(&plan).await?)?)
    }

    async fn read(&self, state: Value) -> Result<Value, ResourceError> {
        let state: ReplicationModel = serde_json::from_value(state)?;
        Ok(serde_json::to_value(self.read(&state).await?)?)
    }

    async fn update(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: ReplicationModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.update(&plan).await?)?)
    }

    async fn delete(&self, state: Value) -> Result<(), ResourceError> {
        let state: ReplicationModel = serde_json::from_value(state)?;
        self.delete(&state).await
    }

    fn import(&self, role: &str) -> Result<Value, ResourceError> {
        Ok(serde_json::to_value(Self::import(role))?)
    }
}

fn sql_enable_replication(role: &str) -> String {
    format!("ALTER ROLE {} REPLICATION;", quote_ident(role))
}

fn sql_disable_replication(role: &str) -> String {
    format!("ALTER ROLE {} NOREPLICATION;", quote_ident(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_statements() {
        assert_eq!(
            sql_enable_replication("streamer"),
            "ALTER ROLE \"streamer\" REPLICATION;"
        );
        assert_eq!(
            sql_disable_replication("streamer"),
            "ALTER ROLE \"streamer\" NOREPLICATION;"
        );
    }

    #[test]
    fn import_seeds_disabled() {
        let model = Replication::import("streamer");
        assert_eq!(model.role, "streamer");
        assert!(!model.enabled);
    }
}
