// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `pgrole_bypassrls` resource: BYPASSRLS status for an existing
//! role.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use pgrole_postgres_util::Config;

use crate::error::ResourceError;
use crate::resources::{execute, quote_ident, RoleResource};
use crate::schema::{Attribute, AttributeType, Schema};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassRlsModel {
    pub role: String,
    #[serde(default)]
    pub enabled: bool,
}

pub struct BypassRls {
    config: Config,
}

impl BypassRls {
    pub const TYPE_NAME: &'static str = "pgrole_bypassrls";

    pub fn new(config: Config) -> BypassRls {
        BypassRls { config }
    }

    pub fn schema() -> Schema {
        Schema::new(
            "Manage BYPASSRLS status for an existing role.",
            vec![
                Attribute::required("role", AttributeType::String, "Name of the role."),
                Attribute::optional(
                    "enabled",
                    AttributeType::Bool,
                    "Whether to enable BYPASSRLS for the role.",
                ),
            ],
        )
    }

    pub async fn create(&self, plan: &BypassRlsModel) -> Result<BypassRlsModel, ResourceError> {
        let sql = if plan.enabled {
            sql_enable_bypassrls(&plan.role)
        } else {
            sql_disable_bypassrls(&plan.role)
        };
        execute(&self.config, "pgrole_bypassrls_create", &sql).await?;
        Ok(plan.clone())
    }

    pub async fn read(&self, state: &BypassRlsModel) -> Result<BypassRlsModel, ResourceError> {
        let client = self.config.connect("pgrole_bypassrls_read").await?;
        let row = client
            .query_opt(
                "SELECT rolbypassrls FROM pg_roles WHERE rolname = $1;",
                &[&state.role],
            )
            .await
            .map_err(|source| ResourceError::Read {
                what: "BYPASSRLS status",
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
            "read BYPASSRLS for role"
        );
        Ok(BypassRlsModel {
            role: state.role.clone(),
            enabled,
        })
    }

    pub async fn update(&self, plan: &BypassRlsModel) -> Result<BypassRlsModel, ResourceError> {
        let sql = if plan.enabled {
            sql_enable_bypassrls(&plan.role)
        } else {
            sql_disable_bypassrls(&plan.role)
        };
        execute(&self.config, "pgrole_bypassrls_update", &sql).await?;
        Ok(plan.clone())
    }

    /// Resets the role to NOBYPASSRLS; the role itself persists.
    pub async fn delete(&self, state: &BypassRlsModel) -> Result<(), ResourceError> {
        let sql = sql_disable_bypassrls(&state.role);
        execute(&self.config, "pgrole_bypassrls_delete", &sql).await
    }

    pub fn import(role: &str) -> BypassRlsModel {
        BypassRlsModel {
            role: role.into(),
            enabled: false,
        }
    }
}

#[async_trait]
impl RoleResource for BypassRls {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema()
    }

    async fn create(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: BypassRlsModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.create(&plan).await?)?)
    }

    async fn read(&self, state: Value) -> Result<Value, ResourceError> {
        let state: BypassRlsModel = serde_json::from_value(state)?;
        Ok(serde_json::to_value(self.read(&state).await?)?)
    }

    async fn update(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: BypassRlsModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.update(&plan).await?)?)
    }

    async fn delete(&self, state: Value) -> Result<(), ResourceError> {
        let state: BypassRlsModel = serde_json::from_value(state)?;
        self.delete(&state).await
    }

    fn import(&self, role: &str) -> Result<Value, ResourceError> {
        Ok(serde_json::to_value(Self::import(role))?)
    }
}

fn sql_enable_bypassrls(role: &str) -> String {
    format!("ALTER ROLE {} BYPASSRLS;", quote_ident(role))
}

fn sql_disable_bypassrls(role: &str) -> String {
    format!("ALTER ROLE {} NOBYPASSRLS;", quote_ident(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_statements() {
        assert_eq!(
            sql_enable_bypassrls("reporting"),
            "ALTER ROLE \"reporting\" BYPASSRLS;"
        );
        assert_eq!(
            sql_disable_bypassrls("reporting"),
            "ALTER ROLE \"reporting\" NOBYPASSRLS;"
        );
        assert_eq!(
            sql_enable_bypassrls("ro\"le"),
            "ALTER ROLE \"ro\"\"le\" BYPASSRLS;"
        );
    }

    #[test]
    fn import_seeds_disabled() {
        let model = BypassRls::import("reporting");
        assert_eq!(model.role, "reporting");
        assert!(!model.enabled);
    }

    #[test]
    fn enabled_defaults_to_false() {
        let model: BypassRlsModel = serde_json::from_str(r#"{"role": "reporting"}"#).unwrap();
        assert!(!model.enabled);
    }

    #[test]
    fn schema_shape() {
        let schema = BypassRls::schema();
        assert!(schema.attribute("role").unwrap().required);
        let enabled = schema.attribute("enabled").unwrap();
        assert!(!enabled.required);
        assert_eq!(enabled.attr_type, AttributeType::Bool);
    }
}
