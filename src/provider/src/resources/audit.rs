// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `pgrole_audit` resource: per-role `pgaudit.log` setting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use pgrole_postgres_util::Config;

use crate::error::ResourceError;
use crate::resources::{escape_literal, execute, quote_ident, RoleResource};
use crate::schema::{Attribute, AttributeType, Schema};

/// The pgaudit class list meaning "log nothing", and the value seeded
/// on import.
pub const LOG_NONE: &str = "none";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditModel {
    pub role: String,
    pub audit_log_option: String,
}

pub struct Audit {
    config: Config,
}

impl Audit {
    pub const TYPE_NAME: &'static str = "pgrole_audit";

    pub fn new(config: Config) -> Audit {
        Audit { config }
    }

    pub fn schema() -> Schema {
        Schema::new(
            "Manage pgaudit.log setting for an existing role.",
            vec![
                Attribute::required("role", AttributeType::String, "Name of the role."),
                Attribute::required(
                    "audit_log_option",
                    AttributeType::String,
                    "Value for the pgaudit.log option for this role. Examples: 'none', \
                     'all', 'ddl', 'write', etc.",
                ),
            ],
        )
    }

    pub async fn create(&self, plan: &AuditModel) -> Result<AuditModel, ResourceError> {
        let sql = sql_set_audit_log(&plan.role, &plan.audit_log_option);
        execute(&self.config, "pgrole_audit_create", &sql).await?;
        Ok(plan.clone())
    }

    pub async fn read(&self, state: &AuditModel) -> Result<AuditModel, ResourceError> {
        let client = self.config.connect("pgrole_audit_read").await?;
        let row = client
            .query_opt(
                "SELECT pg_catalog.current_setting('pgaudit.log') FROM pg_roles WHERE rolname = $1;",
                &[&state.role],
            )
            .await
            .map_err(|source| ResourceError::Read {
                what: "pgaudit.log value",
                role: state.role.clone(),
                source,
            })?
            .ok_or_else(|| ResourceError::RoleNotFound {
                role: state.role.clone(),
            })?;
        let audit_log_option: String = row.get(0);
        debug!(
            role = %state.role,
            got = %audit_log_option,
            want = %state.audit_log_option,
            "read pgaudit.log for role"
        );
        Ok(AuditModel {
            role: state.role.clone(),
            audit_log_option,
        })
    }

    pub async fn update(&self, plan: &AuditModel) -> Result<AuditModel, ResourceError> {
        let sql = sql_set_audit_log(&plan.role, &plan.audit_log_option);
        execute(&self.config, "pgrole_audit_update", &sql).await?;
        Ok(plan.clone())
    }

    /// Clears the role's `pgaudit.log` entry; the role itself
    /// persists.
    pub async fn delete(&self, state: &AuditModel) -> Result<(), ResourceError> {
        let sql = sql_reset_audit_log(&state.role);
        execute(&self.config, "pgrole_audit_delete", &sql).await
    }

    pub fn import(role: &str) -> AuditModel {
        AuditModel {
            role: role.into(),
            audit_log_option: LOG_NONE.into(),
        }
    }
}

#[async_trait]
impl RoleResource for Audit {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema()
    }

    async fn create(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: AuditModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.create(&plan).await?)?)
    }

    async fn read(&self, state: Value) -> Result<Value, ResourceError> {
        let state: AuditModel = serde_json::from_value(state)?;
        Ok(serde_json::to_value(self.read(&state).await?)?)
    }

    async fn update(&self, plan: Value) -> Result<Value, ResourceError> {
        let plan: AuditModel = serde_json::from_value(plan)?;
        Ok(serde_json::to_value(self.update(&plan).await?)?)
    }

    async fn delete(&self, state: Value) -> Result<(), ResourceError> {
        let state: AuditModel = serde_json::from_value(state)?;
        self.delete(&state).await
    }

    fn import(&self, role: &str) -> Result<Value, ResourceError> {
        Ok(serde_json::to_value(Self::import(role))?)
    }
}

fn sql_set_audit_log(role: &str, audit_log_option: &str) -> String {
    format!(
        "ALTER ROLE {} SET pgaudit.log = '{}';",
        quote_ident(role),
        escape_literal(audit_log_option)
    )
}

fn sql_reset_audit_log(role: &str) -> String {
    format!("ALTER ROLE {} RESET pgaudit.log;", quote_ident(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_statements() {
        assert_eq!(
            sql_set_audit_log("reporting", "ddl, write"),
            "ALTER ROLE \"reporting\" SET pgaudit.log = 'ddl, write';"
        );
        assert_eq!(
            sql_reset_audit_log("reporting"),
            "ALTER ROLE \"reporting\" RESET pgaudit.log;"
        );
    }

    #[test]
    fn option_values_are_escaped() {
        assert_eq!(
            sql_set_audit_log("reporting", "all'; DROP TABLE users; --"),
            "ALTER ROLE \"reporting\" SET pgaudit.log = 'all''; DROP TABLE users; --';"
        );
    }

    #[test]
    fn import_seeds_none() {
        let model = Audit::import("reporting");
        assert_eq!(model.audit_log_option, LOG_NONE);
    }
}
