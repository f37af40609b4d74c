// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Role-attribute resources.
//!
//! Every resource manages exactly one attribute of a role that already
//! exists in the database. Mutations are single `ALTER ROLE`
//! statements; reads go to `pg_roles` or the role's configuration
//! array. Deleting a resource resets the attribute to its PostgreSQL
//! default and leaves the role itself untouched.
//!
//! Each operation opens one connection through the shared
//! [`Config`](pgrole_postgres_util::Config) and drops it on return.

use async_trait::async_trait;
use serde_json::Value;

use pgrole_postgres_util::Config;

use crate::error::ResourceError;
use crate::schema::Schema;

mod audit;
mod bypassrls;
mod connection_limit;
mod replication;
mod statement_timeout;

pub use audit::{Audit, AuditModel};
pub use bypassrls::{BypassRls, BypassRlsModel};
pub use connection_limit::{ConnectionLimit, ConnectionLimitModel};
pub use replication::{Replication, ReplicationModel};
pub use statement_timeout::{StatementTimeout, StatementTimeoutModel};

/// The object seam a protocol adapter drives resources through.
///
/// State crosses this boundary as JSON values; the typed entry points
/// on each concrete resource do the real work.
#[async_trait]
pub trait RoleResource: Send + Sync {
    /// The fully prefixed resource type name, e.g. `pgrole_bypassrls`.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn create(&self, plan: Value) -> Result<Value, ResourceError>;

    async fn read(&self, state: Value) -> Result<Value, ResourceError>;

    async fn update(&self, plan: Value) -> Result<Value, ResourceError>;

    async fn delete(&self, state: Value) -> Result<(), ResourceError>;

    /// Seeds state for `terraform import <type>.<name> <role>`: the
    /// attribute gets a placeholder default that the next read
    /// replaces with the database's actual value.
    fn import(&self, role: &str) -> Result<Value, ResourceError>;
}

/// Quotes `name` as a SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escapes `value` for embedding in a single-quoted SQL literal.
pub(crate) fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Opens a connection and executes one statement.
pub(crate) async fn execute(
    config: &Config,
    task_name: &str,
    sql: &str,
) -> Result<(), ResourceError> {
    let client = config.connect(task_name).await?;
    client
        .batch_execute(sql)
        .await
        .map_err(|source| ResourceError::Sql {
            sql: sql.into(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idents_are_quoted() {
        assert_eq!(quote_ident("reporting"), "\"reporting\"");
        assert_eq!(quote_ident("odd role"), "\"odd role\"");
        assert_eq!(quote_ident("ro\"le"), "\"ro\"\"le\"");
    }

    #[test]
    fn literals_are_escaped() {
        assert_eq!(escape_literal("all"), "all");
        assert_eq!(escape_literal("it's"), "it''s");
    }
}
