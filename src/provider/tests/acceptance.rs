// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Acceptance tests against a live PostgreSQL server.
//!
//! These tests run only when `PGROLE_TEST_POSTGRES_URL` points at a
//! database whose user may create and alter roles; without it each
//! test is a no-op. Roles created here are scoped per test and dropped
//! on the way out.

use std::env;

use pgrole_provider::{
    Audit, AuditModel, BypassRls, BypassRlsModel, Config, ConnectionLimit, ConnectionLimitModel,
    Provider, Replication, ReplicationModel, StatementTimeout, StatementTimeoutModel,
};

fn test_config() -> Option<Config> {
    let url = env::var("PGROLE_TEST_POSTGRES_URL").ok()?;
    Some(Config::from_url(&url).expect("PGROLE_TEST_POSTGRES_URL must be a valid postgres url"))
}

async fn recreate_role(config: &Config, role: &str) -> Result<(), anyhow::Error> {
    let client = config.connect("acceptance_setup").await?;
    client
        .batch_execute(&format!(
            "DROP ROLE IF EXISTS \"{role}\"; CREATE ROLE \"{role}\";"
        ))
        .await?;
    Ok(())
}

async fn drop_role(config: &Config, role: &str) -> Result<(), anyhow::Error> {
    let client = config.connect("acceptance_teardown").await?;
    client
        .batch_execute(&format!("DROP ROLE IF EXISTS \"{role}\";"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn bypassrls_round_trip() -> Result<(), anyhow::Error> {
    let Some(config) = test_config() else {
        return Ok(());
    };
    let role = "pgrole_test_bypassrls";
    recreate_role(&config, role).await?;

    let resource = BypassRls::new(config.clone());
    let plan = BypassRlsModel {
        role: role.into(),
        enabled: true,
    };
    let created = resource.create(&plan).await?;
    assert_eq!(created, plan);

    let read = resource.read(&plan).await?;
    assert!(read.enabled);

    // Delete resets the attribute but keeps the role.
    resource.delete(&plan).await?;
    let read = resource.read(&plan).await?;
    assert!(!read.enabled);

    drop_role(&config, role).await
}

#[tokio::test]
async fn replication_round_trip() -> Result<(), anyhow::Error> {
    let Some(config) = test_config() else {
        return Ok(());
    };
    let role = "pgrole_test_replication";
    recreate_role(&config, role).await?;

    let resource = Replication::new(config.clone());
    let plan = ReplicationModel {
        role: role.into(),
        enabled: true,
    };
    resource.create(&plan).await?;
    assert!(resource.read(&plan).await?.enabled);

    resource.delete(&plan).await?;
    assert!(!resource.read(&plan).await?.enabled);

    drop_role(&config, role).await
}

#[tokio::test]
async fn connection_limit_round_trip() -> Result<(), anyhow::Error> {
    let Some(config) = test_config() else {
        return Ok(());
    };
    let role = "pgrole_test_connection_limit";
    recreate_role(&config, role).await?;

    let resource = ConnectionLimit::new(config.clone());
    let plan = ConnectionLimitModel {
        role: role.into(),
        connection_limit: 50,
    };
    resource.create(&plan).await?;
    assert_eq!(resource.read(&plan).await?.connection_limit, 50);

    // Delete resets the limit to -1 (no limit).
    resource.delete(&plan).await?;
    assert_eq!(resource.read(&plan).await?.connection_limit, -1);

    drop_role(&config, role).await
}

#[tokio::test]
async fn statement_timeout_round_trip() -> Result<(), anyhow::Error> {
    let Some(config) = test_config() else {
        return Ok(());
    };
    let role = "pgrole_test_statement_timeout";
    recreate_role(&config, role).await?;

    let resource = StatementTimeout::new(config.clone());
    let plan = StatementTimeoutModel {
        role: role.into(),
        timeout: "100s".into(),
    };

    // A fresh role has no rolconfig entry, which reads as unset.
    let read = resource.read(&plan).await?;
    assert_eq!(read.timeout, "0s");

    resource.create(&plan).await?;
    assert_eq!(resource.read(&plan).await?.timeout, "100s");

    resource.delete(&plan).await?;
    assert_eq!(resource.read(&plan).await?.timeout, "0s");

    drop_role(&config, role).await
}

#[tokio::test]
async fn statement_timeout_rejects_malformed_values() -> Result<(), anyhow::Error> {
    let Some(config) = test_config() else {
        return Ok(());
    };
    let resource = StatementTimeout::new(config);
    let plan = StatementTimeoutModel {
        role: "pgrole_test_nonexistent".into(),
        timeout: "not-a-timeout".into(),
    };
    // Validation fires before any SQL touches the database.
    assert!(resource.create(&plan).await.is_err());
    Ok(())
}

#[tokio::test]
async fn audit_round_trip() -> Result<(), anyhow::Error> {
    let Some(config) = test_config() else {
        return Ok(());
    };
    let role = "pgrole_test_audit";
    recreate_role(&config, role).await?;

    let resource = Audit::new(config.clone());
    let plan = AuditModel {
        role: role.into(),
        audit_log_option: "ddl".into(),
    };
    resource.create(&plan).await?;
    resource.delete(&plan).await?;

    drop_role(&config, role).await
}

#[tokio::test]
async fn import_converges_through_read() -> Result<(), anyhow::Error> {
    let Some(config) = test_config() else {
        return Ok(());
    };
    let role = "pgrole_test_import";
    recreate_role(&config, role).await?;
    {
        let client = config.connect("acceptance_setup").await?;
        client
            .batch_execute(&format!("ALTER ROLE \"{role}\" CONNECTION LIMIT 7;"))
            .await?;
    }

    // Import seeds a placeholder; the next read replaces it with the
    // value the database actually holds.
    let resources = Provider::resources(&config);
    let resource = resources
        .iter()
        .find(|r| r.type_name() == "pgrole_connection_limit")
        .expect("resource registered");
    let seeded = resource.import(role)?;
    assert_eq!(seeded["connection_limit"], serde_json::json!(-1));
    let read = resource.read(seeded).await?;
    assert_eq!(read["connection_limit"], serde_json::json!(7));

    drop_role(&config, role).await
}
