// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A tiny utility library for making TLS connectors.
//!
//! Two kinds of connectors are produced here: server-driven connectors
//! whose verification behavior is derived from a PostgreSQL `sslmode`,
//! and client-identity connectors that present a certificate and key
//! and trust a single pinned certificate authority.

use openssl::pkey::PKey;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use openssl::x509::X509;
use postgres_openssl::MakeTlsConnector;
use tokio_postgres::config::SslMode;

macro_rules! bail_generic {
    ($fmt:expr, $($arg:tt)*) => {
        return Err(TlsError::Generic(anyhow::anyhow!($fmt, $($arg)*)))
    };
    ($err:expr $(,)?) => {
        return Err(TlsError::Generic(anyhow::anyhow!($err)))
    };
}

/// An error representing tls failures.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// Any other error we bail on.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
    /// Error setting up postgres ssl.
    #[error(transparent)]
    OpenSsl(#[from] openssl::error::ErrorStack),
}

/// Creates a TLS connector for the given [`Config`](tokio_postgres::Config).
pub fn make_tls(config: &tokio_postgres::Config) -> Result<MakeTlsConnector, TlsError> {
    let mut builder = SslConnector::builder(SslMethod::tls_client())?;
    // The mode dictates whether we verify peer certs and hostnames. By default, Postgres is
    // pretty relaxed and recommends SslMode::VerifyCa or SslMode::VerifyFull for security.
    //
    // For more details, check out Table 33.1. SSL Mode Descriptions in
    // https://postgresql.org/docs/current/libpq-ssl.html#LIBPQ-SSL-PROTECTION.
    let (verify_mode, verify_hostname) = match config.get_ssl_mode() {
        SslMode::Disable | SslMode::Prefer => (SslVerifyMode::NONE, false),
        SslMode::Require => match config.get_ssl_root_cert() {
            // If a root CA file exists, the behavior of sslmode=require will be the same as
            // that of verify-ca, meaning the server certificate is validated against the CA.
            //
            // For more details, check out the note about backwards compatibility in
            // https://postgresql.org/docs/current/libpq-ssl.html#LIBQ-SSL-CERTIFICATES.
            Some(_) => (SslVerifyMode::PEER, false),
            None => (SslVerifyMode::NONE, false),
        },
        SslMode::VerifyCa => (SslVerifyMode::PEER, false),
        SslMode::VerifyFull => (SslVerifyMode::PEER, true),
        _ => panic!("unexpected sslmode {:?}", config.get_ssl_mode()),
    };

    // Configure peer verification
    builder.set_verify(verify_mode);

    // Configure certificates
    match (config.get_ssl_cert(), config.get_ssl_key()) {
        (Some(ssl_cert), Some(ssl_key)) => {
            builder.set_certificate(&*X509::from_pem(ssl_cert)?)?;
            builder.set_private_key(&*PKey::private_key_from_pem(ssl_key)?)?;
        }
        (None, Some(_)) => {
            bail_generic!("must provide both sslcert and sslkey, but only provided sslkey")
        }
        (Some(_), None) => {
            bail_generic!("must provide both sslcert and sslkey, but only provided sslcert")
        }
        _ => {}
    }
    if let Some(ssl_root_cert) = config.get_ssl_root_cert() {
        builder
            .cert_store_mut()
            .add_cert(X509::from_pem(ssl_root_cert)?)?;
    }

    let mut tls_connector = MakeTlsConnector::new(builder.build());

    // Configure hostname verification
    match (verify_mode, verify_hostname) {
        (SslVerifyMode::PEER, false) => tls_connector.set_callback(|connect, _| {
            connect.set_verify_hostname(false);
            Ok(())
        }),
        _ => {}
    }

    Ok(tls_connector)
}

/// Creates a TLS connector that presents the given client identity and
/// trusts only the given certificate authority.
///
/// The server certificate is validated against the pinned CA, but its
/// hostname is not checked: the certificates minted by managed database
/// services carry the instance name, not the address the client dialed.
pub fn make_identity_tls(
    server_ca: &[u8],
    client_cert: &[u8],
    client_key: &[u8],
) -> Result<MakeTlsConnector, TlsError> {
    let mut builder = SslConnector::builder(SslMethod::tls_client())?;
    builder.set_verify(SslVerifyMode::PEER);
    builder.set_certificate(&*X509::from_pem(client_cert)?)?;
    builder.set_private_key(&*PKey::private_key_from_pem(client_key)?)?;
    builder.check_private_key()?;

    let ca_store = builder.cert_store_mut();
    // A CA bundle may hold more than one certificate, and `X509::stack_from_pem`
    // silently yields an empty stack on malformed input rather than erroring.
    let cas = X509::stack_from_pem(server_ca)?;
    if cas.is_empty() {
        bail_generic!("server CA bundle contained no certificates");
    }
    for ca in cas {
        ca_store.add_cert(ca)?;
    }

    let mut tls_connector = MakeTlsConnector::new(builder.build());
    tls_connector.set_callback(|connect, _| {
        connect.set_verify_hostname(false);
        Ok(())
    });

    Ok(tls_connector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg_config(s: &str) -> tokio_postgres::Config {
        s.parse().expect("valid config")
    }

    #[test]
    fn tls_from_sslmode() {
        for mode in ["disable", "prefer", "require"] {
            let config = pg_config(&format!("host=localhost sslmode={}", mode));
            assert!(make_tls(&config).is_ok(), "sslmode={}", mode);
        }
    }

    #[test]
    fn mismatched_cert_and_key_rejected() {
        let mut config = pg_config("host=localhost sslmode=require");
        config.ssl_cert(b"not a cert");
        let err = make_tls(&config).unwrap_err();
        assert!(err.to_string().contains("sslcert"));
    }

    #[test]
    fn identity_requires_a_ca() {
        let err = make_identity_tls(b"", b"", b"").unwrap_err();
        assert!(matches!(err, TlsError::OpenSsl(_) | TlsError::Generic(_)));
    }
}
