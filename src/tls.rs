use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("no PEM certificates in '{0}'")]
    NoCertificates(String),
    #[error("no PEM private key in '{0}'")]
    NoPrivateKey(String),
    #[error("invalid certificate/key pair: {0}")]
    Rustls(#[from] rustls::Error),
}

fn open(path: &str) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|source| TlsError::Read {
        path: path.to_string(),
        source,
    })
}

fn read_certificates(path: &str) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            path: path.to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_string()));
    }
    Ok(certs)
}

fn read_private_key(path: &str) -> Result<PrivateKeyDer<'static>, TlsError> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|source| TlsError::Read {
            path: path.to_string(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_string()))
}

/// Server config for the webhook listener; the API server does not present a
/// client certificate.
pub fn load_server_config(cert_path: &str, key_path: &str) -> Result<Arc<ServerConfig>, TlsError> {
    let certs = read_certificates(cert_path)?;
    let key = read_private_key(key_path)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_report_path() {
        let err = load_server_config("/nonexistent/tls.crt", "/nonexistent/tls.key").unwrap_err();
        match err {
            TlsError::Read { path, .. } => assert_eq!(path, "/nonexistent/tls.crt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_pem_has_no_certificates() {
        let dir = std::env::temp_dir().join(format!("apm-injector-tls-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let cert = dir.join("empty.crt");
        std::fs::write(&cert, "").unwrap();

        let err = read_certificates(cert.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, TlsError::NoCertificates(_)));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
