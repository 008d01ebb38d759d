//! The seam between document production and the network.
//!
//! This crate does not open connections. Callers plug in an HTTP client
//! by implementing [`Transport`]; [`send_with_retry`] adds the one retry
//! the protocol tolerates after a dropped connection.

use super::credential::Credential;
use crate::core::FiscalError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer reset or dropped the connection before answering.
    #[error("connection reset: {0}")]
    ConnectionReset(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Posts a finished SOAP body and returns the raw answer.
pub trait Transport {
    fn post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// Identity of a pooled connection: TLS client authentication binds a
/// connection to one credential, so the fingerprint is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    pub host: String,
    pub port: u16,
    pub credential_fingerprint: String,
}

impl PoolKey {
    pub fn new(host: impl Into<String>, port: u16, credential: &Credential) -> Result<Self, FiscalError> {
        Ok(Self {
            host: host.into(),
            port,
            credential_fingerprint: credential.fingerprint()?,
        })
    }
}

/// Send `body`, retrying exactly once when the first attempt fails with
/// [`TransportError::ConnectionReset`]. Any other error, or a second
/// failure, is returned as is.
pub fn send_with_retry<T: Transport + ?Sized>(
    transport: &T,
    path: &str,
    body: &[u8],
) -> Result<Vec<u8>, TransportError> {
    match transport.post(path, body) {
        Err(TransportError::ConnectionReset(reason)) => {
            tracing::warn!(path, %reason, "connection reset, retrying once");
            transport.post(path, body)
        }
        other => other,
    }
}
