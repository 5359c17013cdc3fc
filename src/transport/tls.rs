use crate::error::SessionError;

/// Builds a TLS connector that accepts any certificate and any hostname.
/// Target servers under test routinely present self-signed certificates.
pub(super) fn insecure_connector() -> Result<tokio_native_tls::TlsConnector, SessionError> {
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|source| SessionError::TlsSetup { source })?;
    Ok(tokio_native_tls::TlsConnector::from(connector))
}
