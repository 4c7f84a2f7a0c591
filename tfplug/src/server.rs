//! Server module for running Terraform providers
//!
//! This module provides functionality to start a Terraform provider server
//! with TLS support and the go-plugin protocol handshake.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose,
};
use std::path::PathBuf;
use std::time::Duration;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::{debug, info, warn};

/// Environment variable go-plugin uses to recognise a managed launch
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Set by Terraform when it expects automatic mutual TLS
const CLIENT_CERT_ENV: &str = "PLUGIN_CLIENT_CERT";

const CORE_PROTOCOL_VERSION: u32 = 1;
const PROTOCOL_VERSION: u32 = 6;

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to TLS certificate file, used when AutoMTLS is off
    pub cert_path: PathBuf,
    /// Path to TLS key file, used when AutoMTLS is off
    pub key_path: PathBuf,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// Timeout for graceful shutdown
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("./certs/localhost.pem"),
            key_path: PathBuf::from("./certs/localhost-key.pem"),
            max_message_size: 256 << 20, // 256MB
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the certificate path
    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    /// Set the key path
    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    /// Set the maximum message size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    check_magic_cookie()?;

    // Another component may have installed a provider already
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let grpc_server = GrpcProviderServer::new(provider);
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let tls = load_tls(&config).await?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let actual_addr = listener.local_addr()?;

    let cert_der = tls.as_ref().and_then(|t| t.cert_der.as_deref());
    println!("{}", handshake_line(&actual_addr.to_string(), cert_der));
    info!(address = %actual_addr, tls = tls.is_some(), "provider server listening");

    let mut builder = Server::builder();
    if let Some(tls) = tls {
        builder = builder.tls_config(tls.config)?;
    }
    let router = builder.add_service(provider_service);

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    let serve = router.serve_with_incoming_shutdown(incoming, interrupted());
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => result?,
        _ = async {
            interrupted().await;
            tokio::time::sleep(config.shutdown_timeout).await;
        } => {
            warn!(timeout = ?config.shutdown_timeout, "graceful shutdown timed out");
        }
    }

    Ok(())
}

/// Refuse to run unless launched by Terraform
pub fn check_magic_cookie() -> Result<()> {
    match std::env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => {
            eprintln!(
                "This binary is a plugin. These are not meant to be executed directly.\n\
                 Please execute the program that consumes these plugins, which will\n\
                 load any plugins automatically"
            );
            Err(TfplugError::HandshakeError(format!(
                "{} is missing or does not match",
                MAGIC_COOKIE_KEY
            )))
        }
    }
}

/// go-plugin handshake: core version, app version, network, address, protocol
/// and, with AutoMTLS, the server certificate
pub fn handshake_line(addr: &str, cert_der: Option<&[u8]>) -> String {
    let mut line = format!(
        "{}|{}|tcp|{}|grpc",
        CORE_PROTOCOL_VERSION, PROTOCOL_VERSION, addr
    );
    if let Some(der) = cert_der {
        line.push('|');
        line.push_str(&STANDARD_NO_PAD.encode(der));
    }
    line
}

struct TlsSetup {
    config: ServerTlsConfig,
    /// Present only with AutoMTLS, where Terraform learns the cert from the handshake
    cert_der: Option<Vec<u8>>,
}

async fn load_tls(config: &ServerConfig) -> Result<Option<TlsSetup>> {
    if std::env::var_os(CLIENT_CERT_ENV).is_some() {
        debug!("AutoMTLS requested, generating server certificate");
        let generated = generate_certificate()?;
        let identity = Identity::from_pem(generated.cert_pem, generated.key_pem);
        return Ok(Some(TlsSetup {
            config: ServerTlsConfig::new().identity(identity),
            cert_der: Some(generated.cert_der),
        }));
    }

    if config.cert_path.exists() && config.key_path.exists() {
        let cert = tokio::fs::read(&config.cert_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
        let key = tokio::fs::read(&config.key_path)
            .await
            .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;
        return Ok(Some(TlsSetup {
            config: ServerTlsConfig::new().identity(Identity::from_pem(cert, key)),
            cert_der: None,
        }));
    }

    warn!("no TLS material available, serving plaintext gRPC");
    Ok(None)
}

/// Self-signed server certificate for AutoMTLS
pub struct GeneratedCertificate {
    pub cert_pem: String,
    pub key_pem: String,
    pub cert_der: Vec<u8>,
}

/// Generates the certificate go-plugin expects: a localhost CA usable for
/// both server and client authentication
pub fn generate_certificate() -> Result<GeneratedCertificate> {
    let mut params = CertificateParams::new(vec!["localhost".to_string()])?;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::KeyAgreement,
        KeyUsagePurpose::KeyCertSign,
    ];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ServerAuth,
        ExtendedKeyUsagePurpose::ClientAuth,
    ];
    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, "HashiCorp");
    dn.push(DnType::CommonName, "localhost");
    params.distinguished_name = dn;

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    Ok(GeneratedCertificate {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
        cert_der: cert.der().to_vec(),
    })
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for interrupt");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn server_config_builder() {
        let config = ServerConfig::new()
            .with_cert_path(PathBuf::from("/tmp/cert.pem"))
            .with_key_path(PathBuf::from("/tmp/key.pem"))
            .with_max_message_size(1024)
            .with_shutdown_timeout(Duration::from_secs(5));

        assert_eq!(config.cert_path, PathBuf::from("/tmp/cert.pem"));
        assert_eq!(config.key_path, PathBuf::from("/tmp/key.pem"));
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn default_message_size_is_256_mib() {
        assert_eq!(ServerConfig::default().max_message_size, 256 * 1024 * 1024);
    }

    #[test]
    fn handshake_without_certificate() {
        assert_eq!(
            handshake_line("127.0.0.1:4321", None),
            "1|6|tcp|127.0.0.1:4321|grpc"
        );
    }

    #[test]
    fn handshake_appends_unpadded_certificate() {
        let line = handshake_line("127.0.0.1:4321", Some(&[0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(line, "1|6|tcp|127.0.0.1:4321|grpc|3q2+7w");
    }

    #[test]
    fn generated_certificate_is_pem_and_der() {
        let generated = generate_certificate().unwrap();
        assert!(generated.cert_pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(generated.key_pem.contains("PRIVATE KEY"));
        assert!(!generated.cert_der.is_empty());
    }

    #[test]
    #[serial]
    fn magic_cookie_is_required() {
        std::env::remove_var(MAGIC_COOKIE_KEY);
        assert!(matches!(
            check_magic_cookie(),
            Err(TfplugError::HandshakeError(_))
        ));

        std::env::set_var(MAGIC_COOKIE_KEY, "wrong");
        assert!(check_magic_cookie().is_err());

        std::env::set_var(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE);
        assert!(check_magic_cookie().is_ok());

        std::env::remove_var(MAGIC_COOKIE_KEY);
    }
}
