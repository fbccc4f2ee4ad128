use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{NaiveDate, Utc};
use log::{debug, info};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::config::{
    parse_hosts, JobConfig, TlsSettings, ES_NET_HTTP_AUTH_PASS, ES_NET_HTTP_AUTH_USER, ES_NET_SSL,
    ES_NET_SSL_CERT_ALLOW_SELF_SIGNED, ES_NET_SSL_KEYSTORE_LOCATION, ES_NET_SSL_KEYSTORE_PASS,
    ES_NET_SSL_TRUSTSTORE_LOCATION, ES_NET_SSL_TRUSTSTORE_PASS, ES_NODES, ES_RESOURCE,
};
use crate::error::{EsJobError, Result};

/// Accumulates connection parameters for an export job. Consumed once by
/// [`JobBuilder::build`]; setters follow the fluent `mut self` style.
#[derive(Debug, Clone)]
pub struct JobBuilder {
    hosts: Option<String>,
    username: Option<String>,
    password: Option<String>,
    index: Option<String>,
    day: Option<NaiveDate>,
    kind: String,
    tls: TlsSettings,
    extra_options: HashMap<String, String>,
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self {
            hosts: None,
            username: None,
            password: None,
            index: None,
            day: None,
            kind: "doc".to_string(),
            tls: TlsSettings::default(),
            extra_options: HashMap::new(),
        }
    }
}

impl JobBuilder {
    /// Set the comma-separated host list. Each entry is either `host[:port]`
    /// or an `http`/`https` URL; see [`parse_hosts`] for normalization.
    pub fn hosts(mut self, hosts: impl Into<String>) -> Self {
        self.hosts = Some(hosts.into());
        self
    }

    /// Set the basic-auth username. Independent of `password`.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the basic-auth password. Independent of `username`.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the index prefix to export into. The target resource becomes
    /// `<index>-<day>/<kind>`.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Set the day used for the dated index name, defaults to today in UTC.
    pub fn day(mut self, day: NaiveDate) -> Self {
        self.day = Some(day);
        self
    }

    /// Set the document kind segment of the target resource, defaults to `doc`.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the snapshot of ambient TLS store settings to redirect into the
    /// connector options.
    pub fn tls(mut self, tls: TlsSettings) -> Self {
        self.tls = tls;
        self
    }

    /// Pass an arbitrary connector option through. Merged last, so these win
    /// over anything the builder computes for the same key.
    pub fn extra_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_options.insert(key.into(), value.into());
        self
    }

    /// Assemble the connector configuration map. Never fails and performs no
    /// IO; a missing host list just means no node options are emitted, and any
    /// resulting problem surfaces when the job runs.
    pub fn build(self) -> EsExportJob {
        let mut map: HashMap<String, String> = HashMap::new();

        if let Some(hosts) = self.hosts.as_deref() {
            map.insert(ES_NODES.to_string(), parse_hosts(hosts));
            // Scheme detection happens on the raw string, before stripping
            if hosts.contains("https://") {
                map.insert(ES_NET_SSL.to_string(), "true".to_string());
            }
        }

        if let Some(username) = self.username {
            map.insert(ES_NET_HTTP_AUTH_USER.to_string(), username);
        }
        if let Some(password) = self.password {
            map.insert(ES_NET_HTTP_AUTH_PASS.to_string(), password);
        }

        if let Some(index) = self.index {
            let day = self.day.unwrap_or_else(|| Utc::now().date_naive());
            map.insert(
                ES_RESOURCE.to_string(),
                format!("{}-{}/{}", index, day.format("%Y-%m-%d"), self.kind),
            );
        }

        if let Some(keystore) = self.tls.keystore {
            map.insert(
                ES_NET_SSL_KEYSTORE_LOCATION.to_string(),
                format!("file:{keystore}"),
            );
        }
        if let Some(pass) = self.tls.keystore_password {
            map.insert(ES_NET_SSL_KEYSTORE_PASS.to_string(), pass);
        }
        if let Some(truststore) = self.tls.truststore {
            map.insert(
                ES_NET_SSL_TRUSTSTORE_LOCATION.to_string(),
                format!("file:{truststore}"),
            );
        }
        if let Some(pass) = self.tls.truststore_password {
            map.insert(ES_NET_SSL_TRUSTSTORE_PASS.to_string(), pass);
        }

        // Escape hatch last, caller-supplied keys win
        map.extend(self.extra_options);

        EsExportJob {
            conf: JobConfig::new(map),
        }
    }
}

/// A configured export job. The assembled options are visible through `conf`;
/// [`EsExportJob::run`] performs the initial cluster probe before the export
/// engine takes over.
#[derive(Debug)]
pub struct EsExportJob {
    pub conf: JobConfig,
}

impl EsExportJob {
    pub fn builder() -> JobBuilder {
        JobBuilder::default()
    }

    /// Probe the first configured node for reachability and authorization.
    /// Any failure along the way, including a missing host list, surfaces as
    /// [`EsJobError::ExecutionFailed`]; configuration assembly itself never
    /// validates connectivity.
    pub async fn run(&self) -> Result<()> {
        self.probe().await.map_err(|e| match e {
            EsJobError::IOError(io) => {
                EsJobError::ExecutionFailed(format!("cluster probe failed: {io}"))
            }
            other => other,
        })?;

        info!("Cluster probe succeeded, handing off to the export engine");
        Ok(())
    }

    async fn probe(&self) -> Result<()> {
        let nodes = self.conf.get(ES_NODES).ok_or_else(|| {
            EsJobError::ExecutionFailed("no nodes configured for this job".to_string())
        })?;
        let node = nodes.split(',').next().unwrap_or(nodes.as_str());
        let ssl = self.conf.get_boolean(ES_NET_SSL, false);

        debug!("Probing Elasticsearch node {} (ssl={})", node, ssl);

        let request = self.probe_request(node);
        let stream = connect(node).await?;

        let status = if ssl {
            let allow_self_signed = self.conf.get_boolean(ES_NET_SSL_CERT_ALLOW_SELF_SIGNED, false);
            let stream = tls_connect(stream, node, allow_self_signed).await?;
            exchange(stream, &request).await?
        } else {
            exchange(stream, &request).await?
        };

        if !(200..300).contains(&status) {
            return Err(EsJobError::ExecutionFailed(format!(
                "node {node} rejected the probe with status {status}"
            )));
        }

        debug!("Node {} answered the probe with status {}", node, status);
        Ok(())
    }

    // HEAD existence check, the same first request the connector makes
    fn probe_request(&self, node: &str) -> String {
        let mut request = format!("HEAD / HTTP/1.1\r\nHost: {node}\r\n");

        if let (Some(user), Some(pass)) = (
            self.conf.get(ES_NET_HTTP_AUTH_USER),
            self.conf.get(ES_NET_HTTP_AUTH_PASS),
        ) {
            let credential = general_purpose::STANDARD.encode(format!("{user}:{pass}"));
            request.push_str(&format!("Authorization: Basic {credential}\r\n"));
        }

        request.push_str("Connection: close\r\n\r\n");
        request
    }
}

// Connect to a remote host and return a TcpStream with standard options we want
async fn connect(addr: &str) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;

    Ok(stream)
}

async fn tls_connect(
    stream: TcpStream,
    node: &str,
    allow_self_signed: bool,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = if allow_self_signed {
        rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoServerVerification::new()))
            .with_no_client_auth()
    } else {
        let mut root_cert_store = rustls::RootCertStore::empty();
        root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth()
    };

    let connector = TlsConnector::from(Arc::new(config));
    let domain = node.split(':').next().unwrap_or(node).to_string();
    let server_name = ServerName::try_from(domain)
        .map_err(|e| EsJobError::TlsError(format!("invalid server name for {node}: {e}")))?;

    connector
        .connect(server_name, stream)
        .await
        .map_err(|e| EsJobError::TlsError(format!("TLS handshake with {node} failed: {e}")))
}

async fn exchange<S: AsyncRead + AsyncWrite + Unpin>(mut stream: S, request: &str) -> Result<u16> {
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(EsJobError::ExecutionFailed(
            "connection closed before a response was received".to_string(),
        ));
    }

    parse_status_line(line.trim_end())
}

fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.splitn(3, ' ');
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code.parse().map_err(|_| {
            EsJobError::ExecutionFailed(format!("malformed probe response: {line}"))
        }),
        _ => Err(EsJobError::ExecutionFailed(format!(
            "malformed probe response: {line}"
        ))),
    }
}

/// Accepts whatever certificate the server presents. Only installed when the
/// self-signed override option is set.
#[derive(Debug)]
struct NoServerVerification(rustls::crypto::CryptoProvider);

impl NoServerVerification {
    fn new() -> Self {
        Self(rustls::crypto::ring::default_provider())
    }
}

impl ServerCertVerifier for NoServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
