use std::collections::HashMap;
use std::env;

use url::Url;

// Connector option names, as understood by elasticsearch-hadoop
pub const ES_NODES: &str = "es.nodes";
pub const ES_NET_SSL: &str = "es.net.ssl";
pub const ES_NET_HTTP_AUTH_USER: &str = "es.net.http.auth.user";
pub const ES_NET_HTTP_AUTH_PASS: &str = "es.net.http.auth.pass";
pub const ES_NET_SSL_KEYSTORE_LOCATION: &str = "es.net.ssl.keystore.location";
pub const ES_NET_SSL_KEYSTORE_PASS: &str = "es.net.ssl.keystore.pass";
pub const ES_NET_SSL_TRUSTSTORE_LOCATION: &str = "es.net.ssl.truststore.location";
pub const ES_NET_SSL_TRUSTSTORE_PASS: &str = "es.net.ssl.truststore.pass";
pub const ES_NET_SSL_CERT_ALLOW_SELF_SIGNED: &str = "es.net.ssl.cert.allow.self.signed";
pub const ES_RESOURCE: &str = "es.resource";

// Ambient TLS settings, the JVM connector reads these from javax.net.ssl
// system properties
const SSL_KEYSTORE: &str = "SSL_KEYSTORE";
const SSL_KEYSTORE_PASSWORD: &str = "SSL_KEYSTORE_PASSWORD";
const SSL_TRUSTSTORE: &str = "SSL_TRUSTSTORE";
const SSL_TRUSTSTORE_PASSWORD: &str = "SSL_TRUSTSTORE_PASSWORD";

/// Normalize a comma-separated host list into the `host:port` form the
/// connector expects. Entries with an `http`/`https` scheme lose the scheme
/// and gain the scheme's default port if none was given. Entries without a
/// recognized scheme pass through untouched, as does anything that fails to
/// parse as a URL. Entry count and order are always preserved.
pub fn parse_hosts(hosts: &str) -> String {
    hosts
        .split(',')
        .map(normalize_host)
        .collect::<Vec<_>>()
        .join(",")
}

fn normalize_host(entry: &str) -> String {
    if !entry.starts_with("http://") && !entry.starts_with("https://") {
        return entry.to_string();
    }

    match Url::parse(entry) {
        Ok(url) => match (url.host_str(), url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            _ => entry.to_string(),
        },
        Err(_) => entry.to_string(),
    }
}

/// Snapshot of the process-wide TLS store settings the connector should pick
/// up. Read once via [`TlsSettings::from_env`] rather than looked up inside
/// the build, so assembling a configuration stays a pure function.
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    pub keystore: Option<String>,
    pub keystore_password: Option<String>,
    pub truststore: Option<String>,
    pub truststore_password: Option<String>,
}

impl TlsSettings {
    pub fn from_env() -> Self {
        Self {
            keystore: env::var(SSL_KEYSTORE).ok(),
            keystore_password: env::var(SSL_KEYSTORE_PASSWORD).ok(),
            truststore: env::var(SSL_TRUSTSTORE).ok(),
            truststore_password: env::var(SSL_TRUSTSTORE_PASSWORD).ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    map: HashMap<String, String>,
}

impl JobConfig {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    /// Get a value from the config, returning None if the key wasn't defined.
    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub(crate) fn get_boolean(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(default)
    }

    /// Iterate over all assembled options, for handing the whole map to the
    /// execution engine.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
