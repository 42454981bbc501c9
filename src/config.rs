/*!
Connection settings resolved from the environment.

Variables:
  KEY_SERVER                 key server URL (default https://127.0.0.1:7373)
  KEY_CLIENT_TLS_CERT_FILE   client certificate (see `tls`)
  KEY_CLIENT_TLS_KEY_FILE    client private key (see `tls`)
  KES_LOG_LEVEL              initial log level (see `utils::logging`)

Every resolver has a `*_with(lookup)` form taking an explicit
`Fn(&str) -> Option<String>`; the plain form reads the process environment
(`process_env`, or `process_env_os` for file paths). Nothing is cached
between calls.
*/

use std::ffi::OsString;

use anyhow::{Context, Result, bail};
use url::Url;

use crate::tls::{self, ClientCertificate};

pub const SERVER_ENV: &str = "KEY_SERVER";
pub const CLIENT_CERT_ENV: &str = "KEY_CLIENT_TLS_CERT_FILE";
pub const CLIENT_KEY_ENV: &str = "KEY_CLIENT_TLS_KEY_FILE";
pub const LOG_LEVEL_ENV: &str = "KES_LOG_LEVEL";

/// Loopback over TLS.
pub const DEFAULT_SERVER: &str = "https://127.0.0.1:7373";

/// Lookup backed by the process environment. Non-UTF-8 values count as unset.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Raw lookup for variables holding file system paths.
pub fn process_env_os(name: &str) -> Option<OsString> {
    std::env::var_os(name)
}

/// Key server address from `lookup`, falling back to `DEFAULT_SERVER` when
/// the variable is unset or empty.
pub fn server_address_with<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(SERVER_ENV)
        .filter(|addr| !addr.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string())
}

pub fn server_address() -> String {
    server_address_with(process_env)
}

/// Everything a command needs to talk to a key server.
#[derive(Debug)]
pub struct ClientConfig {
    pub server: Url,
    pub certificates: Vec<ClientCertificate>,
    /// Skip verification of the server certificate (`-k`).
    pub insecure: bool,
}

impl ClientConfig {
    /// Resolve server address and client credentials from `lookup`.
    ///
    /// Fails when the address is not an http(s) URL with a host, or when a
    /// configured client certificate cannot be loaded.
    pub fn from_env_with<F>(lookup: F, insecure: bool) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::resolve(
            &server_address_with(&lookup),
            || tls::client_certificates_with(&lookup),
            insecure,
        )
    }

    /// Process environment form. Certificate paths are read as raw OS
    /// strings, so a non-UTF-8 path is loaded rather than ignored.
    pub fn from_env(insecure: bool) -> Result<Self> {
        Self::resolve(&server_address(), tls::client_certificates, insecure)
    }

    fn resolve<C>(raw: &str, certificates: C, insecure: bool) -> Result<Self>
    where
        C: FnOnce() -> Result<Vec<ClientCertificate>, tls::TlsError>,
    {
        let server = parse_server_url(raw)?;
        let certificates =
            certificates().context("Cannot load TLS key or cert for client auth")?;
        Ok(Self {
            server,
            certificates,
            insecure,
        })
    }

    pub fn has_client_auth(&self) -> bool {
        !self.certificates.is_empty()
    }
}

fn parse_server_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid key server address '{raw}'"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("invalid key server address '{raw}': unsupported scheme '{other}'"),
    }
    if url.host_str().is_none_or(str::is_empty) {
        bail!("invalid key server address '{raw}': missing host");
    }
    Ok(url)
}

/* --------------------------------- Tests ---------------------------------- */
