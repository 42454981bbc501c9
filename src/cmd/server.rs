/*!
`server.rs` - `kes server [options]`.

Validates the listener settings and loads the server certificate before
handing over to the key server itself:

  --addr       listen address (default 127.0.0.1:7373)
  --config     server configuration file
  --root       identity allowed to perform any operation (required)
  --tls-key    server private key (required)
  --tls-cert   server certificate (required)
  --mtls-auth  client certificate handling: verify (default) | ignore
*/

use std::fmt;

use anyhow::{Context, anyhow};

use crate::cmd::shared::{Invocation, unsupported};
use crate::error::CliError;
use crate::flags::FlagSet;
use crate::tls;

const SERVER_USAGE: &str = "usage: kes server [options]

Start a key server.";

const DEFAULT_ADDR: &str = "127.0.0.1:7373";

/// How the server treats client certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtlsAuth {
    Verify,
    Ignore,
}

impl MtlsAuth {
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verify" => Some(MtlsAuth::Verify),
            "ignore" => Some(MtlsAuth::Ignore),
            _ => None,
        }
    }
}

impl fmt::Display for MtlsAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MtlsAuth::Verify => "verify",
            MtlsAuth::Ignore => "ignore",
        })
    }
}

/// Validated `kes server` options.
#[derive(Debug)]
pub struct ServerOptions {
    pub addr: String,
    pub config: Option<String>,
    pub root: String,
    pub mtls_auth: MtlsAuth,
    pub certificate: tls::ClientCertificate,
}

fn flag_set() -> FlagSet {
    let mut set = FlagSet::new("server");
    set.string(&["addr"], DEFAULT_ADDR, "The address of the server")
        .string(&["config"], "", "Path to the server configuration file")
        .string(
            &["root"],
            "",
            "The identity of root - which can perform any operation",
        )
        .string(&["tls-key"], "", "Path to the TLS private key")
        .string(&["tls-cert"], "", "Path to the TLS certificate")
        .string(
            &["mtls-auth"],
            "verify",
            "Controls how the server handles client certificates (verify|ignore)",
        );
    set
}

/// Turn parsed flags into `ServerOptions`. Missing required settings are
/// fatal; a leftover positional is a usage error.
pub fn server_options(inv: &Invocation) -> Result<ServerOptions, CliError> {
    inv.expect_args(0, 0)?;
    let flags = &inv.flags;

    let root = flags.get_str("root");
    if root.is_empty() {
        return Err(anyhow!("no root identity specified (--root)").into());
    }
    let mtls_auth = MtlsAuth::from_str_ci(flags.get_str("mtls-auth")).ok_or_else(|| {
        anyhow!(
            "invalid option for --mtls-auth: '{}' (expected verify or ignore)",
            flags.get_str("mtls-auth")
        )
    })?;
    let (key, cert) = (flags.get_str("tls-key"), flags.get_str("tls-cert"));
    if key.is_empty() || cert.is_empty() {
        return Err(anyhow!("no TLS private key or certificate specified (--tls-key, --tls-cert)").into());
    }
    let certificate =
        tls::load_key_pair(cert, key).context("Cannot load TLS key or cert for the server")?;
    let config = Some(flags.get_str("config"))
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(ServerOptions {
        addr: flags.get_str("addr").to_string(),
        config,
        root: root.to_string(),
        mtls_auth,
        certificate,
    })
}

pub fn execute_server(args: &[String]) -> Result<(), CliError> {
    let inv = Invocation::parse(flag_set(), SERVER_USAGE, args)?;
    let opts = server_options(&inv)?;
    crate::log_info!(
        "server: addr={} root={} mtls-auth={} config={}",
        opts.addr,
        opts.root,
        opts.mtls_auth,
        opts.config.as_deref().unwrap_or("<none>")
    );
    Err(unsupported("start key server", &opts.addr))
}

/* --------------------------------- Tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    const TESTDATA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/testdata");

    fn parse(list: &[&str]) -> Result<ServerOptions, CliError> {
        let args: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        let inv = Invocation::parse(flag_set(), SERVER_USAGE, &args)?;
        server_options(&inv)
    }

    fn tls_flags() -> [String; 2] {
        [
            format!("--tls-key={TESTDATA}/client.key"),
            format!("--tls-cert={TESTDATA}/client.crt"),
        ]
    }

    #[test]
    fn valid_options() {
        let [key, cert] = tls_flags();
        let opts = parse(&["server", "--root=abc", key.as_str(), cert.as_str(), "--mtls-auth=Ignore"]).unwrap();
        assert_eq!(opts.addr, DEFAULT_ADDR);
        assert_eq!(opts.root, "abc");
        assert_eq!(opts.mtls_auth, MtlsAuth::Ignore);
        assert!(opts.config.is_none());
        assert_eq!(opts.certificate.chain().len(), 1);
    }

    #[test]
    fn root_is_required() {
        let [key, cert] = tls_flags();
        let err = parse(&["server", key.as_str(), cert.as_str()]).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("no root identity"));
    }

    #[test]
    fn bad_mtls_mode() {
        let [key, cert] = tls_flags();
        let err = parse(&["server", "--root=abc", key.as_str(), cert.as_str(), "--mtls-auth=maybe"]).unwrap_err();
        assert!(err.to_string().contains("invalid option for --mtls-auth"));
    }

    #[test]
    fn positional_is_usage_error() {
        let err = parse(&["server", "extra"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn help_is_server_usage() {
        match parse(&["server", "-h"]) {
            Err(CliError::Help(usage)) => {
                assert!(usage.starts_with("usage: kes server [options]"));
                assert!(usage.contains("--addr=<value>"));
                assert!(usage.contains("(default: 127.0.0.1:7373)"));
            }
            other => panic!("expected help, got {other:?}"),
        }
    }
}
