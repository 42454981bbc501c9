/*!
Client TLS credentials.

A client certificate is configured through two environment variables:

  KEY_CLIENT_TLS_CERT_FILE   PEM certificate chain (leaf first)
  KEY_CLIENT_TLS_KEY_FILE    PEM private key (PKCS#8, PKCS#1 or SEC1)

Rules:
  - neither set          -> no client authentication (empty list, nothing read)
  - either one set       -> both files are loaded; a missing half is an error
  - paths are taken as raw OS strings, so non-UTF-8 paths are loaded as given
  - the key must belong to the leaf certificate
  - load failure         -> `TlsError`; the command boundary turns it into a
                            fatal diagnostic (exit status 1)

`load_key_pair` is also used by `kes server` for its own certificate.
*/

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use rustls::InconsistentKeys;
use rustls::sign::CertifiedKey;
use rustls_pki_types::pem::{self, PemObject};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;

use crate::config::{CLIENT_CERT_ENV, CLIENT_KEY_ENV, process_env_os};

/// Failure while loading a certificate / private key pair.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("no {0} file specified")]
    MissingPath(&'static str),

    #[error("failed to read '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid PEM data in '{}'", .path.display())]
    Pem {
        path: PathBuf,
        #[source]
        source: pem::Error,
    },

    #[error("no certificate found in '{}'", .0.display())]
    NoCertificate(PathBuf),

    #[error("unsupported private key in '{}'", .path.display())]
    UnsupportedKey {
        path: PathBuf,
        #[source]
        source: rustls::Error,
    },

    #[error(
        "private key '{}' does not match certificate '{}'",
        .key.display(),
        .cert.display()
    )]
    KeyMismatch {
        cert: PathBuf,
        key: PathBuf,
        #[source]
        source: rustls::Error,
    },
}

/// A certificate chain together with the private key of its leaf.
pub struct ClientCertificate {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl ClientCertificate {
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    pub fn key(&self) -> &PrivateKeyDer<'static> {
        &self.key
    }
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("chain_len", &self.chain.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

fn read(path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every certificate in a PEM file; at least one is required.
pub fn load_certificates(path: impl AsRef<Path>) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let path = path.as_ref();
    let pem = read(path)?;
    let chain = CertificateDer::pem_slice_iter(&pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Pem {
            path: path.to_path_buf(),
            source,
        })?;
    if chain.is_empty() {
        return Err(TlsError::NoCertificate(path.to_path_buf()));
    }
    Ok(chain)
}

/// Load a PEM certificate chain and private key.
///
/// The key must be of a type the TLS stack can sign with, and its public key
/// must be the one in the leaf certificate.
pub fn load_key_pair(
    cert_path: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
) -> Result<ClientCertificate, TlsError> {
    let cert_path = cert_path.as_ref();
    let key_path = key_path.as_ref();
    if cert_path.as_os_str().is_empty() {
        return Err(TlsError::MissingPath("certificate"));
    }
    if key_path.as_os_str().is_empty() {
        return Err(TlsError::MissingPath("private key"));
    }

    let chain = load_certificates(cert_path)?;

    let key_pem = read(key_path)?;
    let key = PrivateKeyDer::from_pem_slice(&key_pem).map_err(|source| TlsError::Pem {
        path: key_path.to_path_buf(),
        source,
    })?;
    let signer = rustls::crypto::ring::sign::any_supported_type(&key).map_err(|source| {
        TlsError::UnsupportedKey {
            path: key_path.to_path_buf(),
            source,
        }
    })?;
    match CertifiedKey::new(chain.clone(), signer).keys_match() {
        // Signer cannot report its public key: nothing to compare against.
        Ok(()) | Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => {}
        Err(source) => {
            return Err(TlsError::KeyMismatch {
                cert: cert_path.to_path_buf(),
                key: key_path.to_path_buf(),
                source,
            });
        }
    }

    Ok(ClientCertificate { chain, key })
}

/// Client certificates configured through `lookup`.
///
/// Returns an empty list when neither path variable is set; at most one pair
/// otherwise. The lookup may yield `String` or `OsString` values.
pub fn client_certificates_with<F, V>(lookup: F) -> Result<Vec<ClientCertificate>, TlsError>
where
    F: Fn(&str) -> Option<V>,
    V: Into<OsString>,
{
    let path = |name: &str| {
        PathBuf::from(lookup(name).map(Into::<OsString>::into).unwrap_or_default())
    };
    let (cert, key) = (path(CLIENT_CERT_ENV), path(CLIENT_KEY_ENV));
    if cert.as_os_str().is_empty() && key.as_os_str().is_empty() {
        return Ok(Vec::new());
    }
    crate::log_debug!(
        "loading client certificate '{}' (key '{}')",
        cert.display(),
        key.display()
    );
    Ok(vec![load_key_pair(cert, key)?])
}

/// Client certificates configured in the process environment.
pub fn client_certificates() -> Result<Vec<ClientCertificate>, TlsError> {
    client_certificates_with(process_env_os)
}

/* --------------------------------- Tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TESTDATA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/testdata");

    fn cert_file() -> String {
        format!("{TESTDATA}/client.crt")
    }

    fn key_file() -> String {
        format!("{TESTDATA}/client.key")
    }

    fn env(pairs: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn nothing_configured() {
        let certs = client_certificates_with(|_| None::<String>).unwrap();
        assert!(certs.is_empty());

        let certs = client_certificates_with(env(&[
            (CLIENT_CERT_ENV, String::new()),
            (CLIENT_KEY_ENV, String::new()),
        ]))
        .unwrap();
        assert!(certs.is_empty());
    }

    #[test]
    fn loads_one_pair() {
        let certs = client_certificates_with(env(&[
            (CLIENT_CERT_ENV, cert_file()),
            (CLIENT_KEY_ENV, key_file()),
        ]))
        .unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].chain().len(), 1);
        assert!(matches!(certs[0].key(), PrivateKeyDer::Pkcs8(_)));
    }

    #[test]
    fn half_configured_is_an_error() {
        let err = client_certificates_with(env(&[(CLIENT_CERT_ENV, cert_file())])).unwrap_err();
        assert!(matches!(err, TlsError::MissingPath("private key")));

        let err = client_certificates_with(env(&[(CLIENT_KEY_ENV, key_file())])).unwrap_err();
        assert!(matches!(err, TlsError::MissingPath("certificate")));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = client_certificates_with(env(&[
            (CLIENT_CERT_ENV, format!("{TESTDATA}/does-not-exist.crt")),
            (CLIENT_KEY_ENV, key_file()),
        ]))
        .unwrap_err();
        assert!(matches!(err, TlsError::Read { .. }));
        assert!(err.to_string().contains("does-not-exist.crt"));
    }

    #[test]
    fn key_file_without_certificate() {
        let err = load_key_pair(key_file(), key_file()).unwrap_err();
        assert!(matches!(err, TlsError::NoCertificate(_)));
    }

    #[test]
    fn certificate_without_key() {
        let err = load_key_pair(cert_file(), cert_file()).unwrap_err();
        assert!(matches!(err, TlsError::Pem { .. }));
    }

    #[test]
    fn key_from_another_pair_is_rejected() {
        let other = format!("{TESTDATA}/other.key");
        let err = load_key_pair(cert_file(), &other).unwrap_err();
        assert!(matches!(err, TlsError::KeyMismatch { .. }));
        assert!(err.to_string().contains("other.key"));
        assert!(err.to_string().contains("does not match certificate"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_are_not_ignored() {
        use std::os::unix::ffi::OsStringExt;

        let lookup = |name: &str| {
            let raw: &[u8] = match name {
                CLIENT_CERT_ENV => b"/nonexistent/\xffcert.pem",
                CLIENT_KEY_ENV => b"/nonexistent/\xffkey.pem",
                _ => return None,
            };
            Some(OsString::from_vec(raw.to_vec()))
        };
        let err = client_certificates_with(lookup).unwrap_err();
        assert!(matches!(err, TlsError::Read { .. }));
    }

    #[test]
    fn debug_output_hides_key() {
        let pair = load_key_pair(cert_file(), key_file()).unwrap();
        let dbg = format!("{pair:?}");
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains("Pkcs8"));
    }
}
