//! TLS trust for collectors that present a private or self-signed certificate.

use std::{fs, path::Path, sync::Arc};

use anyhow::{bail, Context};
use rustls::{ClientConfig, RootCertStore};

/// Install the process-wide rustls crypto provider. Safe to call more than once.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Read a PEM bundle and build a client config that trusts exactly those CAs.
pub fn client_config_with_ca(path: &Path) -> anyhow::Result<Arc<ClientConfig>> {
    install_crypto_provider();

    let pem = fs::read(path).with_context(|| format!("reading CA bundle {}", path.display()))?;
    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut pem.as_slice()) {
        let cert = cert.with_context(|| format!("parsing {}", path.display()))?;
        roots.add(cert)?;
    }
    if roots.is_empty() {
        bail!("no certificates found in {}", path.display());
    }

    let cfg = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(cfg))
}

/// Same bundle in the form the HTTP client wants.
pub fn reqwest_certificates(path: &Path) -> anyhow::Result<Vec<reqwest::Certificate>> {
    let pem = fs::read(path).with_context(|| format!("reading CA bundle {}", path.display()))?;
    let certs = reqwest::Certificate::from_pem_bundle(&pem)
        .with_context(|| format!("parsing {}", path.display()))?;
    if certs.is_empty() {
        bail!("no certificates found in {}", path.display());
    }
    Ok(certs)
}
