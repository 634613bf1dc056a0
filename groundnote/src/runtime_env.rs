//! Process environment setup shared by the `ask` and `serve` commands.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static TLS_CERT_PATH: OnceLock<Option<String>> = OnceLock::new();

const CA_BUNDLE_CANDIDATES: [&str; 4] = [
    "/etc/ssl/cert.pem",                  // macOS
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // Fedora/RHEL
    "/etc/ssl/certs/ca-bundle.crt",       // Alpine/openSUSE
];

/// Point `SSL_CERT_FILE` at a CA bundle so the upstream HTTPS client can
/// verify the Gemini endpoint. Resolved once per process.
pub fn ensure_tls_cert_env() -> Option<String> {
    TLS_CERT_PATH
        .get_or_init(|| {
            if let Some(existing) = non_blank_var("SSL_CERT_FILE") {
                return Some(existing);
            }

            let nix_bundle = non_blank_var("NIX_SSL_CERT_FILE")
                .filter(|bundle| Path::new(bundle).exists());
            let bundle = nix_bundle.or_else(|| {
                CA_BUNDLE_CANDIDATES
                    .iter()
                    .find(|candidate| Path::new(candidate).exists())
                    .map(|candidate| candidate.to_string())
            })?;

            std::env::set_var("SSL_CERT_FILE", &bundle);
            Some(bundle)
        })
        .clone()
}

/// Load the nearest `.env` from `start` or its ancestors. Returns the path
/// that was loaded, if any.
pub fn load_env_file(start: &Path) -> Option<PathBuf> {
    let candidate = find_env_file(start);
    match &candidate {
        Some(path) => match dotenvy::from_path(path) {
            Ok(()) => tracing::info!(path = %path.display(), "Loaded environment from .env"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load .env file");
                return None;
            }
        },
        None => tracing::debug!(
            start = %start.display(),
            "No .env file found; using process environment only"
        ),
    }
    candidate
}

fn find_env_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(".env"))
        .find(|candidate| candidate.is_file())
}

fn non_blank_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
