//! Artifact downloading from Maven repositories.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

use channel_util::config::ResolverConfig;
use channel_util::errors::ChannelError;

use crate::auth;
use crate::repository::MavenRepository;

/// Build a shared reqwest client tuned by `config`.
pub fn build_client(config: &ResolverConfig) -> Result<Client, ChannelError> {
    Client::builder()
        .timeout(config.request_timeout)
        .user_agent("channel-resolver/0.1")
        .build()
        .map_err(|e| ChannelError::Network {
            message: format!("failed to create HTTP client: {e}"),
        })
}

/// Download raw bytes from a URL, with authentication and retries.
///
/// Returns `Ok(None)` for a 404 (the artifact isn't in this repository,
/// which is routine when a session's combined backend probes several
/// repositories for the same coordinate).
pub async fn download_bytes(
    client: &Client,
    repo: &MavenRepository,
    url: &str,
    config: &ResolverConfig,
) -> Result<Option<Vec<u8>>, ChannelError> {
    let mut last_err = String::new();

    for attempt in 0..config.retry_attempts {
        if attempt > 0 {
            tokio::time::sleep(config.retry_base_delay * attempt).await;
        }

        let mut req = client.get(url);
        req = auth::apply_auth(req, repo);

        match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if status.is_server_error() {
                    last_err = format!("HTTP {status} from {url}");
                    continue;
                }
                if !status.is_success() {
                    return Err(ChannelError::Network {
                        message: format!("HTTP {status} fetching {url}"),
                    });
                }

                let bytes = resp.bytes().await.map_err(|e| ChannelError::Network {
                    message: format!("failed to read response from {url}: {e}"),
                })?;
                return Ok(Some(bytes.to_vec()));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = format!("{e}");
                continue;
            }
            Err(e) => {
                return Err(ChannelError::Network {
                    message: format!("request to {url} failed: {e}"),
                })
            }
        }
    }

    Err(ChannelError::Network {
        message: format!(
            "failed after {} retries for {url}: {last_err}",
            config.retry_attempts
        ),
    })
}

/// Download a text file (metadata, manifest documents).
pub async fn download_text(
    client: &Client,
    repo: &MavenRepository,
    url: &str,
    config: &ResolverConfig,
) -> Result<Option<String>, ChannelError> {
    match download_bytes(client, repo, url, config).await? {
        Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).to_string())),
        None => Ok(None),
    }
}

/// Download an artifact file into a fresh temp file, returning its path.
///
/// Files larger than 100KB get a progress bar, matching the bundled
/// backend's interactive-download behavior.
pub async fn download_to_file(
    client: &Client,
    repo: &MavenRepository,
    url: &str,
    label: &str,
) -> Result<Option<PathBuf>, ChannelError> {
    let mut req = client.get(url);
    req = auth::apply_auth(req, repo);

    let resp = req.send().await.map_err(|e| ChannelError::Network {
        message: format!("request to {url} failed: {e}"),
    })?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !resp.status().is_success() {
        return Err(ChannelError::Network {
            message: format!("HTTP {} fetching {url}", resp.status()),
        });
    }

    let total = resp.content_length().unwrap_or(0);
    let pb = if total > 100_000 {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::with_template("  {msg} {bar:30.cyan/dim} {bytes}/{total_bytes}")
                .unwrap()
                .progress_chars("##-"),
        );
        pb.set_message(label.to_string());
        Some(pb)
    } else {
        None
    };

    let bytes = resp.bytes().await.map_err(|e| ChannelError::Network {
        message: format!("failed to read {url}: {e}"),
    })?;

    if let Some(pb) = &pb {
        pb.set_position(bytes.len() as u64);
        pb.finish_and_clear();
    }

    let file = tempfile::Builder::new()
        .prefix("channel-resolver-")
        .tempfile()
        .map_err(ChannelError::Io)?;
    let (_, path) = file.keep().map_err(|e| ChannelError::Io(e.error))?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(ChannelError::Io)?;

    Ok(Some(path))
}
