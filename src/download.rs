//! HTTP downloads.
//!
//! A small wrapper around the blocking `reqwest` client: fetch a
//! URL and write the whole body to a file. Both failure families, a non-2xx
//! status and a transport error, are logged with the URL and returned as a
//! [`DownloadError`]. No retries and no partial-file cleanup: a failed
//! transfer can leave a truncated destination behind.

use std::fs::File;
use std::path::Path;

use log::{debug, error};

use crate::error::DownloadError;

/// Fetch `url` and write the response body to `dst`, replacing it.
pub fn download(url: &str, dst: &Path) -> Result<(), DownloadError> {
    debug!("downloading {} to {}", url, dst.display());

    let mut response = reqwest::blocking::get(url).map_err(|e| {
        error!("Cannot download {}, URL error: {}", url, e);
        DownloadError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        error!("Cannot download {}, HTTP error: {}", url, status.as_u16());
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = File::create(dst).map_err(|source| {
        error!("Cannot write {}: {}", dst.display(), source);
        DownloadError::Write {
            path: dst.to_path_buf(),
            source,
        }
    })?;
    let written = response.copy_to(&mut file).map_err(|e| {
        error!("Cannot download {}, transfer error: {}", url, e);
        DownloadError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    })?;
    debug!("downloaded {} bytes from {}", written, url);
    Ok(())
}
