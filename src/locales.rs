//! Shipped locales list.

use std::fs;

use log::{debug, error};
use tempfile::NamedTempFile;

use crate::defaults::DEFAULT_LOCALE;
use crate::download::download;
use crate::error::NoLocalesError;

/// Download the shipped locales list at `url`.
///
/// The list is fetched into a temporary file that is removed on every path.
/// Lines are trimmed; empty lines and the default locale are dropped and the
/// remaining entries keep their order.
pub fn shipped_locales(url: &str) -> Result<Vec<String>, NoLocalesError> {
    let temp_locales = NamedTempFile::new()?;
    if let Err(err) = download(url, temp_locales.path()) {
        error!("Unable to get locales list");
        return Err(err.into());
    }
    let content = fs::read_to_string(temp_locales.path())?;
    let locales = parse_locales(&content);
    debug!("locales: {:?}", locales);
    Ok(locales)
}

/// Parse a newline separated locales list.
pub fn parse_locales(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != DEFAULT_LOCALE)
        .map(str::to_string)
        .collect()
}
