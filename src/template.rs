//! `@TOKEN@` template substitution.
//!
//! Generates JSON configuration files (`master.json`,
//! `production-masters.json`) from templates whose placeholders name
//! configuration options:
//!
//! ```text
//! "basedir": "@BASEDIR@",          ->   "basedir": "/srv/master",
//! ```
//!
//! Every token on a line is replaced with the value of the lowercased option
//! in the given section. Lines without tokens, including lines with a lone
//! `@`, are copied unchanged.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use log::debug;
use regex::{Captures, Regex};

use crate::config::Config;
use crate::error::{ConfigError, TemplateError};

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([A-Za-z0-9_]+)@").expect("valid token pattern"))
}

/// Replace every `@NAME@` token in `line` using `lookup(NAME)`.
pub fn substitute_line<F>(line: &str, mut lookup: F) -> Result<String, TemplateError>
where
    F: FnMut(&str) -> Result<String, ConfigError>,
{
    let mut failure = None;
    let replaced = token_pattern().replace_all(line, |caps: &Captures<'_>| {
        let token = &caps[1];
        match lookup(token) {
            Ok(value) => value,
            Err(source) => {
                if failure.is_none() {
                    failure = Some(TemplateError::Token {
                        token: token.to_string(),
                        source,
                    });
                }
                caps[0].to_string()
            }
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(replaced.into_owned()),
    }
}

/// Render template text with values from `section` of `config`.
pub fn render(config: &Config, section: &str, template: &str) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    for line in template.split_inclusive('\n') {
        rendered.push_str(&substitute_line(line, |token| {
            config.get(section, &token.to_ascii_lowercase())
        })?);
    }
    Ok(rendered)
}

/// Generate `dst` from the `@TOKEN@` template at `template`.
pub fn generate_master_json(
    config: &Config,
    section: &str,
    template: &Path,
    dst: &Path,
) -> Result<(), TemplateError> {
    let content = fs::read_to_string(template).map_err(|source| TemplateError::Io {
        path: template.to_path_buf(),
        source,
    })?;
    let rendered = render(config, section, &content)?;
    if !rendered.is_empty() {
        debug!("writing {}:\n{}", dst.display(), rendered);
    }
    fs::write(dst, rendered).map_err(|source| TemplateError::Io {
        path: dst.to_path_buf(),
        source,
    })
}
