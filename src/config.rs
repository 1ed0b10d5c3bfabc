//! # INI Configuration
//!
//! This module holds the `Config` value shared by every provisioning
//! component. It wraps a `rust-ini` document and adds the lookups the
//! components need:
//!
//! - **`get`**: an interpolated string value. `%(name)s` references resolve
//!   against the same section first and then the `[common]` section, `%%` is
//!   a literal percent sign.
//! - **`get_list`**: a value split on commas and newlines, trimmed, with empty
//!   items dropped.
//! - **`set`**: used by the entry points to layer command line overrides on
//!   top of the file. After that the configuration is handed out as `&Config`
//!   and never mutated again.
//! - **`write_to`**: serializes the raw values back to INI. The release runner
//!   uses this to turn the live configuration into its own config file.
//!
//! Option names are case-insensitive: they are lowercased on load and on
//! lookup.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use ini::{Ini, ParseOption};

use crate::error::ConfigError;

/// Section consulted when a `%(name)s` reference is not found locally.
pub const COMMON_SECTION: &str = "common";

/// Maximum nesting of `%(name)s` references.
const MAX_INTERPOLATION_DEPTH: usize = 10;

/// Indentation of value continuation lines when writing.
const CONTINUATION_INDENT: &str = "    ";

/// Raw values, `%(name)s` untouched, and values continued on indented lines:
///
/// ```ini
/// create_master =
///     make
///     -f Makefile.setup
/// ```
fn parse_option() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        enabled_indented_mutiline_value: true,
        ..ParseOption::default()
    }
}

/// Section/option/value store read from an INI file.
#[derive(Debug, Clone, Default)]
pub struct Config {
    ini: Ini,
}

/// Load a configuration file from disk.
pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
    let ini = Ini::load_from_file_opt(path, parse_option()).map_err(|e| ConfigError::Load {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(Config::from_ini(ini))
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let ini = Ini::load_from_str_opt(content, parse_option()).map_err(|e| ConfigError::Load {
            path: "<string>".into(),
            message: e.to_string(),
        })?;
        Ok(Config::from_ini(ini))
    }
}

impl Config {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    fn from_ini(source: Ini) -> Self {
        let mut ini = Ini::new();
        for (section, properties) in source.iter() {
            let Some(section) = section else {
                continue;
            };
            // make sure empty sections survive
            ini.with_section(Some(section));
            for (key, value) in properties.iter() {
                ini.with_section(Some(section))
                    .set(key.to_ascii_lowercase(), value);
            }
        }
        Self { ini }
    }

    fn has_section(&self, section: &str) -> bool {
        self.ini.section(Some(section)).is_some()
    }

    /// Returns `true` if the option is present in the section.
    pub fn has_option(&self, section: &str, option: &str) -> bool {
        self.raw(section, option).is_some()
    }

    fn raw(&self, section: &str, option: &str) -> Option<&str> {
        self.ini
            .section(Some(section))
            .and_then(|properties| properties.get(option.to_ascii_lowercase()))
    }

    /// Get the interpolated value of an option.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingSection`] / [`ConfigError::MissingOption`] when
    ///   the lookup fails.
    /// - [`ConfigError::Interpolation`] when a `%(name)s` reference cannot be
    ///   resolved.
    pub fn get(&self, section: &str, option: &str) -> Result<String, ConfigError> {
        if !self.has_section(section) {
            return Err(ConfigError::MissingSection {
                section: section.to_string(),
            });
        }
        let raw = self
            .raw(section, option)
            .ok_or_else(|| ConfigError::MissingOption {
                section: section.to_string(),
                option: option.to_ascii_lowercase(),
            })?;
        self.interpolate(section, option, raw, 0)
    }

    /// Like [`Config::get`], but a missing section or option is `Ok(None)`.
    pub fn get_opt(&self, section: &str, option: &str) -> Result<Option<String>, ConfigError> {
        match self.raw(section, option) {
            Some(raw) => self.interpolate(section, option, raw, 0).map(Some),
            None => Ok(None),
        }
    }

    /// Get an option as an ordered list of comma or newline separated items.
    pub fn get_list(&self, section: &str, option: &str) -> Result<Vec<String>, ConfigError> {
        Ok(split_list(&self.get(section, option)?))
    }

    /// Set an option, creating the section when needed.
    pub fn set(&mut self, section: &str, option: &str, value: &str) {
        self.ini
            .with_section(Some(section))
            .set(option.to_ascii_lowercase(), value);
    }

    /// Apply a `SECTION.OPTION=VALUE` command line override.
    pub fn set_override(&mut self, spec: &str) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::Invalid {
            section: "<override>".to_string(),
            option: spec.to_string(),
            message: message.to_string(),
        };
        let (key, value) = spec
            .split_once('=')
            .ok_or_else(|| invalid("expected SECTION.OPTION=VALUE"))?;
        let (section, option) = key
            .trim()
            .rsplit_once('.')
            .ok_or_else(|| invalid("expected SECTION.OPTION before '='"))?;
        if section.is_empty() || option.is_empty() {
            return Err(invalid("section and option must not be empty"));
        }
        self.set(section, option, value.trim());
        Ok(())
    }

    /// Serialize the raw (uninterpolated) configuration to `path`.
    ///
    /// Multi-line values are written with indented continuation lines, so
    /// the file loads back to the same values.
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    fn interpolate(
        &self,
        section: &str,
        option: &str,
        raw: &str,
        depth: usize,
    ) -> Result<String, ConfigError> {
        let error = |message: String| ConfigError::Interpolation {
            section: section.to_string(),
            option: option.to_ascii_lowercase(),
            message,
        };
        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(error(format!(
                "more than {} levels of %(name)s references",
                MAX_INTERPOLATION_DEPTH
            )));
        }

        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            if let Some(after) = tail.strip_prefix('%') {
                out.push('%');
                rest = after;
            } else if let Some(reference) = tail.strip_prefix('(') {
                let end = reference
                    .find(")s")
                    .ok_or_else(|| error(format!("unterminated reference in '{}'", raw)))?;
                let name = reference[..end].to_ascii_lowercase();
                let (found_in, value) = match self.raw(section, &name) {
                    Some(value) => (section, value),
                    None => (
                        COMMON_SECTION,
                        self.raw(COMMON_SECTION, &name).ok_or_else(|| {
                            error(format!("no option '{}' to substitute", name))
                        })?,
                    ),
                };
                out.push_str(&self.interpolate(found_in, &name, value, depth + 1)?);
                rest = &reference[end + 2..];
            } else {
                // a lone percent sign (e.g. an url-encoded character)
                out.push('%');
                rest = tail;
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (section, properties) in self.ini.iter() {
            let Some(section) = section else {
                continue;
            };
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "[{}]", section)?;
            for (key, value) in properties.iter() {
                let mut lines = value.split('\n');
                write!(f, "{} = {}", key, lines.next().unwrap_or_default())?;
                for line in lines {
                    write!(f, "\n{}{}", CONTINUATION_INDENT, line)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Split a comma/newline separated value into trimmed, non-empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
