//! Path templates with `{package}` / `{version}` placeholders.
//!
//! Repository backends address packages through templates like
//! `repo/{package}-{version}`. Expansion substitutes concrete values;
//! capture runs the template in reverse against a listed path to mine the
//! version out of it, which is how open constraints are enumerated from
//! backends that only expose file listings.

use std::collections::BTreeMap;

use regex::Regex;

use asbo_util::errors::AsboError;

/// Placeholder name for the package.
pub const PACKAGE_VAR: &str = "package";

/// Placeholder name for the version.
pub const VERSION_VAR: &str = "version";

/// A path or identifier template containing `{var}` placeholders.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
}

impl PathTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Substitute `{package}` and `{version}` with concrete values.
    pub fn expand(&self, package: &str, version: &str) -> String {
        self.raw
            .replace("{package}", package)
            .replace("{version}", version)
    }

    /// The literal text before the first placeholder.
    ///
    /// Backends use this as the starting directory when walking listings.
    pub fn literal_prefix(&self) -> &str {
        match self.raw.find('{') {
            Some(idx) => &self.raw[..idx],
            None => &self.raw,
        }
    }

    /// Match `text` against the template, extracting placeholder values.
    ///
    /// Returns `None` when the text does not have the template's shape.
    /// Placeholders match greedily within a single path segment.
    pub fn capture(&self, text: &str) -> Result<Option<BTreeMap<String, String>>, AsboError> {
        let mut pattern = String::from("^");
        let mut rest = self.raw.as_str();
        while let Some(start) = rest.find('{') {
            let (literal, tail) = rest.split_at(start);
            pattern.push_str(&regex::escape(literal));
            let end = tail.find('}').ok_or_else(|| AsboError::Parse {
                message: format!("unterminated placeholder in template '{}'", self.raw),
            })?;
            let name = &tail[1..end];
            pattern.push_str(&format!("(?P<{name}>[^/]+?)"));
            rest = &tail[end + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');

        let re = Regex::new(&pattern).map_err(|e| AsboError::Parse {
            message: format!("template '{}' does not compile: {e}", self.raw),
        })?;

        Ok(re.captures(text).map(|caps| {
            re.capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect()
        }))
    }

    /// Extract the `{version}` value from a listed path, if it matches.
    pub fn capture_version(&self, package: &str, text: &str) -> Option<String> {
        let caps = self.capture(text).ok()??;
        if let Some(p) = caps.get(PACKAGE_VAR) {
            if p != package {
                return None;
            }
        }
        caps.get(VERSION_VAR).cloned()
    }
}
