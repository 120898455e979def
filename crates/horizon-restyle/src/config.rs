//! Session configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it
//! changes:
//!
//! ```toml
//! scratch_selector = "#devtools-probe"
//! lock_on_verification_failure = false
//!
//! [report]
//! no_url_placeholder = "<inline>"
//! indent = "    "
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::patch::DEFAULT_SCRATCH_SELECTOR;
use crate::report::ReportFormat;
use crate::{Error, Result};

/// Configuration for an [`EditSession`](crate::session::EditSession).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Selector of the throwaway rule used by the precheck probe.
    pub scratch_selector: String,
    /// Refuse further edits on a stylesheet after a verification failure.
    pub lock_on_verification_failure: bool,
    /// Change report text.
    pub report: ReportFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scratch_selector: DEFAULT_SCRATCH_SELECTOR.to_string(),
            lock_on_verification_failure: true,
            report: ReportFormat::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Set the probe's scratch selector.
    pub fn scratch_selector(mut self, selector: impl Into<String>) -> Self {
        self.scratch_selector = selector.into();
        self
    }

    /// Enable or disable locking after a verification failure.
    pub fn lock_on_verification_failure(mut self, enabled: bool) -> Self {
        self.lock_on_verification_failure = enabled;
        self
    }

    /// Set the header used for stylesheets without an origin.
    pub fn no_url_placeholder(mut self, text: impl Into<String>) -> Self {
        self.report.no_url_placeholder = text.into();
        self
    }

    /// Set the report text used when nothing changed.
    pub fn empty_report_placeholder(mut self, text: impl Into<String>) -> Self {
        self.report.empty_placeholder = text.into();
        self
    }

    /// Set the declaration indent of report blocks.
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.report.indent = indent.into();
        self
    }

    /// Check the settings the builder methods accept unchecked.
    pub fn validate(&self) -> Result<()> {
        if self.scratch_selector.trim().is_empty() {
            return Err(Error::Config {
                message: "scratch_selector must not be empty".to_string(),
            });
        }
        if self.scratch_selector.contains(['{', '}', ';']) {
            return Err(Error::Config {
                message: format!(
                    "scratch_selector '{}' must not contain block delimiters",
                    self.scratch_selector
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.scratch_selector, DEFAULT_SCRATCH_SELECTOR);
        assert!(config.lock_on_verification_failure);
        assert_eq!(config.report.empty_placeholder, "/* No changes */");
        assert_eq!(config.report.no_url_placeholder, "(no URL)");
    }

    #[test]
    fn builder() {
        let config = SessionConfig::new()
            .scratch_selector("#scratch")
            .lock_on_verification_failure(false)
            .indent("\t")
            .empty_report_placeholder("nothing");

        assert_eq!(config.scratch_selector, "#scratch");
        assert!(!config.lock_on_verification_failure);
        assert_eq!(config.report.indent, "\t");
        assert_eq!(config.report.empty_placeholder, "nothing");
        assert_eq!(config.report.no_url_placeholder, "(no URL)");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_selector_is_validated() {
        for selector in ["", "   ", "a;b", "}"] {
            let config = SessionConfig::new().scratch_selector(selector);
            assert!(matches!(config.validate(), Err(Error::Config { .. })), "{selector:?}");
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            lock_on_verification_failure = false

            [report]
            indent = "    "
            "#,
        )
        .unwrap();

        assert!(!config.lock_on_verification_failure);
        assert_eq!(config.report.indent, "    ");
        assert_eq!(config.scratch_selector, DEFAULT_SCRATCH_SELECTOR);
        assert_eq!(config.report.empty_placeholder, "/* No changes */");
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(SessionConfig::from_toml_str("").unwrap(), SessionConfig::default());
    }

    #[test]
    fn invalid_toml() {
        let err = SessionConfig::from_toml_str("lock_on_verification_failure = \"yes\"").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = SessionConfig::from_toml_str("scratch_selector = \"a { b\"").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scratch_selector = \"#from-file\"").unwrap();

        let config = SessionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.scratch_selector, "#from-file");
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
