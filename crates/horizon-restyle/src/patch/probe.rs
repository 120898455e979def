//! Precheck probe: learn how the host normalizes a value before a live edit.

use crate::host::{MemoryRuleList, RuleHost};
use crate::logging::targets;
use crate::parser::{parse_block, serialize_single};
use crate::{Error, Result};

/// Selector of the scratch rule when none is configured.
pub const DEFAULT_SCRATCH_SELECTOR: &str = "#__restyle_probe__";

/// Runs throwaway insert/read/delete cycles on a scratch stylesheet.
///
/// The scratch stylesheet is never rendered, so probing has no visible
/// effect. Every successful insert is paired with a delete, leaving the
/// scratch rule count unchanged.
pub struct PrecheckProbe {
    host: Box<dyn RuleHost>,
    selector: String,
}

impl PrecheckProbe {
    /// Probe against `host` using rules with `selector`.
    pub fn new(host: Box<dyn RuleHost>, selector: impl Into<String>) -> Self {
        Self {
            host,
            selector: selector.into(),
        }
    }

    /// The scratch host.
    pub fn host(&self) -> &dyn RuleHost {
        self.host.as_ref()
    }

    /// Selector of the scratch rule.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Return the value the host would store for `property: value`.
    ///
    /// Fails with [`Error::InvalidValue`] when the value contains `;`, when
    /// the host rejects the rule, or when the host does not store exactly
    /// one declaration of `property`.
    #[tracing::instrument(skip(self), target = "horizon_restyle::probe", level = "debug")]
    pub fn test_value(&mut self, property: &str, value: &str) -> Result<String> {
        if value.contains(';') {
            return Err(Error::invalid_value(
                property,
                value,
                "value must not contain ';'",
            ));
        }

        let index = self.host.rule_count();
        let text = serialize_single(&self.selector, property, value);

        if let Err(e) = self.host.insert_rule_at(index, &text) {
            tracing::warn!(target: targets::PROBE, "host rejected probe rule: {}", e);
            return Err(Error::invalid_value(property, value, e.to_string()));
        }

        let read_back = self.host.rule_text_at(index);
        self.host.delete_rule_at(index)?;
        let read_back = read_back?;

        match stored_value(&read_back, property) {
            Ok(normalized) => {
                tracing::debug!(target: targets::PROBE, %normalized, "probe accepted value");
                Ok(normalized)
            }
            Err(reason) => {
                tracing::warn!(target: targets::PROBE, %read_back, %reason, "probe refused value");
                Err(Error::invalid_value(property, value, reason))
            }
        }
    }
}

impl Default for PrecheckProbe {
    fn default() -> Self {
        Self::new(Box::new(MemoryRuleList::new()), DEFAULT_SCRATCH_SELECTOR)
    }
}

impl std::fmt::Debug for PrecheckProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecheckProbe")
            .field("selector", &self.selector)
            .field("scratch_rules", &self.host.rule_count())
            .finish()
    }
}

fn stored_value(read_back: &str, property: &str) -> std::result::Result<String, String> {
    let block = parse_block(read_back).map_err(|e| format!("host stored unparsable text: {e}"))?;
    match block.declarations.as_slice() {
        [] => Err("not accepted by the host".to_string()),
        [only] if only.is_named(property) => Ok(only.value.clone()),
        [only] => Err(format!("host stored property '{}' instead", only.name)),
        many => Err(format!("host expanded the value into {} declarations", many.len())),
    }
}
