//! The host rule-list capability the engine patches against.

/// Errors reported by a [`RuleHost`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Index outside `0..len` (or `0..=len` for inserts).
    #[error("Rule index {index} out of range (rule list has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The host refused to parse the rule text.
    #[error("Host rejected rule '{text}': {reason}")]
    Rejected { text: String, reason: String },

    /// The host denies access to the rule list.
    #[error("Access to the rule list was denied")]
    AccessDenied,
}

impl HostError {
    /// Create a rejection error.
    pub fn rejected(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

/// Kind of an entry in a host rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRuleKind {
    /// A plain `selector { declarations }` rule.
    Style,
    /// An at-rule (`@media`, `@import`, ...), named without the `@`.
    At(String),
}

impl HostRuleKind {
    /// Classify rule text.
    pub fn of_text(text: &str) -> Self {
        match text.trim_start().strip_prefix('@') {
            Some(rest) => {
                let name: String = rest
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect();
                Self::At(name.to_ascii_lowercase())
            }
            None => Self::Style,
        }
    }

    /// Whether this is a plain style rule.
    pub fn is_style(&self) -> bool {
        matches!(self, Self::Style)
    }
}

/// A live, ordered, host-normalizing rule collection.
///
/// The only mutations are whole-rule inserts and deletes. Hosts may rewrite
/// inserted text (normalize whitespace, case, values) or drop declarations
/// they do not understand; the engine reads rules back to find out.
pub trait RuleHost {
    /// Number of rules currently in the list.
    fn rule_count(&self) -> usize;

    /// Text of the rule at `index` as the host stores it.
    fn rule_text_at(&self, index: usize) -> Result<String, HostError>;

    /// Insert `text` so that it ends up at `index`.
    fn insert_rule_at(&mut self, index: usize, text: &str) -> Result<(), HostError>;

    /// Delete the rule at `index`.
    fn delete_rule_at(&mut self, index: usize) -> Result<(), HostError>;

    /// Classify the rule at `index`.
    fn rule_kind_at(&self, index: usize) -> Result<HostRuleKind, HostError> {
        self.rule_text_at(index).map(|text| HostRuleKind::of_text(&text))
    }
}

impl<H: RuleHost + ?Sized> RuleHost for Box<H> {
    fn rule_count(&self) -> usize {
        (**self).rule_count()
    }

    fn rule_text_at(&self, index: usize) -> Result<String, HostError> {
        (**self).rule_text_at(index)
    }

    fn insert_rule_at(&mut self, index: usize, text: &str) -> Result<(), HostError> {
        (**self).insert_rule_at(index, text)
    }

    fn delete_rule_at(&mut self, index: usize) -> Result<(), HostError> {
        (**self).delete_rule_at(index)
    }

    fn rule_kind_at(&self, index: usize) -> Result<HostRuleKind, HostError> {
        (**self).rule_kind_at(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_rule_text() {
        assert_eq!(HostRuleKind::of_text("h1 { color: red; }"), HostRuleKind::Style);
        assert_eq!(
            HostRuleKind::of_text("@media screen { h1 { color: red; } }"),
            HostRuleKind::At("media".into())
        );
        assert_eq!(
            HostRuleKind::of_text("  @IMPORT url(a.css);"),
            HostRuleKind::At("import".into())
        );
        assert_eq!(
            HostRuleKind::of_text("@font-face { font-family: x; }"),
            HostRuleKind::At("font-face".into())
        );
    }
}
