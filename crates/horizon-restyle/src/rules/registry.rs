//! Loading host rules into logical rules.

use crate::host::RuleHost;
use crate::logging::targets;
use crate::parser::parse_block;
use crate::rules::LogicalRule;
use crate::{Error, Result};

/// The style rules of one host list, indexed by logical index.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<LogicalRule>,
}

impl RuleRegistry {
    /// Load every plain style rule of `host`.
    ///
    /// At-rules are skipped: they take up host positions but get no logical
    /// index. A style rule that does not parse fails the whole load.
    pub fn load<H: RuleHost + ?Sized>(host: &H) -> Result<Self> {
        let count = host.rule_count();
        let mut rules = vec![];

        for host_index in 0..count {
            if !host.rule_kind_at(host_index)?.is_style() {
                tracing::trace!(target: targets::REGISTRY, host_index, "skipping non-style rule");
                continue;
            }
            let text = host.rule_text_at(host_index)?;
            let block = parse_block(&text)?;
            rules.push(LogicalRule::from_block(rules.len(), host_index, block));
        }

        tracing::debug!(
            target: targets::REGISTRY,
            host_rules = count,
            style_rules = rules.len(),
            "loaded rule registry"
        );

        Ok(Self { rules })
    }

    /// Look up a rule by logical index.
    pub fn get_by_logical_index(&self, index: usize) -> Result<&LogicalRule> {
        self.rules.get(index).ok_or(Error::NotFound {
            index,
            len: self.rules.len(),
        })
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Result<&mut LogicalRule> {
        let len = self.rules.len();
        self.rules.get_mut(index).ok_or(Error::NotFound { index, len })
    }

    /// All rules in logical order.
    pub fn rules(&self) -> &[LogicalRule] {
        &self.rules
    }

    /// Iterate over rules in logical order.
    pub fn iter(&self) -> impl Iterator<Item = &LogicalRule> {
        self.rules.iter()
    }

    /// Number of style rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no style rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether any declaration of any rule is changed.
    pub fn has_changes(&self) -> bool {
        self.rules.iter().any(LogicalRule::has_changes)
    }

    /// Account for a rule inserted at `host_index`.
    ///
    /// Every rule at or after `host_index` moves down one slot, except
    /// `owner`, whose override was inserted.
    pub(crate) fn shift_after_insert(&mut self, host_index: usize, owner: usize) {
        for rule in &mut self.rules {
            if rule.logical_index() != owner && rule.host_index >= host_index {
                rule.host_index += 1;
            }
        }
    }

    /// Account for the rule at `host_index` having been deleted.
    ///
    /// Every rule after `host_index` moves up one slot, except `owner`,
    /// whose override was deleted.
    pub(crate) fn shift_after_delete(&mut self, host_index: usize, owner: usize) {
        for rule in &mut self.rules {
            if rule.logical_index() != owner && rule.host_index > host_index {
                rule.host_index -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryRuleList;

    #[test]
    fn load_skips_at_rules() {
        let host = MemoryRuleList::from_css(
            r#"
            @charset "utf-8";
            h1 { color: red; }
            @media print { h1 { color: black; } }
            p { margin: 0; }
            "#,
        );
        let registry = RuleRegistry::load(&host).unwrap();

        assert_eq!(registry.len(), 2);

        let h1 = registry.get_by_logical_index(0).unwrap();
        assert_eq!(h1.selector_text(), "h1");
        assert_eq!(h1.host_index(), 1);

        let p = registry.get_by_logical_index(1).unwrap();
        assert_eq!(p.selector_text(), "p");
        assert_eq!(p.logical_index(), 1);
        assert_eq!(p.host_index(), 3);
        assert_eq!(p.declaration("margin").unwrap().original_value(), "0px");
    }

    #[test]
    fn out_of_range_is_not_found() {
        let host = MemoryRuleList::from_css("a { color: red }");
        let registry = RuleRegistry::load(&host).unwrap();

        assert!(matches!(
            registry.get_by_logical_index(1),
            Err(Error::NotFound { index: 1, len: 1 })
        ));
    }

    #[test]
    fn empty_host() {
        let registry = RuleRegistry::load(&MemoryRuleList::new()).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.has_changes());
    }

    #[test]
    fn shift_moves_later_rules_only() {
        let host = MemoryRuleList::from_css("a { color: red } b { color: red } c { color: red }");
        let mut registry = RuleRegistry::load(&host).unwrap();

        registry.shift_after_insert(1, 0);
        let indices: Vec<_> = registry.iter().map(LogicalRule::host_index).collect();
        assert_eq!(indices, vec![0, 2, 3]);

        registry.shift_after_delete(1, 0);
        let indices: Vec<_> = registry.iter().map(LogicalRule::host_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
