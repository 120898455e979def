//! Override-rule bookkeeping.
//!
//! A host only offers whole-rule insert and delete, so a property edit is
//! expressed as a synthetic single-declaration rule placed right after the
//! rule being edited. Each logical rule owns a row of these overrides:
//!
//! ```text
//! host_index + 0   h1 { color: red; width: 10px; }   (untouched original)
//! host_index + 1   h1 { width: 20px; }               (offset 1)
//! host_index + 2   h1 { color: blue; }               (offset 2)
//! ```
//!
//! Offsets are handed out in first-edit order and never reused, so the
//! position of every override is a pure function of the bookkeeping below.

use std::collections::HashMap;

use crate::host::RuleHost;
use crate::logging::targets;
use crate::parser::{parse_block, serialize_single};
use crate::rules::RuleRegistry;
use crate::{Error, Result};

/// Override state of one logical rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOverrideState {
    /// No property has been overridden.
    Clean,
    /// This many distinct properties have override rules.
    Overridden(usize),
}

/// Property name to override offset, for one logical rule.
///
/// Also counts stale rows: superseded overrides whose delete failed. They
/// sit right after their slot's live row until a later edit of the same
/// property removes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSlots {
    offsets: HashMap<String, usize>,
    /// Stale rows per slot, indexed by `offset - 1`.
    stale: Vec<usize>,
}

impl OverrideSlots {
    /// Offset of `name`'s override rule, if it has one.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.offsets.get(&name.to_ascii_lowercase()).copied()
    }

    /// Number of overridden properties.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Check if nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Iterate over `(property, offset)` pairs in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        let mut slots: Vec<_> = self.offsets.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        slots.sort_by_key(|(_, offset)| *offset);
        slots.into_iter()
    }

    /// Number of stale rows still in the host.
    pub fn stale_rows(&self) -> usize {
        self.stale.iter().sum()
    }

    /// Distance from the rule to the live row of the slot at `offset`.
    fn row_of(&self, offset: usize) -> usize {
        1 + self.stale[..offset - 1].iter().map(|s| s + 1).sum::<usize>()
    }

    /// Host rows taken up by overrides, stale ones included.
    fn rows(&self) -> usize {
        self.stale.iter().map(|s| s + 1).sum()
    }

    fn allocate(&mut self, name: &str) -> usize {
        self.stale.push(0);
        let offset = self.stale.len();
        self.offsets.insert(name.to_ascii_lowercase(), offset);
        offset
    }
}

/// Owns the override slots of every rule in one stylesheet.
#[derive(Debug, Clone, Default)]
pub struct OverrideBookkeeper {
    slots: HashMap<usize, OverrideSlots>,
}

impl OverrideBookkeeper {
    /// Create a bookkeeper with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots of the rule at `logical_index`.
    pub fn slots(&self, logical_index: usize) -> Option<&OverrideSlots> {
        self.slots.get(&logical_index)
    }

    /// Override state of the rule at `logical_index`.
    pub fn state(&self, logical_index: usize) -> RuleOverrideState {
        match self.slots.get(&logical_index).map(OverrideSlots::len) {
            None | Some(0) => RuleOverrideState::Clean,
            Some(n) => RuleOverrideState::Overridden(n),
        }
    }

    /// Total number of overridden properties across all rules.
    pub fn override_count(&self) -> usize {
        self.slots.values().map(OverrideSlots::len).sum()
    }

    /// Stale rows left behind by failed deletes, across all rules.
    pub fn stale_count(&self) -> usize {
        self.slots.values().map(OverrideSlots::stale_rows).sum()
    }

    /// Set `name` to `value` on a rule and verify what the host stored.
    ///
    /// `expected_value` is what the host is predicted to store, normally
    /// from [`PrecheckProbe::test_value`](super::PrecheckProbe::test_value).
    /// On success the declaration's current value is updated and the stored
    /// value returned. On any failure the declaration is left alone.
    ///
    /// Once the host accepts the insert for a newly overridden property the
    /// slot is recorded, even if verification then fails, because the row
    /// now exists in the host.
    #[tracing::instrument(
        skip(self, registry, host),
        target = "horizon_restyle::patch",
        level = "debug"
    )]
    pub fn set_property<H: RuleHost + ?Sized>(
        &mut self,
        registry: &mut RuleRegistry,
        host: &mut H,
        logical_index: usize,
        name: &str,
        value: &str,
        expected_value: &str,
    ) -> Result<String> {
        let rule = registry.get_by_logical_index(logical_index)?;
        rule.require_declaration(name)?;

        let host_index = rule.host_index();
        let text = serialize_single(rule.selector_text(), name, value);

        let existing = self
            .slots
            .get(&logical_index)
            .and_then(|slots| slots.offset_of(name));

        let target = match existing {
            Some(offset) => {
                let slots = self.slots.entry(logical_index).or_default();
                let target = host_index + slots.row_of(offset);
                host.insert_rule_at(target, &text)?;
                registry.shift_after_insert(target, logical_index);
                // The previous live row is now stale too.
                slots.stale[offset - 1] += 1;

                // Stale rows of this slot always directly follow the fresh one.
                while slots.stale[offset - 1] > 0 {
                    if let Err(e) = host.delete_rule_at(target + 1) {
                        tracing::error!(
                            target: targets::PATCH,
                            index = target + 1,
                            stale = slots.stale[offset - 1],
                            "failed to delete stale override, keeping it for the next edit: {}",
                            e
                        );
                        return Err(e.into());
                    }
                    slots.stale[offset - 1] -= 1;
                    registry.shift_after_delete(target + 1, logical_index);
                }
                tracing::debug!(
                    target: targets::PATCH,
                    host_index = target,
                    offset,
                    "replaced override rule"
                );
                target
            }
            None => {
                let slots = self.slots.entry(logical_index).or_default();
                let target = host_index + slots.rows() + 1;
                host.insert_rule_at(target, &text)?;
                let offset = slots.allocate(name);
                registry.shift_after_insert(target, logical_index);
                tracing::debug!(
                    target: targets::PATCH,
                    host_index = target,
                    offset,
                    "inserted override rule"
                );
                target
            }
        };

        let read_back = host.rule_text_at(target)?;
        let stored = match read_back_value(&read_back, name) {
            Some(stored) => stored,
            None => {
                tracing::error!(
                    target: targets::PATCH,
                    %read_back,
                    "override read-back is not a single '{}' declaration",
                    name
                );
                return Err(Error::verification_failed(name, read_back));
            }
        };

        if stored != expected_value {
            tracing::warn!(
                target: targets::PATCH,
                expected = expected_value,
                actual = %stored,
                "host normalized differently than predicted"
            );
            return Err(Error::ValueMismatch {
                property: name.to_string(),
                expected: expected_value.to_string(),
                actual: stored,
            });
        }

        let declaration = registry
            .get_mut(logical_index)?
            .declaration_mut(name)
            .ok_or_else(|| Error::property_not_found(name))?;
        declaration.set_current(stored.clone());

        Ok(stored)
    }
}

/// The value of the single `name` declaration in `rule_text`.
fn read_back_value(rule_text: &str, name: &str) -> Option<String> {
    let block = parse_block(rule_text).ok()?;
    match block.declarations.as_slice() {
        [only] if only.is_named(name) => Some(only.value.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostError, MemoryRuleList};

    fn setup(css: &str) -> (MemoryRuleList, RuleRegistry, OverrideBookkeeper) {
        let host = MemoryRuleList::from_css(css);
        let registry = RuleRegistry::load(&host).unwrap();
        (host, registry, OverrideBookkeeper::new())
    }

    #[test]
    fn first_override_is_inserted_after_rule() {
        let (mut host, mut registry, mut book) = setup("h1 { color: red; width: 10px; }");

        let stored = book
            .set_property(&mut registry, &mut host, 0, "color", "blue", "blue")
            .unwrap();

        assert_eq!(stored, "blue");
        assert_eq!(host.len(), 2);
        assert_eq!(host.rule_text_at(0).unwrap(), "h1 { color: red; width: 10px; }");
        assert_eq!(host.rule_text_at(1).unwrap(), "h1 { color: blue; }");
        assert_eq!(book.state(0), RuleOverrideState::Overridden(1));

        let rule = registry.get_by_logical_index(0).unwrap();
        assert_eq!(rule.host_index(), 0);
        assert_eq!(rule.declaration("color").unwrap().current_value(), "blue");
        assert!(rule.declaration("color").unwrap().is_changed());
        assert!(!rule.declaration("width").unwrap().is_changed());
    }

    #[test]
    fn repeated_edit_keeps_one_override() {
        let (mut host, mut registry, mut book) = setup("h1 { color: red; }");

        book.set_property(&mut registry, &mut host, 0, "color", "red", "red")
            .unwrap();
        book.set_property(&mut registry, &mut host, 0, "color", "red", "red")
            .unwrap();

        assert_eq!(host.len(), 2);
        assert_eq!(book.override_count(), 1);
    }

    #[test]
    fn offsets_follow_first_edit_order() {
        let (mut host, mut registry, mut book) =
            setup("h1 { color: red; width: 10px; margin: 0; }");

        book.set_property(&mut registry, &mut host, 0, "width", "1px", "1px")
            .unwrap();
        book.set_property(&mut registry, &mut host, 0, "color", "blue", "blue")
            .unwrap();
        book.set_property(&mut registry, &mut host, 0, "width", "2px", "2px")
            .unwrap();
        book.set_property(&mut registry, &mut host, 0, "margin", "3px", "3px")
            .unwrap();

        let slots = book.slots(0).unwrap();
        assert_eq!(slots.offset_of("width"), Some(1));
        assert_eq!(slots.offset_of("color"), Some(2));
        assert_eq!(slots.offset_of("margin"), Some(3));
        assert_eq!(
            slots.iter().collect::<Vec<_>>(),
            vec![("width", 1), ("color", 2), ("margin", 3)]
        );

        assert_eq!(host.rule_text_at(1).unwrap(), "h1 { width: 2px; }");
        assert_eq!(host.rule_text_at(2).unwrap(), "h1 { color: blue; }");
        assert_eq!(host.rule_text_at(3).unwrap(), "h1 { margin: 3px; }");
    }

    #[test]
    fn later_rules_shift_and_targets_follow() {
        let (mut host, mut registry, mut book) = setup(
            "@import url(a.css); @charset \"x\"; a { color: red; width: 1px; } b { color: red; }",
        );
        assert_eq!(registry.get_by_logical_index(0).unwrap().host_index(), 2);
        assert_eq!(registry.get_by_logical_index(1).unwrap().host_index(), 3);

        book.set_property(&mut registry, &mut host, 0, "color", "blue", "blue")
            .unwrap();
        book.set_property(&mut registry, &mut host, 0, "width", "2px", "2px")
            .unwrap();

        assert_eq!(registry.get_by_logical_index(0).unwrap().host_index(), 2);
        assert_eq!(registry.get_by_logical_index(1).unwrap().host_index(), 5);

        book.set_property(&mut registry, &mut host, 1, "color", "green", "green")
            .unwrap();
        assert_eq!(host.rule_text_at(6).unwrap(), "b { color: green; }");
        assert_eq!(host.rule_text_at(5).unwrap(), "b { color: red; }");
    }

    #[test]
    fn earlier_rule_overrides_do_not_move() {
        let (mut host, mut registry, mut book) = setup("a { color: red; } b { color: red; }");

        book.set_property(&mut registry, &mut host, 0, "color", "blue", "blue")
            .unwrap();
        book.set_property(&mut registry, &mut host, 1, "color", "green", "green")
            .unwrap();
        book.set_property(&mut registry, &mut host, 0, "color", "navy", "navy")
            .unwrap();

        assert_eq!(
            host.iter().collect::<Vec<_>>(),
            vec![
                "a { color: red; }",
                "a { color: navy; }",
                "b { color: red; }",
                "b { color: green; }",
            ]
        );
    }

    #[test]
    fn undeclared_property_fails_before_mutation() {
        let (mut host, mut registry, mut book) = setup("a { color: red; }");

        let err = book
            .set_property(&mut registry, &mut host, 0, "width", "1px", "1px")
            .unwrap_err();
        assert!(matches!(err, Error::PropertyNotFound { .. }));
        assert_eq!(host.len(), 1);
        assert_eq!(book.state(0), RuleOverrideState::Clean);
    }

    #[test]
    fn bad_logical_index() {
        let (mut host, mut registry, mut book) = setup("a { color: red; }");
        assert!(matches!(
            book.set_property(&mut registry, &mut host, 5, "color", "red", "red"),
            Err(Error::NotFound { index: 5, len: 1 })
        ));
    }

    #[test]
    fn value_mismatch_leaves_declaration_alone() {
        let (mut host, mut registry, mut book) = setup("a { width: 1px; }");

        let err = book
            .set_property(&mut registry, &mut host, 0, "width", "2PX", "2PX")
            .unwrap_err();
        match err {
            Error::ValueMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, "2PX");
                assert_eq!(actual, "2px");
            }
            other => panic!("unexpected error: {other}"),
        }

        let rule = registry.get_by_logical_index(0).unwrap();
        assert_eq!(rule.declaration("width").unwrap().current_value(), "1px");
        // The row exists in the host, so the slot is kept.
        assert_eq!(book.state(0), RuleOverrideState::Overridden(1));
    }

    #[test]
    fn dropped_declaration_fails_verification() {
        let (mut host, mut registry, mut book) = setup("a { width: 1px; } b { color: red; }");

        let err = book
            .set_property(&mut registry, &mut host, 0, "width", "abc", "abc")
            .unwrap_err();
        assert!(matches!(err, Error::VerificationFailed { .. }));
        assert!(!registry.has_changes());
        // The empty override row was inserted, so b still moved.
        assert_eq!(registry.get_by_logical_index(1).unwrap().host_index(), 2);
    }

    #[test]
    fn host_rejection_records_nothing() {
        struct Rejecting(MemoryRuleList);

        impl RuleHost for Rejecting {
            fn rule_count(&self) -> usize {
                self.0.rule_count()
            }
            fn rule_text_at(&self, index: usize) -> std::result::Result<String, HostError> {
                self.0.rule_text_at(index)
            }
            fn insert_rule_at(
                &mut self,
                _index: usize,
                text: &str,
            ) -> std::result::Result<(), HostError> {
                Err(HostError::rejected(text, "read-only"))
            }
            fn delete_rule_at(&mut self, index: usize) -> std::result::Result<(), HostError> {
                self.0.delete_rule_at(index)
            }
        }

        let mut host = Rejecting(MemoryRuleList::from_css("a { color: red; } b { color: red; }"));
        let mut registry = RuleRegistry::load(&host).unwrap();
        let mut book = OverrideBookkeeper::new();

        let err = book
            .set_property(&mut registry, &mut host, 0, "color", "blue", "blue")
            .unwrap_err();
        assert!(matches!(err, Error::Host(HostError::Rejected { .. })));
        assert_eq!(book.state(0), RuleOverrideState::Clean);
        assert_eq!(registry.get_by_logical_index(1).unwrap().host_index(), 1);
    }

    /// Fails the next `failing_deletes` deletes.
    struct FlakyDeletes {
        inner: MemoryRuleList,
        failing_deletes: usize,
    }

    impl RuleHost for FlakyDeletes {
        fn rule_count(&self) -> usize {
            self.inner.rule_count()
        }
        fn rule_text_at(&self, index: usize) -> std::result::Result<String, HostError> {
            self.inner.rule_text_at(index)
        }
        fn insert_rule_at(&mut self, index: usize, text: &str) -> std::result::Result<(), HostError> {
            self.inner.insert_rule_at(index, text)
        }
        fn delete_rule_at(&mut self, index: usize) -> std::result::Result<(), HostError> {
            if self.failing_deletes > 0 {
                self.failing_deletes -= 1;
                return Err(HostError::AccessDenied);
            }
            self.inner.delete_rule_at(index)
        }
    }

    fn flaky(css: &str) -> (FlakyDeletes, RuleRegistry, OverrideBookkeeper) {
        let host = FlakyDeletes {
            inner: MemoryRuleList::from_css(css),
            failing_deletes: 0,
        };
        let registry = RuleRegistry::load(&host).unwrap();
        (host, registry, OverrideBookkeeper::new())
    }

    #[test]
    fn failed_stale_delete_is_cleaned_up_by_next_edit() {
        let (mut host, mut registry, mut book) = flaky("a { color: red; } b { color: red; }");

        book.set_property(&mut registry, &mut host, 0, "color", "blue", "blue")
            .unwrap();
        book.set_property(&mut registry, &mut host, 1, "color", "green", "green")
            .unwrap();

        host.failing_deletes = 1;
        let err = book
            .set_property(&mut registry, &mut host, 0, "color", "navy", "navy")
            .unwrap_err();
        assert!(matches!(err, Error::Host(HostError::AccessDenied)));
        assert_eq!(
            host.inner.iter().collect::<Vec<_>>(),
            vec![
                "a { color: red; }",
                "a { color: navy; }",
                "a { color: blue; }",
                "b { color: red; }",
                "b { color: green; }",
            ]
        );
        assert_eq!(book.stale_count(), 1);
        assert_eq!(registry.get_by_logical_index(1).unwrap().host_index(), 3);
        let a = registry.get_by_logical_index(0).unwrap();
        assert_eq!(a.declaration("color").unwrap().current_value(), "blue");

        book.set_property(&mut registry, &mut host, 0, "color", "black", "black")
            .unwrap();
        assert_eq!(book.stale_count(), 0);
        assert_eq!(registry.get_by_logical_index(1).unwrap().host_index(), 2);

        book.set_property(&mut registry, &mut host, 1, "color", "yellow", "yellow")
            .unwrap();
        assert_eq!(
            host.inner.iter().collect::<Vec<_>>(),
            vec![
                "a { color: red; }",
                "a { color: black; }",
                "b { color: red; }",
                "b { color: yellow; }",
            ]
        );
    }

    #[test]
    fn stale_row_moves_later_slots_of_same_rule() {
        let (mut host, mut registry, mut book) = flaky("a { color: red; width: 1px; }");

        book.set_property(&mut registry, &mut host, 0, "color", "blue", "blue")
            .unwrap();
        book.set_property(&mut registry, &mut host, 0, "width", "2px", "2px")
            .unwrap();

        host.failing_deletes = 1;
        assert!(
            book.set_property(&mut registry, &mut host, 0, "color", "navy", "navy")
                .is_err()
        );

        // The width override sits behind the stale color row now.
        book.set_property(&mut registry, &mut host, 0, "width", "3px", "3px")
            .unwrap();
        assert_eq!(
            host.inner.iter().collect::<Vec<_>>(),
            vec![
                "a { color: red; width: 1px; }",
                "a { color: navy; }",
                "a { color: blue; }",
                "a { width: 3px; }",
            ]
        );
        assert_eq!(book.slots(0).unwrap().stale_rows(), 1);
    }

    #[test]
    fn read_back_value_requires_single_matching_declaration() {
        assert_eq!(
            read_back_value("a { color: red; }", "COLOR").as_deref(),
            Some("red")
        );
        assert!(read_back_value("a { }", "color").is_none());
        assert!(read_back_value("a { color: red; width: 1px; }", "color").is_none());
        assert!(read_back_value("a { width: 1px; }", "color").is_none());
        assert!(read_back_value("garbage", "color").is_none());
    }
}
