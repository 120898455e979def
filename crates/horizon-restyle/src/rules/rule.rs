//! Logical style rules and their declarations.

use crate::parser::{ParsedBlock, parse_block, reserialize_with_update};
use crate::{Error, Result};

/// One `name: value` pair of a loaded rule, with its edit state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    name: String,
    original_value: String,
    current_value: String,
    changed: bool,
}

impl Declaration {
    /// Create an unedited declaration.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            current_value: value.clone(),
            original_value: value,
            changed: false,
        }
    }

    /// Property name as loaded.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value at load time.
    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    /// Value after the last successful edit.
    pub fn current_value(&self) -> &str {
        &self.current_value
    }

    /// Whether the current value differs from the original.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Whether this declaration sets `name` (ASCII case-insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub(crate) fn set_current(&mut self, value: impl Into<String>) {
        self.current_value = value.into();
        self.changed = self.current_value != self.original_value;
    }
}

/// A plain style rule as the engine tracks it.
///
/// `logical_index` is the rule's position among style rules at load time and
/// never changes. `host_index` follows the rule's real position in the host
/// list as override rules are inserted in front of it.
#[derive(Debug, Clone)]
pub struct LogicalRule {
    logical_index: usize,
    pub(crate) host_index: usize,
    selector_text: String,
    declarations: Vec<Declaration>,
    source: ParsedBlock,
}

impl LogicalRule {
    /// Build a rule from a parsed block.
    pub fn from_block(logical_index: usize, host_index: usize, block: ParsedBlock) -> Self {
        let declarations = block
            .declarations
            .iter()
            .map(|d| Declaration::new(&d.name, &d.value))
            .collect();
        Self {
            logical_index,
            host_index,
            selector_text: block.selector_text.clone(),
            declarations,
            source: block,
        }
    }

    /// Stable engine-assigned index.
    pub fn logical_index(&self) -> usize {
        self.logical_index
    }

    /// Current position in the host list.
    pub fn host_index(&self) -> usize {
        self.host_index
    }

    /// Selector text as loaded.
    pub fn selector_text(&self) -> &str {
        &self.selector_text
    }

    /// Declarations in source order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// The effective declaration for `name` (the last one when repeated).
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().rev().find(|d| d.is_named(name))
    }

    pub(crate) fn declaration_mut(&mut self, name: &str) -> Option<&mut Declaration> {
        self.declarations.iter_mut().rev().find(|d| d.is_named(name))
    }

    /// Declarations whose value was edited away from the original.
    pub fn changed_declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(|d| d.is_changed())
    }

    /// Whether any declaration is changed.
    pub fn has_changes(&self) -> bool {
        self.declarations.iter().any(Declaration::is_changed)
    }

    /// The rule text as loaded, with every current value written back.
    pub fn patched_text(&self) -> Result<String> {
        let mut text = self.source.to_string();
        for declaration in self.changed_declarations() {
            let block = parse_block(&text)?;
            text = reserialize_with_update(&block, &declaration.name, &declaration.current_value)?;
        }
        Ok(text)
    }

    pub(crate) fn require_declaration(&self, name: &str) -> Result<&Declaration> {
        self.declaration(name)
            .ok_or_else(|| Error::property_not_found(name))
    }
}
