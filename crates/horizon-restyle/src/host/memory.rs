//! In-memory rule list with browser-like normalization.

use cssparser::{ParseError as CssParseError, Parser, ParserInput, Token};

use super::{HostError, HostRuleKind, RuleHost};
use crate::logging::targets;
use crate::parser::parse_block;
use crate::properties::registry;

/// A rule list held in memory.
///
/// Inserted style rules are normalized the way a browser's CSSOM does it:
/// selector whitespace is collapsed, property names are lowercased, values
/// are reserialized through the [property registry](crate::properties), and
/// declarations the registry does not accept are dropped without error.
/// Text that is not a rule at all is rejected.
///
/// # Example
///
/// ```
/// use horizon_restyle::host::{MemoryRuleList, RuleHost};
///
/// let mut rules = MemoryRuleList::new();
/// rules.insert_rule_at(0, "h1   >  a { COLOR: #FF0000; width: bogus }").unwrap();
/// assert_eq!(rules.rule_text_at(0).unwrap(), "h1 > a { color: #ff0000; }");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRuleList {
    rules: Vec<String>,
}

impl MemoryRuleList {
    /// Create an empty rule list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule list from stylesheet text.
    ///
    /// Rules the host would reject are skipped with a warning, matching how
    /// a browser loads a stylesheet.
    pub fn from_css(css: &str) -> Self {
        let mut list = Self::new();
        for text in split_rules(css) {
            let index = list.rules.len();
            if let Err(e) = list.insert_rule_at(index, &text) {
                tracing::warn!(target: targets::HOST, "skipping rule: {}", e);
            }
        }
        list
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over the stored rule texts.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(String::as_str)
    }

    /// The whole list as stylesheet text, one rule per line.
    pub fn to_css(&self) -> String {
        self.rules.join("\n")
    }

    fn normalize(text: &str) -> Result<String, HostError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(HostError::rejected(text, "empty rule"));
        }

        if !HostRuleKind::of_text(trimmed).is_style() {
            return Ok(trimmed.to_string());
        }

        let block = parse_block(trimmed).map_err(|e| HostError::rejected(text, e.to_string()))?;
        let selector = block.selector_text.split_whitespace().collect::<Vec<_>>().join(" ");
        if selector.is_empty() {
            return Err(HostError::rejected(text, "empty selector"));
        }

        let mut out = format!("{selector} {{");
        for declaration in &block.declarations {
            let name = if declaration.name.starts_with("--") {
                declaration.name.clone()
            } else {
                declaration.name.to_ascii_lowercase()
            };
            match registry().normalize(&name, &declaration.value) {
                Ok(value) => {
                    out.push_str(&format!(" {name}: {value};"));
                }
                Err(reason) => {
                    tracing::debug!(
                        target: targets::HOST,
                        property = %name,
                        value = %declaration.value,
                        %reason,
                        "dropping declaration"
                    );
                }
            }
        }
        out.push_str(" }");
        Ok(out)
    }
}

impl RuleHost for MemoryRuleList {
    fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn rule_text_at(&self, index: usize) -> Result<String, HostError> {
        self.rules
            .get(index)
            .cloned()
            .ok_or(HostError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            })
    }

    fn insert_rule_at(&mut self, index: usize, text: &str) -> Result<(), HostError> {
        if index > self.rules.len() {
            return Err(HostError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            });
        }
        let normalized = Self::normalize(text)?;
        self.rules.insert(index, normalized);
        Ok(())
    }

    fn delete_rule_at(&mut self, index: usize) -> Result<(), HostError> {
        if index >= self.rules.len() {
            return Err(HostError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            });
        }
        self.rules.remove(index);
        Ok(())
    }
}

/// Split stylesheet text into top-level rule texts.
fn split_rules(css: &str) -> Vec<String> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut rules = vec![];

    loop {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            break;
        }

        let start = parser.position();
        loop {
            match parser.next() {
                Ok(Token::Semicolon) | Err(_) => break,
                Ok(Token::CurlyBracketBlock) => {
                    let _ = parser.parse_nested_block(|p| {
                        while p.next().is_ok() {}
                        Ok::<_, CssParseError<'_, ()>>(())
                    });
                    break;
                }
                Ok(_) => {}
            }
        }

        let text = parser.slice_from(start).trim();
        if !text.is_empty() {
            rules.push(text.to_string());
        }
    }

    rules
}
