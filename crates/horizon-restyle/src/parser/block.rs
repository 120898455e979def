//! Declaration block parsing using the `cssparser` tokenizer.
//!
//! The parser works at single-rule granularity: a selector prelude followed
//! by one `{ ... }` block of `name: value` declarations. Tokenizing (rather
//! than splitting on raw characters) keeps `;` and braces inside strings,
//! `url()` and function arguments from ending a declaration early.
//!
//! Parse results keep each declaration's source text so a block can be
//! written back with one value replaced and everything else untouched.

use std::fmt;

use cssparser::{
    Delimiter, ParseError as CssParseError, ParseErrorKind, Parser, ParserInput, Token,
};

use crate::logging::targets;
use crate::{Error, Result};

/// A parsed `selector { declarations }` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    /// Selector prelude, trimmed.
    pub selector_text: String,
    /// Declarations in source order.
    pub declarations: Vec<ParsedDeclaration>,
}

/// A single `name: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDeclaration {
    /// Property name as written.
    pub name: String,
    /// Value text, trimmed, without the terminator.
    pub value: String,
    /// Full declaration source, trimmed, without the terminator.
    source: String,
}

impl ParsedDeclaration {
    /// The declaration exactly as it appeared in the block.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this declaration sets `name` (ASCII case-insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl ParsedBlock {
    /// Find the effective declaration for `name`.
    ///
    /// When a property is declared more than once the last one wins.
    pub fn find(&self, name: &str) -> Option<&ParsedDeclaration> {
        self.declarations.iter().rev().find(|d| d.is_named(name))
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.declarations.iter().rposition(|d| d.is_named(name))
    }
}

impl fmt::Display for ParsedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rule(f, &self.selector_text, self.declarations.iter().map(|d| d.source.as_str()))
    }
}

/// Parse rule text into its selector and declarations.
///
/// Fails with [`Error::MalformedBlock`] when there is no `{ ... }` pair or
/// when anything follows the closing brace. An empty block is valid.
///
/// # Example
///
/// ```
/// use horizon_restyle::parser::parse_block;
///
/// let block = parse_block("h1 { color: red; margin: 0 }").unwrap();
/// assert_eq!(block.selector_text, "h1");
/// assert_eq!(block.declarations.len(), 2);
/// assert_eq!(block.declarations[1].value, "0");
/// ```
pub fn parse_block(rule_text: &str) -> Result<ParsedBlock> {
    let text = rule_text.trim();
    // cssparser closes unterminated blocks at EOF, so check the brace here.
    if !text.ends_with('}') {
        return Err(Error::malformed_block(rule_text, "missing closing '}'"));
    }

    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);

    let start = parser.position();
    parser
        .parse_until_before(Delimiter::CurlyBracketBlock, consume_all)
        .map_err(|e| Error::malformed_block(rule_text, describe(&e.kind)))?;
    let selector_text = parser.slice_from(start).trim().to_string();

    match parser.next() {
        Ok(Token::CurlyBracketBlock) => {}
        _ => return Err(Error::malformed_block(rule_text, "missing opening '{'")),
    }

    let (segments, end) = parser
        .parse_nested_block(|block| {
            let mut segments = vec![];
            loop {
                block.skip_whitespace();
                if block.is_exhausted() {
                    break;
                }

                let start = block.position();
                block.parse_until_before(Delimiter::Semicolon, consume_all)?;
                let raw = block.slice_from(start).trim();
                if !raw.is_empty() {
                    segments.push(raw.to_string());
                }

                let _ = block.try_parse(|p| p.expect_semicolon());
            }
            Ok::<_, CssParseError<'_, ()>>((segments, block.position()))
        })
        .map_err(|e| Error::malformed_block(rule_text, describe(&e.kind)))?;

    // A nested token left open at EOF swallows the closing brace.
    if parser.slice_from(end) != "}" {
        return Err(Error::malformed_block(rule_text, "missing closing '}'"));
    }

    parser.skip_whitespace();
    if !parser.is_exhausted() {
        return Err(Error::malformed_block(
            rule_text,
            "unexpected content after closing '}'",
        ));
    }

    let declarations = segments
        .iter()
        .map(|segment| parse_declaration(segment))
        .collect::<Result<Vec<_>>>()?;

    tracing::trace!(
        target: targets::PARSER,
        selector = %selector_text,
        declarations = declarations.len(),
        "parsed rule block"
    );

    Ok(ParsedBlock {
        selector_text,
        declarations,
    })
}

/// Split a declaration on its first `:`.
///
/// A single trailing `;` is tolerated. Fails with
/// [`Error::MalformedDeclaration`] when there is no separator or no name.
pub fn parse_declaration(text: &str) -> Result<ParsedDeclaration> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();

    let (name, value) = trimmed
        .split_once(':')
        .ok_or_else(|| Error::malformed_declaration(text))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::malformed_declaration(text));
    }

    Ok(ParsedDeclaration {
        name: name.to_string(),
        value: value.trim().to_string(),
        source: trimmed.to_string(),
    })
}

/// Produce a rule with exactly one declaration, the form used for overrides.
pub fn serialize_single(selector_text: &str, name: &str, value: &str) -> String {
    format!("{selector_text} {{ {name}: {value}; }}")
}

/// Rewrite `block` with only the value of `name` replaced.
///
/// Every other declaration keeps its source text and position.
pub fn reserialize_with_update(block: &ParsedBlock, name: &str, value: &str) -> Result<String> {
    let index = block
        .position_of(name)
        .ok_or_else(|| Error::property_not_found(name))?;

    let updated = format!("{}: {}", block.declarations[index].name, value);
    let parts = block.declarations.iter().enumerate().map(|(i, d)| {
        if i == index {
            updated.as_str()
        } else {
            d.source.as_str()
        }
    });

    let mut out = String::new();
    write_rule(&mut out, &block.selector_text, parts).map_err(|_| {
        Error::malformed_block(&block.selector_text, "failed to write rule text")
    })?;
    Ok(out)
}

fn write_rule<'a, W: fmt::Write>(
    out: &mut W,
    selector: &str,
    declarations: impl Iterator<Item = &'a str>,
) -> fmt::Result {
    write!(out, "{selector} {{")?;
    for declaration in declarations {
        write!(out, " {declaration};")?;
    }
    write!(out, " }}")
}

/// Consume every token, descending into nested blocks.
///
/// Fails on bad string and bad url tokens.
fn consume_all<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<(), CssParseError<'i, ()>> {
    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };
        match token {
            Token::BadString(_) | Token::BadUrl(_) => return Err(parser.new_custom_error(())),
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => parser.parse_nested_block(consume_all)?,
            _ => {}
        }
    }
}

fn describe(kind: &ParseErrorKind<'_, ()>) -> String {
    match kind {
        ParseErrorKind::Custom(()) => "unterminated string or url".to_string(),
        ParseErrorKind::Basic(basic) => format!("{basic:?}"),
    }
}
