//! Static property registry.
//!
//! Maps property names to a [`PropertyKind`] that knows how to parse,
//! serialize and describe values of that type. The registry is built once
//! and shared; [`MemoryRuleList`](crate::host::MemoryRuleList) uses it to
//! normalize and reject values the way a host grammar would.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use cssparser::{Parser, ParserInput, Token};

/// Keywords every property accepts.
pub const GLOBAL_KEYWORDS: &[&str] = &["inherit", "initial", "unset", "revert"];

const LENGTH_UNITS: &[&str] = &[
    "px", "em", "rem", "ex", "ch", "vw", "vh", "vmin", "vmax", "cm", "mm", "q", "in", "pt", "pc",
];

const ANGLE_UNITS: &[&str] = &["deg", "rad", "grad", "turn"];

const NAMED_COLORS: &[&str] = &[
    "aqua", "black", "blue", "fuchsia", "gray", "green", "grey", "lime", "maroon", "navy",
    "olive", "orange", "purple", "red", "silver", "teal", "white", "yellow", "transparent",
    "currentcolor", "rebeccapurple",
];

const COLOR_FUNCTIONS: &[&str] = &["rgb", "rgba", "hsl", "hsla"];

/// The value grammar of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// A single `<length>`; unitless zero is allowed.
    Length,
    /// A `<length>` or `<percentage>`.
    LengthPercentage,
    /// A unitless number, `<length>` or `<percentage>` (as `line-height`).
    NumberOrLength,
    /// One to four `<length-percentage>` values (box edges).
    Edges,
    /// A `<color>`.
    Color,
    /// A `<number>`.
    Number,
    /// An `<integer>`.
    Integer,
    /// Only the keywords listed on the property.
    Keyword,
    /// Any non-empty value.
    Any,
}

impl PropertyKind {
    /// Parse `text` as a value of this kind.
    ///
    /// Keywords are handled by [`PropertyDef::parse`].
    pub fn parse(&self, text: &str) -> Option<PropertyValue> {
        match self {
            Self::Length => parse_all(text, |p| length(p.next().ok()?, false)),
            Self::LengthPercentage => parse_all(text, |p| length(p.next().ok()?, true)),
            Self::NumberOrLength => parse_all(text, |p| {
                let token = p.next().ok()?;
                number(token).or_else(|| length(token, true))
            }),
            Self::Edges => parse_all(text, |p| {
                let mut edges = vec![];
                while !p.is_exhausted() && edges.len() < 4 {
                    let token = p.next().ok()?;
                    let edge = match token {
                        Token::Ident(ident) if ident.eq_ignore_ascii_case("auto") => {
                            PropertyValue::Keyword("auto".into())
                        }
                        _ => length(token, true)?,
                    };
                    edges.push(edge);
                }
                (!edges.is_empty()).then_some(PropertyValue::List(edges))
            }),
            Self::Color => parse_all(text, color),
            Self::Number => parse_all(text, |p| number(p.next().ok()?)),
            Self::Integer => parse_all(text, |p| match p.next().ok()? {
                Token::Number {
                    int_value: Some(int),
                    ..
                } => Some(PropertyValue::Integer(*int)),
                _ => None,
            }),
            Self::Keyword => None,
            Self::Any => {
                let text = text.trim();
                (!text.is_empty()).then(|| PropertyValue::Raw(text.to_string()))
            }
        }
    }

    /// Human readable description of the grammar.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Length => "a length (e.g. 10px)",
            Self::LengthPercentage => "a length or percentage (e.g. 10px, 50%)",
            Self::NumberOrLength => "a number, length or percentage (e.g. 1.5, 20px)",
            Self::Edges => "one to four lengths or percentages (e.g. 0 auto)",
            Self::Color => "a color (e.g. #ff0000, red, rgb(255, 0, 0))",
            Self::Number => "a number (e.g. 0.5)",
            Self::Integer => "an integer (e.g. 10)",
            Self::Keyword => "a keyword",
            Self::Any => "any value",
        }
    }
}

/// A parsed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// A number with a unit.
    Dimension { value: f32, unit: String },
    /// A percentage, in percent.
    Percentage(f32),
    /// A unitless number.
    Number(f32),
    /// An integer.
    Integer(i32),
    /// A color, already in canonical text form.
    Color(String),
    /// A lowercase keyword.
    Keyword(String),
    /// Space-separated components.
    List(Vec<PropertyValue>),
    /// Text kept as written.
    Raw(String),
    /// A value followed by `!important`.
    Important(Box<PropertyValue>),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dimension { value, unit } => write!(f, "{}{}", format_number(*value), unit),
            Self::Percentage(value) => write!(f, "{}%", format_number(*value)),
            Self::Number(value) => f.write_str(&format_number(*value)),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Color(text) | Self::Keyword(text) | Self::Raw(text) => f.write_str(text),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Important(inner) => write!(f, "{inner} !important"),
        }
    }
}

/// A registered property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDef {
    /// Lowercase property name.
    pub name: &'static str,
    /// Value grammar.
    pub kind: PropertyKind,
    /// Property-specific keywords, accepted in addition to the kind.
    pub keywords: &'static [&'static str],
}

impl PropertyDef {
    const fn new(
        name: &'static str,
        kind: PropertyKind,
        keywords: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            kind,
            keywords,
        }
    }

    /// Parse a value, including keywords and a trailing `!important`.
    pub fn parse(&self, text: &str) -> Option<PropertyValue> {
        let text = text.trim();
        match strip_important(text) {
            Some(rest) => self
                .parse_plain(rest)
                .map(|value| PropertyValue::Important(Box::new(value))),
            None => self.parse_plain(text),
        }
    }

    /// Parse and serialize a value in canonical form.
    pub fn normalize(&self, text: &str) -> Option<String> {
        self.parse(text).map(|value| value.to_string())
    }

    /// Describe the accepted values.
    pub fn describe(&self) -> String {
        if self.keywords.is_empty() {
            return self.kind.describe().to_string();
        }
        if self.kind == PropertyKind::Keyword {
            return format!("one of: {}", self.keywords.join(", "));
        }
        format!("{}, or one of: {}", self.kind.describe(), self.keywords.join(", "))
    }

    fn parse_plain(&self, text: &str) -> Option<PropertyValue> {
        GLOBAL_KEYWORDS
            .iter()
            .chain(self.keywords)
            .find(|keyword| keyword.eq_ignore_ascii_case(text))
            .map(|keyword| PropertyValue::Keyword((*keyword).to_string()))
            .or_else(|| self.kind.parse(text))
    }
}

/// Lookup table of known properties.
#[derive(Debug)]
pub struct PropertyRegistry {
    defs: HashMap<&'static str, PropertyDef>,
}

static REGISTRY: LazyLock<PropertyRegistry> = LazyLock::new(PropertyRegistry::builtin);

static CUSTOM_PROPERTY: PropertyDef = PropertyDef::new("--*", PropertyKind::Any, &[]);

/// The shared built-in registry.
pub fn registry() -> &'static PropertyRegistry {
    &REGISTRY
}

impl PropertyRegistry {
    fn builtin() -> Self {
        use PropertyKind::*;

        const SIZE: &[&str] = &["auto", "min-content", "max-content", "fit-content"];
        const MAX_SIZE: &[&str] = &["none", "min-content", "max-content", "fit-content"];
        const AUTO: &[&str] = &["auto"];
        const NONE: &[&str] = &[];
        const BORDER_STYLE: &[&str] = &[
            "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset",
            "outset",
        ];
        const BORDER_WIDTH: &[&str] = &["thin", "medium", "thick"];

        let defs = [
            PropertyDef::new("width", LengthPercentage, SIZE),
            PropertyDef::new("height", LengthPercentage, SIZE),
            PropertyDef::new("min-width", LengthPercentage, SIZE),
            PropertyDef::new("min-height", LengthPercentage, SIZE),
            PropertyDef::new("max-width", LengthPercentage, MAX_SIZE),
            PropertyDef::new("max-height", LengthPercentage, MAX_SIZE),
            PropertyDef::new("top", LengthPercentage, AUTO),
            PropertyDef::new("right", LengthPercentage, AUTO),
            PropertyDef::new("bottom", LengthPercentage, AUTO),
            PropertyDef::new("left", LengthPercentage, AUTO),
            PropertyDef::new("margin", Edges, NONE),
            PropertyDef::new("margin-top", LengthPercentage, AUTO),
            PropertyDef::new("margin-right", LengthPercentage, AUTO),
            PropertyDef::new("margin-bottom", LengthPercentage, AUTO),
            PropertyDef::new("margin-left", LengthPercentage, AUTO),
            PropertyDef::new("padding", Edges, NONE),
            PropertyDef::new("padding-top", LengthPercentage, NONE),
            PropertyDef::new("padding-right", LengthPercentage, NONE),
            PropertyDef::new("padding-bottom", LengthPercentage, NONE),
            PropertyDef::new("padding-left", LengthPercentage, NONE),
            PropertyDef::new(
                "font-size",
                LengthPercentage,
                &[
                    "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large",
                    "smaller", "larger",
                ],
            ),
            PropertyDef::new("line-height", NumberOrLength, &["normal"]),
            PropertyDef::new("letter-spacing", Length, &["normal"]),
            PropertyDef::new("word-spacing", Length, &["normal"]),
            PropertyDef::new("text-indent", LengthPercentage, NONE),
            PropertyDef::new("border-width", Length, BORDER_WIDTH),
            PropertyDef::new("border-radius", Edges, NONE),
            PropertyDef::new("outline-width", Length, BORDER_WIDTH),
            PropertyDef::new("border-style", Keyword, BORDER_STYLE),
            PropertyDef::new("outline-style", Keyword, BORDER_STYLE),
            PropertyDef::new("color", Color, NONE),
            PropertyDef::new("background-color", Color, NONE),
            PropertyDef::new("border-color", Color, NONE),
            PropertyDef::new("outline-color", Color, NONE),
            PropertyDef::new("opacity", Number, NONE),
            PropertyDef::new("flex-grow", Number, NONE),
            PropertyDef::new("flex-shrink", Number, NONE),
            PropertyDef::new("z-index", Integer, AUTO),
            PropertyDef::new("order", Integer, NONE),
            PropertyDef::new(
                "font-weight",
                Number,
                &["normal", "bold", "bolder", "lighter"],
            ),
            PropertyDef::new(
                "display",
                Keyword,
                &[
                    "none", "block", "inline", "inline-block", "flex", "inline-flex", "grid",
                    "inline-grid", "table", "table-row", "table-cell", "list-item", "contents",
                    "flow-root",
                ],
            ),
            PropertyDef::new(
                "position",
                Keyword,
                &["static", "relative", "absolute", "fixed", "sticky"],
            ),
            PropertyDef::new("visibility", Keyword, &["visible", "hidden", "collapse"]),
            PropertyDef::new("float", Keyword, &["none", "left", "right"]),
            PropertyDef::new("clear", Keyword, &["none", "left", "right", "both"]),
            PropertyDef::new(
                "overflow",
                Keyword,
                &["visible", "hidden", "clip", "scroll", "auto"],
            ),
            PropertyDef::new(
                "text-align",
                Keyword,
                &["left", "right", "center", "justify", "start", "end"],
            ),
            PropertyDef::new(
                "text-transform",
                Keyword,
                &["none", "capitalize", "uppercase", "lowercase"],
            ),
            PropertyDef::new("font-style", Keyword, &["normal", "italic", "oblique"]),
            PropertyDef::new("box-sizing", Keyword, &["content-box", "border-box"]),
            PropertyDef::new(
                "white-space",
                Keyword,
                &["normal", "nowrap", "pre", "pre-wrap", "pre-line", "break-spaces"],
            ),
            PropertyDef::new("font-family", Any, NONE),
            PropertyDef::new("font", Any, NONE),
            PropertyDef::new("background", Any, NONE),
            PropertyDef::new("background-image", Any, NONE),
            PropertyDef::new("border", Any, NONE),
            PropertyDef::new("outline", Any, NONE),
            PropertyDef::new("box-shadow", Any, NONE),
            PropertyDef::new("text-shadow", Any, NONE),
            PropertyDef::new("text-decoration", Any, NONE),
            PropertyDef::new("transform", Any, NONE),
            PropertyDef::new("transition", Any, NONE),
            PropertyDef::new("cursor", Any, NONE),
            PropertyDef::new("content", Any, NONE),
            PropertyDef::new("quotes", Any, NONE),
            PropertyDef::new("flex", Any, NONE),
        ];

        Self {
            defs: defs.into_iter().map(|def| (def.name, def)).collect(),
        }
    }

    /// Look up a property by name (ASCII case-insensitive).
    ///
    /// Custom properties (`--name`) are always known and accept any value.
    pub fn get(&self, name: &str) -> Option<&PropertyDef> {
        if name.starts_with("--") && name.len() > 2 {
            return Some(&CUSTOM_PROPERTY);
        }
        self.defs.get(name.to_ascii_lowercase().as_str())
    }

    /// Normalize `value` for `name`, returning the reason on failure.
    pub fn normalize(&self, name: &str, value: &str) -> Result<String, String> {
        let def = self
            .get(name)
            .ok_or_else(|| format!("unknown property '{name}'"))?;
        def.normalize(value)
            .ok_or_else(|| format!("expected {}", def.describe()))
    }

    /// Whether `name` is a known property.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of built-in properties.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

fn parse_all<F>(text: &str, f: F) -> Option<PropertyValue>
where
    F: for<'i, 't> FnOnce(&mut Parser<'i, 't>) -> Option<PropertyValue>,
{
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let value = f(&mut parser)?;
    parser.skip_whitespace();
    parser.is_exhausted().then_some(value)
}

fn strip_important(text: &str) -> Option<&str> {
    const IMPORTANT: &str = "!important";
    let split = text.len().checked_sub(IMPORTANT.len())?;
    let tail = text.get(split..)?;
    if !tail.eq_ignore_ascii_case(IMPORTANT) {
        return None;
    }
    let rest = text[..split].trim_end();
    (!rest.is_empty()).then_some(rest)
}

fn length(token: &Token<'_>, allow_percentage: bool) -> Option<PropertyValue> {
    match token {
        Token::Dimension { value, unit, .. }
            if LENGTH_UNITS.iter().any(|u| unit.eq_ignore_ascii_case(u)) =>
        {
            Some(PropertyValue::Dimension {
                value: *value,
                unit: unit.to_ascii_lowercase(),
            })
        }
        Token::Number { value, .. } if *value == 0.0 => Some(PropertyValue::Dimension {
            value: 0.0,
            unit: "px".into(),
        }),
        Token::Percentage { unit_value, .. } if allow_percentage => {
            Some(PropertyValue::Percentage(unit_value * 100.0))
        }
        _ => None,
    }
}

fn number(token: &Token<'_>) -> Option<PropertyValue> {
    match token {
        Token::Number { value, .. } => Some(PropertyValue::Number(*value)),
        _ => None,
    }
}

fn color(parser: &mut Parser<'_, '_>) -> Option<PropertyValue> {
    let token = parser.next().ok()?.clone();
    match token {
        Token::Hash(hex) | Token::IDHash(hex)
            if matches!(hex.len(), 3 | 4 | 6 | 8)
                && hex.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            Some(PropertyValue::Color(format!("#{}", hex.to_ascii_lowercase())))
        }
        Token::Ident(name) => NAMED_COLORS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(&name))
            .map(|known| PropertyValue::Color((*known).to_string())),
        Token::Function(name) => {
            let name = name.to_ascii_lowercase();
            if !COLOR_FUNCTIONS.contains(&name.as_str()) {
                return None;
            }
            let components = parser
                .parse_nested_block(|p| {
                    let mut components = vec![];
                    while let Ok(token) = p.next() {
                        match token {
                            Token::Comma | Token::Delim('/') => {}
                            Token::Number { value, .. } => components.push(format_number(*value)),
                            Token::Percentage { unit_value, .. } => {
                                components.push(format!("{}%", format_number(unit_value * 100.0)))
                            }
                            Token::Dimension { value, unit, .. }
                                if ANGLE_UNITS.iter().any(|u| unit.eq_ignore_ascii_case(u)) =>
                            {
                                components.push(format!(
                                    "{}{}",
                                    format_number(*value),
                                    unit.to_ascii_lowercase()
                                ))
                            }
                            _ => return Err(p.new_custom_error::<(), ()>(())),
                        }
                    }
                    Ok(components)
                })
                .ok()?;
            matches!(components.len(), 3 | 4)
                .then(|| PropertyValue::Color(format!("{name}({})", components.join(", "))))
        }
        _ => None,
    }
}

/// Format a number the way hosts serialize computed values.
fn format_number(value: f32) -> String {
    let rounded = (f64::from(value) * 10_000.0).round() / 10_000.0;
    // Collapse -0 so "-0px" never appears.
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(name: &str, value: &str) -> Option<String> {
        registry().normalize(name, value).ok()
    }

    #[test]
    fn lengths_are_canonical() {
        assert_eq!(normalize("width", "10px").as_deref(), Some("10px"));
        assert_eq!(normalize("width", "10.50PX").as_deref(), Some("10.5px"));
        assert_eq!(normalize("width", "0").as_deref(), Some("0px"));
        assert_eq!(normalize("width", "50%").as_deref(), Some("50%"));
        assert_eq!(normalize("width", "33.3%").as_deref(), Some("33.3%"));
        assert_eq!(normalize("width", "AUTO").as_deref(), Some("auto"));
        assert_eq!(normalize("letter-spacing", "-0.5em").as_deref(), Some("-0.5em"));
    }

    #[test]
    fn invalid_lengths_are_rejected() {
        assert!(normalize("width", "abc").is_none());
        assert!(normalize("width", "10").is_none());
        assert!(normalize("width", "10px 20px").is_none());
        assert!(normalize("letter-spacing", "10%").is_none());
    }

    #[test]
    fn edges_accept_one_to_four_values() {
        assert_eq!(normalize("margin", "0 auto").as_deref(), Some("0px auto"));
        assert_eq!(
            normalize("padding", "1px  2px 3PX 4%").as_deref(),
            Some("1px 2px 3px 4%")
        );
        assert!(normalize("margin", "1px 2px 3px 4px 5px").is_none());
        assert!(normalize("margin", "red").is_none());
    }

    #[test]
    fn colors() {
        assert_eq!(normalize("color", "#FF0000").as_deref(), Some("#ff0000"));
        assert_eq!(normalize("color", "Red").as_deref(), Some("red"));
        assert_eq!(
            normalize("color", "RGB(255,0,0)").as_deref(),
            Some("rgb(255, 0, 0)")
        );
        assert_eq!(
            normalize("background-color", "hsla(120deg, 50%, 50%, 0.5)").as_deref(),
            Some("hsla(120deg, 50%, 50%, 0.5)")
        );
        assert!(normalize("color", "#ggg").is_none());
        assert!(normalize("color", "rgb(1, 2)").is_none());
        assert!(normalize("color", "notacolor").is_none());
    }

    #[test]
    fn numbers_and_integers() {
        assert_eq!(normalize("opacity", "0.50").as_deref(), Some("0.5"));
        assert_eq!(normalize("z-index", "10").as_deref(), Some("10"));
        assert_eq!(normalize("z-index", "auto").as_deref(), Some("auto"));
        assert!(normalize("z-index", "1.5").is_none());
        assert_eq!(normalize("line-height", "1.5").as_deref(), Some("1.5"));
        assert_eq!(normalize("line-height", "20px").as_deref(), Some("20px"));
    }

    #[test]
    fn keywords() {
        assert_eq!(normalize("display", "FLEX").as_deref(), Some("flex"));
        assert_eq!(normalize("display", "inherit").as_deref(), Some("inherit"));
        assert!(normalize("display", "sideways").is_none());
    }

    #[test]
    fn important_is_preserved() {
        assert_eq!(
            normalize("color", "RED !IMPORTANT").as_deref(),
            Some("red !important")
        );
        assert!(normalize("color", "!important").is_none());
    }

    #[test]
    fn custom_and_unknown_properties() {
        assert_eq!(normalize("--accent", " blue  ").as_deref(), Some("blue"));
        assert!(registry().normalize("colour", "red").is_err());
        assert!(registry().contains("COLOR"));
    }

    #[test]
    fn describe_mentions_keywords() {
        let def = registry().get("width").unwrap();
        assert!(def.describe().contains("auto"));
        assert_eq!(
            registry().get("float").unwrap().describe(),
            "one of: none, left, right"
        );
    }
}
