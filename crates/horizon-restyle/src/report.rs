//! Change report rendering.

use serde::Deserialize;

use crate::rules::{LogicalRule, StyleSheetHandle};

/// Text used when rendering a change report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportFormat {
    /// Header text for stylesheets without an origin.
    pub no_url_placeholder: String,
    /// The whole report when nothing changed.
    pub empty_placeholder: String,
    /// Indentation of declarations inside a rule block.
    pub indent: String,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self {
            no_url_placeholder: "(no URL)".to_string(),
            empty_placeholder: "/* No changes */".to_string(),
            indent: "  ".to_string(),
        }
    }
}

/// Render every changed declaration as CSS, grouped by stylesheet.
///
/// Stylesheets and rules without changes are left out. Each stylesheet
/// starts with a `/** origin **/` header line; rule blocks are separated by
/// blank lines. When nothing changed the result is exactly
/// [`ReportFormat::empty_placeholder`].
pub fn compute_change_report<'a, I>(stylesheets: I, format: &ReportFormat) -> String
where
    I: IntoIterator<Item = (&'a StyleSheetHandle, &'a [LogicalRule])>,
{
    let sections: Vec<String> = stylesheets
        .into_iter()
        .filter_map(|(handle, rules)| render_stylesheet(handle, rules, format))
        .collect();

    if sections.is_empty() {
        return format.empty_placeholder.clone();
    }
    sections.join("\n\n")
}

fn render_stylesheet(
    handle: &StyleSheetHandle,
    rules: &[LogicalRule],
    format: &ReportFormat,
) -> Option<String> {
    let blocks: Vec<String> = rules
        .iter()
        .filter(|rule| rule.has_changes())
        .map(|rule| render_rule(rule, format))
        .collect();

    if blocks.is_empty() {
        return None;
    }

    let header = format!("/** {} **/", handle.origin_or(&format.no_url_placeholder));
    Some(format!("{header}\n\n{}", blocks.join("\n\n")))
}

fn render_rule(rule: &LogicalRule, format: &ReportFormat) -> String {
    let mut out = format!("{} {{\n", rule.selector_text());
    for declaration in rule.changed_declarations() {
        out.push_str(&format!(
            "{}{}: {};\n",
            format.indent,
            declaration.name(),
            declaration.current_value()
        ));
    }
    out.push('}');
    out
}
