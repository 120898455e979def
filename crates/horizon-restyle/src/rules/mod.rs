//! Logical rules, their registry, and stylesheet handles.

mod registry;
mod rule;
mod stylesheet;

pub use registry::RuleRegistry;
pub use rule::{Declaration, LogicalRule};
pub use stylesheet::StyleSheetHandle;
