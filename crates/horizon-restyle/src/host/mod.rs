//! Host rule lists.

mod memory;
mod rule_host;

pub use memory::MemoryRuleList;
pub use rule_host::{HostError, HostRuleKind, RuleHost};
