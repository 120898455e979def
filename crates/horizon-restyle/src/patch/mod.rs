//! Live property patching: override bookkeeping and value prechecks.

mod bookkeeper;
mod probe;

pub use bookkeeper::{OverrideBookkeeper, OverrideSlots, RuleOverrideState};
pub use probe::{DEFAULT_SCRATCH_SELECTOR, PrecheckProbe};
