//! Live property patching for CSS rule lists.
//!
//! This crate edits declarations of stylesheets owned by a host that only
//! exposes an ordered list of rules with whole-rule insert and delete, the
//! way a browser's CSSOM does. Features:
//!
//! - **Override rules**: each edit becomes a single-declaration rule placed
//!   right after the original, which is never modified
//! - **Stable addressing**: style rules keep their logical index while
//!   overrides shift host positions underneath them
//! - **Prechecks**: candidate values are tried on a scratch rule list first,
//!   so the host's normalization is known before the live edit
//! - **Change reports**: every edit so far, rendered as CSS
//!
//! # Example
//!
//! ```
//! use horizon_restyle::prelude::*;
//!
//! let mut session = EditSession::new(SessionConfig::default())?;
//! let host = MemoryRuleList::from_css("p { margin: 0px; } h1 { color: red; }");
//! let sheet = session.attach(StyleSheetHandle::inline(), Box::new(host))?;
//!
//! session.edit_property(sheet, 1, "color", "#00F")?;
//!
//! assert_eq!(session.rule(sheet, 1)?.host_index(), 1);
//! assert_eq!(session.stylesheet(sheet)?.host().rule_count(), 3);
//! assert_eq!(
//!     session.change_report(),
//!     "/** (no URL) **/\n\nh1 {\n  color: #00f;\n}"
//! );
//! # Ok::<(), horizon_restyle::Error>(())
//! ```

pub mod config;
pub mod host;
pub mod logging;
pub mod parser;
pub mod patch;
pub mod properties;
pub mod report;
pub mod rules;
pub mod session;
pub mod signal;

mod error;

pub use error::{Error, Result};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::host::{HostError, MemoryRuleList, RuleHost};
    pub use crate::patch::{OverrideBookkeeper, PrecheckProbe, RuleOverrideState};
    pub use crate::report::{ReportFormat, compute_change_report};
    pub use crate::rules::{Declaration, LogicalRule, RuleRegistry, StyleSheetHandle};
    pub use crate::session::{
        ChangeEvent, EditPhase, EditSession, FocusedProperty, PreparedEdit, PropertyEdit,
        StyleSheetId,
    };
    pub use crate::signal::{ConnectionGuard, Signal};
    pub use crate::{Error, Result};
}
