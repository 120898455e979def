//! Per-stylesheet session state.

use crate::host::RuleHost;
use crate::patch::OverrideBookkeeper;
use crate::rules::{RuleRegistry, StyleSheetHandle};

/// A stylesheet attached to an [`EditSession`](super::EditSession).
///
/// Owns the host rule list together with the registry and override
/// bookkeeping that describe it.
pub struct AttachedStyleSheet {
    pub(super) handle: StyleSheetHandle,
    pub(super) host: Box<dyn RuleHost>,
    pub(super) registry: RuleRegistry,
    pub(super) overrides: OverrideBookkeeper,
    pub(super) locked: bool,
}

impl AttachedStyleSheet {
    pub(super) fn new(
        handle: StyleSheetHandle,
        host: Box<dyn RuleHost>,
        registry: RuleRegistry,
    ) -> Self {
        Self {
            handle,
            host,
            registry,
            overrides: OverrideBookkeeper::new(),
            locked: false,
        }
    }

    /// Identity the stylesheet was attached with.
    pub fn handle(&self) -> &StyleSheetHandle {
        &self.handle
    }

    /// The live host rule list, override rows included.
    pub fn host(&self) -> &dyn RuleHost {
        self.host.as_ref()
    }

    /// Logical style rules of the stylesheet.
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Override rows inserted so far.
    pub fn overrides(&self) -> &OverrideBookkeeper {
        &self.overrides
    }

    /// Whether a verification failure has locked this stylesheet.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Give the host back, dropping all bookkeeping.
    pub fn into_host(self) -> Box<dyn RuleHost> {
        self.host
    }
}

impl std::fmt::Debug for AttachedStyleSheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachedStyleSheet")
            .field("handle", &self.handle)
            .field("host_rules", &self.host.rule_count())
            .field("rules", &self.registry.len())
            .field("overrides", &self.overrides.override_count())
            .field("locked", &self.locked)
            .finish()
    }
}
