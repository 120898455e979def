//! Edit sessions.
//!
//! An [`EditSession`] owns every attached stylesheet, the precheck probe
//! and the property currently focused for editing. An edit runs in two
//! steps, which [`EditSession::edit_property`] performs back to back:
//!
//! 1. [`prepare_edit`](EditSession::prepare_edit) asks the probe what the
//!    host would store for the value.
//! 2. [`apply_edit`](EditSession::apply_edit) writes the override rule and
//!    checks the live read-back against that prediction.
//!
//! Every attempt, successful or not, is announced on
//! [`changes`](EditSession::changes).
//!
//! # Example
//!
//! ```
//! use horizon_restyle::prelude::*;
//!
//! let mut session = EditSession::new(SessionConfig::default()).unwrap();
//! let host = MemoryRuleList::from_css("h1 { width: 10px; color: red; }");
//! let sheet = session
//!     .attach(StyleSheetHandle::new("site.css"), Box::new(host))
//!     .unwrap();
//!
//! let edit = session.edit_property(sheet, 0, "width", "20PX").unwrap();
//! assert_eq!(edit.current_value, "20px");
//! assert_eq!(
//!     session.change_report(),
//!     "/** site.css **/\n\nh1 {\n  width: 20px;\n}"
//! );
//! ```

mod sheet;

pub use sheet::AttachedStyleSheet;

use slotmap::{SlotMap, new_key_type};

use crate::config::SessionConfig;
use crate::host::{MemoryRuleList, RuleHost};
use crate::logging::{span_names, targets};
use crate::patch::{PrecheckProbe, RuleOverrideState};
use crate::report::compute_change_report;
use crate::rules::{LogicalRule, RuleRegistry, StyleSheetHandle};
use crate::signal::Signal;
use crate::{Error, Result};

new_key_type! {
    /// Identifies a stylesheet attached to an [`EditSession`].
    pub struct StyleSheetId;
}

/// Outcome of a successful edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEdit {
    /// Stylesheet holding the rule.
    pub sheet: StyleSheetId,
    /// Logical index of the edited rule.
    pub logical_index: usize,
    /// Property name as declared in the rule.
    pub name: String,
    /// Current value before the edit.
    pub previous_value: String,
    /// Value the host stored.
    pub current_value: String,
    /// Whether the declaration now differs from its original value.
    pub changed: bool,
}

/// Emitted by [`EditSession::changes`] for every edit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// An edit reached the host and verified.
    PropertyChanged(PropertyEdit),
    /// An edit was refused or failed part way.
    EditFailed {
        /// Stylesheet the edit targeted.
        sheet: StyleSheetId,
        /// Logical index of the targeted rule.
        logical_index: usize,
        /// Property name as passed by the caller.
        name: String,
        /// Value as passed by the caller.
        attempted: String,
        /// Rendered error.
        reason: String,
    },
}

/// The property currently being edited.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FocusedProperty {
    /// Stylesheet holding the rule.
    pub sheet: StyleSheetId,
    /// Logical index of the rule.
    pub logical_index: usize,
    /// Property name as declared in the rule.
    pub name: String,
}

impl FocusedProperty {
    fn is(&self, sheet: StyleSheetId, logical_index: usize, name: &str) -> bool {
        self.sheet == sheet
            && self.logical_index == logical_index
            && self.name.eq_ignore_ascii_case(name)
    }
}

/// Where a declaration is in its edit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    /// Current value equals the original.
    Unedited,
    /// A value is being prechecked or awaits [`EditSession::apply_edit`].
    PendingPrecheck,
    /// Current value differs from the original.
    Edited,
}

/// A value that passed the precheck.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a prepared edit does nothing until applied or cancelled"]
pub struct PreparedEdit {
    sheet: StyleSheetId,
    logical_index: usize,
    name: String,
    value: String,
    expected: String,
}

impl PreparedEdit {
    /// Target stylesheet.
    pub fn sheet(&self) -> StyleSheetId {
        self.sheet
    }

    /// Logical index of the target rule.
    pub fn logical_index(&self) -> usize {
        self.logical_index
    }

    /// Property name as passed to [`EditSession::prepare_edit`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value as the caller typed it.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The value the probe predicts the host will store.
    pub fn expected_value(&self) -> &str {
        &self.expected
    }

    fn is(&self, target: &FocusedProperty) -> bool {
        target.is(self.sheet, self.logical_index, &self.name)
    }
}

/// Top-level controller for live stylesheet editing.
#[derive(Debug)]
pub struct EditSession {
    config: SessionConfig,
    probe: PrecheckProbe,
    sheets: SlotMap<StyleSheetId, AttachedStyleSheet>,
    order: Vec<StyleSheetId>,
    focus: Option<FocusedProperty>,
    pending: Option<FocusedProperty>,
    changes: Signal<ChangeEvent>,
}

impl EditSession {
    /// Create a session whose probe runs against an in-memory scratch list.
    ///
    /// Fails with [`Error::Config`] if `config` does not validate.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_probe_host(config, Box::new(MemoryRuleList::new()))
    }

    /// Create a session whose probe runs against `scratch`.
    ///
    /// `scratch` should apply the same normalization as the hosts being
    /// edited, otherwise live edits fail with a value mismatch.
    pub fn with_probe_host(config: SessionConfig, scratch: Box<dyn RuleHost>) -> Result<Self> {
        config.validate()?;
        let probe = PrecheckProbe::new(scratch, config.scratch_selector.clone());
        Ok(Self {
            config,
            probe,
            sheets: SlotMap::with_key(),
            order: Vec::new(),
            focus: None,
            pending: None,
            changes: Signal::new(),
        })
    }

    /// Settings the session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The precheck probe and its scratch host.
    pub fn probe(&self) -> &PrecheckProbe {
        &self.probe
    }

    /// Signal emitted after every edit attempt.
    pub fn changes(&self) -> &Signal<ChangeEvent> {
        &self.changes
    }

    /// Load `host` and start tracking it.
    pub fn attach(
        &mut self,
        handle: StyleSheetHandle,
        host: Box<dyn RuleHost>,
    ) -> Result<StyleSheetId> {
        let origin = handle
            .origin_or(&self.config.report.no_url_placeholder)
            .to_string();
        let span = tracing::debug_span!(target: targets::SESSION, span_names::ATTACH, %origin);
        let _enter = span.enter();

        if !handle.accessible {
            tracing::warn!(target: targets::SESSION, "stylesheet denies enumeration");
            return Err(Error::Inaccessible { origin });
        }

        let registry = RuleRegistry::load(&*host)?;
        let rules = registry.len();
        let id = self
            .sheets
            .insert(AttachedStyleSheet::new(handle, host, registry));
        self.order.push(id);

        tracing::debug!(target: targets::SESSION, rules, "attached stylesheet");
        Ok(id)
    }

    /// Stop tracking a stylesheet and hand its state back.
    pub fn detach(&mut self, id: StyleSheetId) -> Result<AttachedStyleSheet> {
        let sheet = self.sheets.remove(id).ok_or(Error::UnknownStyleSheet)?;
        self.order.retain(|&other| other != id);
        if self.focus.as_ref().is_some_and(|f| f.sheet == id) {
            self.focus = None;
        }
        if self.pending.as_ref().is_some_and(|p| p.sheet == id) {
            self.pending = None;
        }
        tracing::debug!(
            target: targets::SESSION,
            origin = ?sheet.handle.origin,
            "detached stylesheet"
        );
        Ok(sheet)
    }

    /// An attached stylesheet.
    pub fn stylesheet(&self, id: StyleSheetId) -> Result<&AttachedStyleSheet> {
        self.sheets.get(id).ok_or(Error::UnknownStyleSheet)
    }

    /// Attached stylesheets in attach order.
    pub fn stylesheets(&self) -> impl Iterator<Item = (StyleSheetId, &AttachedStyleSheet)> {
        self.order
            .iter()
            .filter_map(|&id| self.sheets.get(id).map(|sheet| (id, sheet)))
    }

    /// Style rules of a stylesheet in logical order.
    pub fn rules(&self, id: StyleSheetId) -> Result<&[LogicalRule]> {
        Ok(self.stylesheet(id)?.registry.rules())
    }

    /// One style rule by logical index.
    pub fn rule(&self, id: StyleSheetId, logical_index: usize) -> Result<&LogicalRule> {
        self.stylesheet(id)?.registry.get_by_logical_index(logical_index)
    }

    /// Override slots recorded for one rule.
    pub fn override_state(
        &self,
        id: StyleSheetId,
        logical_index: usize,
    ) -> Result<RuleOverrideState> {
        let sheet = self.stylesheet(id)?;
        sheet.registry.get_by_logical_index(logical_index)?;
        Ok(sheet.overrides.state(logical_index))
    }

    /// Whether edits to the stylesheet are refused after a failed verification.
    pub fn is_locked(&self, id: StyleSheetId) -> Result<bool> {
        Ok(self.stylesheet(id)?.locked)
    }

    /// Precheck and apply `name: value` on one rule.
    pub fn edit_property(
        &mut self,
        id: StyleSheetId,
        logical_index: usize,
        name: &str,
        value: &str,
    ) -> Result<PropertyEdit> {
        let span = tracing::debug_span!(
            target: targets::SESSION,
            span_names::EDIT,
            logical_index,
            property = name
        );
        let _enter = span.enter();

        let prepared = self.prepare_edit(id, logical_index, name, value)?;
        self.apply_edit(prepared)
    }

    /// Run the precheck for `name: value` without touching the live host.
    ///
    /// The declaration reports [`EditPhase::PendingPrecheck`] until the
    /// returned edit is applied or cancelled.
    pub fn prepare_edit(
        &mut self,
        id: StyleSheetId,
        logical_index: usize,
        name: &str,
        value: &str,
    ) -> Result<PreparedEdit> {
        if let Err(e) = self.check_editable(id, logical_index, name) {
            self.emit_failure(id, logical_index, name, value, &e);
            return Err(e);
        }

        self.pending = Some(FocusedProperty {
            sheet: id,
            logical_index,
            name: name.to_string(),
        });

        match self.probe.test_value(name, value) {
            Ok(expected) => Ok(PreparedEdit {
                sheet: id,
                logical_index,
                name: name.to_string(),
                value: value.to_string(),
                expected,
            }),
            Err(e) => {
                self.pending = None;
                self.emit_failure(id, logical_index, name, value, &e);
                Err(e)
            }
        }
    }

    /// Write a prechecked value to the live host.
    pub fn apply_edit(&mut self, prepared: PreparedEdit) -> Result<PropertyEdit> {
        if self.pending.as_ref().is_some_and(|p| prepared.is(p)) {
            self.pending = None;
        }

        match self.patch(&prepared) {
            Ok(edit) => {
                tracing::debug!(
                    target: targets::SESSION,
                    previous = %edit.previous_value,
                    current = %edit.current_value,
                    "property edited"
                );
                self.changes.emit(ChangeEvent::PropertyChanged(edit.clone()));
                Ok(edit)
            }
            Err(e) => {
                self.emit_failure(
                    prepared.sheet,
                    prepared.logical_index,
                    &prepared.name,
                    &prepared.value,
                    &e,
                );
                Err(e)
            }
        }
    }

    /// Drop a prepared edit without applying it.
    pub fn cancel_edit(&mut self, prepared: PreparedEdit) {
        if self.pending.as_ref().is_some_and(|p| prepared.is(p)) {
            self.pending = None;
        }
    }

    /// Edit a property back to its original value.
    ///
    /// An unchanged property is left alone and no host call is made.
    pub fn reset_property(
        &mut self,
        id: StyleSheetId,
        logical_index: usize,
        name: &str,
    ) -> Result<PropertyEdit> {
        let declaration = self.rule(id, logical_index)?.require_declaration(name)?;
        if !declaration.is_changed() {
            return Ok(PropertyEdit {
                sheet: id,
                logical_index,
                name: declaration.name().to_string(),
                previous_value: declaration.current_value().to_string(),
                current_value: declaration.current_value().to_string(),
                changed: false,
            });
        }

        let original = declaration.original_value().to_string();
        self.edit_property(id, logical_index, name, &original)
    }

    /// Reset every changed declaration of a stylesheet.
    ///
    /// Stops at the first failure.
    pub fn reset_all(&mut self, id: StyleSheetId) -> Result<Vec<PropertyEdit>> {
        let changed: Vec<(usize, String)> = self
            .rules(id)?
            .iter()
            .flat_map(|rule| {
                rule.changed_declarations()
                    .map(move |d| (rule.logical_index(), d.name().to_string()))
            })
            .collect();

        changed
            .into_iter()
            .map(|(logical_index, name)| self.reset_property(id, logical_index, &name))
            .collect()
    }

    /// Make `name` on the given rule the focused property.
    pub fn focus_property(
        &mut self,
        id: StyleSheetId,
        logical_index: usize,
        name: &str,
    ) -> Result<&FocusedProperty> {
        let declaration = self.rule(id, logical_index)?.require_declaration(name)?;
        let focus = FocusedProperty {
            sheet: id,
            logical_index,
            name: declaration.name().to_string(),
        };
        Ok(self.focus.insert(focus))
    }

    /// The focused property, if any.
    pub fn focused(&self) -> Option<&FocusedProperty> {
        self.focus.as_ref()
    }

    /// Drop the focus and return what was focused.
    pub fn clear_focus(&mut self) -> Option<FocusedProperty> {
        self.focus.take()
    }

    /// Edit the focused property.
    pub fn edit_focused(&mut self, value: &str) -> Result<PropertyEdit> {
        let focus = self.focus.clone().ok_or(Error::NoFocusedProperty)?;
        self.edit_property(focus.sheet, focus.logical_index, &focus.name, value)
    }

    /// Edit phase of one declaration.
    pub fn phase(&self, id: StyleSheetId, logical_index: usize, name: &str) -> Result<EditPhase> {
        let declaration = self.rule(id, logical_index)?.require_declaration(name)?;
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.is(id, logical_index, name))
        {
            return Ok(EditPhase::PendingPrecheck);
        }
        Ok(if declaration.is_changed() {
            EditPhase::Edited
        } else {
            EditPhase::Unedited
        })
    }

    /// The rule's original text with every current value applied.
    pub fn patched_rule_text(&self, id: StyleSheetId, logical_index: usize) -> Result<String> {
        self.rule(id, logical_index)?.patched_text()
    }

    /// CSS listing every changed declaration across attached stylesheets.
    pub fn change_report(&self) -> String {
        compute_change_report(
            self.stylesheets()
                .map(|(_, sheet)| (&sheet.handle, sheet.registry.rules())),
            &self.config.report,
        )
    }

    fn check_editable(&self, id: StyleSheetId, logical_index: usize, name: &str) -> Result<()> {
        let sheet = self.stylesheet(id)?;
        if sheet.locked {
            return Err(Error::StyleSheetLocked);
        }
        sheet
            .registry
            .get_by_logical_index(logical_index)?
            .require_declaration(name)?;
        Ok(())
    }

    fn patch(&mut self, prepared: &PreparedEdit) -> Result<PropertyEdit> {
        let lock_on_failure = self.config.lock_on_verification_failure;
        let sheet = self
            .sheets
            .get_mut(prepared.sheet)
            .ok_or(Error::UnknownStyleSheet)?;
        if sheet.locked {
            return Err(Error::StyleSheetLocked);
        }

        let previous_value = sheet
            .registry
            .get_by_logical_index(prepared.logical_index)?
            .require_declaration(&prepared.name)?
            .current_value()
            .to_string();

        let result = sheet.overrides.set_property(
            &mut sheet.registry,
            sheet.host.as_mut(),
            prepared.logical_index,
            &prepared.name,
            &prepared.value,
            &prepared.expected,
        );

        if lock_on_failure && let Err(e @ Error::VerificationFailed { .. }) = &result {
            sheet.locked = true;
            tracing::error!(
                target: targets::SESSION,
                origin = ?sheet.handle.origin,
                "locking stylesheet: {}",
                e
            );
        }
        result?;

        let declaration = sheet
            .registry
            .get_by_logical_index(prepared.logical_index)?
            .require_declaration(&prepared.name)?;
        Ok(PropertyEdit {
            sheet: prepared.sheet,
            logical_index: prepared.logical_index,
            name: declaration.name().to_string(),
            previous_value,
            current_value: declaration.current_value().to_string(),
            changed: declaration.is_changed(),
        })
    }

    fn emit_failure(
        &self,
        sheet: StyleSheetId,
        logical_index: usize,
        name: &str,
        attempted: &str,
        error: &Error,
    ) {
        if error.is_caller_error() {
            tracing::debug!(target: targets::SESSION, property = name, "edit refused: {}", error);
        }
        self.changes.emit(ChangeEvent::EditFailed {
            sheet,
            logical_index,
            name: name.to_string(),
            attempted: attempted.to_string(),
            reason: error.to_string(),
        });
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        self.changes.disconnect_all();
    }
}
