#![forbid(unsafe_code)]

//! The capability returned to whoever opened a modal.

use std::fmt;
use std::rc::Rc;

use fmodal_core::{CloseTrigger, ModalId};

use super::negotiation::{self, CloseOutcome, ControlRef, ModalControl};

/// Close capability for one modal instance.
///
/// A handle resolves its record by id on every call, so it never acts on a
/// stale record. It does nothing until the instance has rendered once, and
/// nothing after the record is evicted; both cases log a warning and report
/// [`CloseOutcome::NotReady`] / [`CloseOutcome::Missing`].
#[derive(Clone)]
pub struct ModalHandle {
    id: ModalId,
    registry: ControlRef,
}

impl ModalHandle {
    pub(crate) fn new(id: ModalId, registry: ControlRef) -> Self {
        Self { id, registry }
    }

    /// ID of the instance.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ModalId {
        self.id
    }

    /// `Some(is_open)` while the record exists.
    #[must_use]
    pub fn is_open(&self) -> Option<bool> {
        self.registry.upgrade()?.open_state(self.id)
    }

    /// Whether the instance has rendered and close requests take effect.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.registry
            .upgrade()
            .and_then(|control| control.is_installed(self.id))
            .unwrap_or(false)
    }

    /// Request a close with the [`CloseTrigger::Button`] trigger.
    pub fn close(&self) -> CloseOutcome {
        self.close_with(CloseTrigger::default())
    }

    /// Request a close, letting the instance's listener veto it.
    pub fn close_with(&self, trigger: CloseTrigger) -> CloseOutcome {
        match self.ready_control("close") {
            Ok(control) => {
                negotiation::negotiate_close(&*control, &self.registry, self.id, trigger)
            }
            Err(outcome) => outcome,
        }
    }

    /// Close unconditionally, bypassing the listener.
    pub fn force_close(&self) -> CloseOutcome {
        match self.ready_control("force_close") {
            Ok(control) => negotiation::force_close(&*control, self.id),
            Err(outcome) => outcome,
        }
    }

    fn ready_control(&self, action: &'static str) -> Result<Rc<dyn ModalControl>, CloseOutcome> {
        let Some(control) = self.registry.upgrade() else {
            tracing::warn!(modal_id = self.id.id(), action, "modal registry is gone");
            return Err(CloseOutcome::Missing);
        };
        match control.is_installed(self.id) {
            Some(true) => Ok(control),
            Some(false) => {
                tracing::warn!(
                    modal_id = self.id.id(),
                    action,
                    "modal has not rendered yet; request ignored"
                );
                Err(CloseOutcome::NotReady)
            }
            None => {
                tracing::warn!(
                    modal_id = self.id.id(),
                    action,
                    "modal no longer exists; request ignored"
                );
                Err(CloseOutcome::Missing)
            }
        }
    }
}

impl fmt::Debug for ModalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalHandle")
            .field("id", &self.id)
            .field("is_open", &self.is_open())
            .finish()
    }
}
