#![forbid(unsafe_code)]

//! The close-negotiation protocol.
//!
//! A close request runs in one synchronous turn:
//!
//! 1. A fresh [`CloseEvent`] is created for the trigger.
//! 2. The instance's before-close listener (if any) is invoked with the
//!    event and a [`ForceClose`] capability.
//! 3. If the event was not prevented, the instance closes. If it was
//!    prevented, the instance stays open unless the listener force-closed
//!    it during step 2.
//!
//! No registry borrow is held while the listener runs, so the listener may
//! force-close, open other modals, or close unrelated instances.

use std::fmt;
use std::rc::Weak;

use fmodal_core::{CloseEvent, CloseTrigger, ModalId};

use super::context::{BeforeCloseListener, ForceClose, ModalContext};

/// What a close or force-close request did.
///
/// None of these is an error: handles may legitimately outlive their
/// instance or be used before it first renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseOutcome {
    /// The instance transitioned from open to closed.
    Closed,
    /// The listener prevented the default outcome and did not force-close.
    Vetoed,
    /// The instance was already closed and waiting for eviction.
    AlreadyClosed,
    /// The handle was used before the instance rendered for the first time.
    NotReady,
    /// The record no longer exists (evicted, torn down, or registry dropped).
    Missing,
}

impl CloseOutcome {
    /// Stable lowercase name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Vetoed => "vetoed",
            Self::AlreadyClosed => "already-closed",
            Self::NotReady => "not-ready",
            Self::Missing => "missing",
        }
    }

    /// Whether this request closed the instance.
    #[inline]
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for CloseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-erased view of a registry used by handles, contexts and listeners.
///
/// Every method takes and releases its own borrow; none calls user code.
pub(crate) trait ModalControl {
    /// `Some(is_open)` while the record exists.
    fn open_state(&self, id: ModalId) -> Option<bool>;

    /// `Some(installed)` while the record exists.
    fn is_installed(&self, id: ModalId) -> Option<bool>;

    /// Clone of the instance's before-close listener.
    fn listener(&self, id: ModalId) -> Option<BeforeCloseListener>;

    /// Generation of the installed listener, if any.
    fn listener_generation(&self, id: ModalId) -> Option<u64>;

    /// Set `is_open = false` and schedule eviction. Returns `true` if the
    /// record transitioned.
    fn commit_close(&self, id: ModalId) -> bool;

    /// Install `listener`, replacing any previous one. Returns the listener
    /// generation, or `None` if the record is gone.
    fn set_listener(&self, id: ModalId, listener: BeforeCloseListener) -> Option<u64>;

    /// Remove the listener if it is still the one installed at `generation`.
    fn remove_listener(&self, id: ModalId, generation: u64) -> bool;
}

pub(crate) type ControlRef = Weak<dyn ModalControl>;

/// Unconditionally close `id`, bypassing any listener.
pub(crate) fn force_close(control: &dyn ModalControl, id: ModalId) -> CloseOutcome {
    match control.open_state(id) {
        None => CloseOutcome::Missing,
        Some(false) => CloseOutcome::AlreadyClosed,
        Some(true) => {
            control.commit_close(id);
            tracing::debug!(modal_id = id.id(), "modal force-closed");
            CloseOutcome::Closed
        }
    }
}

/// Run the negotiation protocol for `id`.
pub(crate) fn negotiate_close(
    control: &dyn ModalControl,
    registry: &ControlRef,
    id: ModalId,
    trigger: CloseTrigger,
) -> CloseOutcome {
    match control.open_state(id) {
        None => return CloseOutcome::Missing,
        Some(false) => return CloseOutcome::AlreadyClosed,
        Some(true) => {}
    }

    let mut event = CloseEvent::new(trigger);
    if let Some(listener) = control.listener(id) {
        let force = ForceClose::new(ModalContext::new(id, registry.clone()));
        listener(&mut event, &force);
    }

    let outcome = if !event.is_default_prevented() {
        control.commit_close(id);
        CloseOutcome::Closed
    } else if control.open_state(id) == Some(true) {
        CloseOutcome::Vetoed
    } else {
        // The listener prevented the default but force-closed itself.
        CloseOutcome::Closed
    };

    tracing::debug!(
        modal_id = id.id(),
        trigger = trigger.as_str(),
        outcome = outcome.as_str(),
        "close negotiated"
    );
    outcome
}
