#![forbid(unsafe_code)]

//! The interception channel: what a rendered modal instance can see.
//!
//! A [`ModalContext`] is handed to the adapter (and through it to the
//! content) on every render. Content uses it to close its own instance and
//! to register at most one before-close listener.
//!
//! # Invariants
//!
//! 1. An instance has at most one listener. Registering again replaces the
//!    previous listener and makes the previous registration inert.
//! 2. Dropping a [`BeforeCloseRegistration`] removes its listener, unless it
//!    was detached or already replaced.
//! 3. All methods are no-ops once the instance's record is gone.

use std::fmt;
use std::rc::Rc;

use fmodal_core::{CloseEvent, CloseTrigger, ModalId};

use super::negotiation::{self, CloseOutcome, ControlRef};

/// A before-close listener: `(event, force_close)`.
///
/// The listener may call [`CloseEvent::prevent_default`] to keep the modal
/// open for this request, and may call [`ForceClose::force_close`] to close
/// it regardless.
pub type BeforeCloseListener = Rc<dyn Fn(&mut CloseEvent, &ForceClose)>;

/// Instance-scoped view of the registry given to adapters and content.
#[derive(Clone)]
pub struct ModalContext {
    id: ModalId,
    registry: ControlRef,
}

impl ModalContext {
    pub(crate) fn new(id: ModalId, registry: ControlRef) -> Self {
        Self { id, registry }
    }

    /// ID of the instance this context belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ModalId {
        self.id
    }

    /// Whether the instance is currently open. `false` once evicted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.registry
            .upgrade()
            .and_then(|control| control.open_state(self.id))
            .unwrap_or(false)
    }

    /// Request a close with the default [`CloseTrigger::Button`] trigger.
    pub fn close(&self) -> CloseOutcome {
        self.close_with(CloseTrigger::default())
    }

    /// Request a close, running the before-close listener first.
    pub fn close_with(&self, trigger: CloseTrigger) -> CloseOutcome {
        match self.registry.upgrade() {
            Some(control) => {
                negotiation::negotiate_close(&*control, &self.registry, self.id, trigger)
            }
            None => CloseOutcome::Missing,
        }
    }

    /// Close unconditionally, bypassing the listener.
    pub fn force_close(&self) -> CloseOutcome {
        match self.registry.upgrade() {
            Some(control) => negotiation::force_close(&*control, self.id),
            None => CloseOutcome::Missing,
        }
    }

    /// Register the instance's before-close listener.
    ///
    /// Replaces any listener registered earlier for this instance.
    #[must_use = "dropping the registration removes the listener; call detach() to keep it"]
    pub fn register_before_close(
        &self,
        listener: impl Fn(&mut CloseEvent, &ForceClose) + 'static,
    ) -> BeforeCloseRegistration {
        self.register_listener(Rc::new(listener))
    }

    /// Install the listener from a [`ModalCallbacks`] bundle, if it has one.
    #[must_use = "dropping the registration removes the listener; call detach() to keep it"]
    pub fn use_callbacks(&self, callbacks: &ModalCallbacks) -> Option<BeforeCloseRegistration> {
        callbacks
            .on_before_close
            .as_ref()
            .map(|listener| self.register_listener(Rc::clone(listener)))
    }

    fn register_listener(&self, listener: BeforeCloseListener) -> BeforeCloseRegistration {
        let generation = self
            .registry
            .upgrade()
            .and_then(|control| control.set_listener(self.id, listener));
        if generation.is_none() {
            tracing::warn!(
                modal_id = self.id.id(),
                "before-close listener registered on a modal that no longer exists"
            );
        }
        BeforeCloseRegistration {
            id: self.id,
            registry: self.registry.clone(),
            generation,
        }
    }
}

impl fmt::Debug for ModalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalContext")
            .field("id", &self.id)
            .field("is_open", &self.is_open())
            .finish()
    }
}

/// Unconditional close capability passed to before-close listeners.
pub struct ForceClose {
    context: ModalContext,
}

impl ForceClose {
    pub(crate) fn new(context: ModalContext) -> Self {
        Self { context }
    }

    /// ID of the instance being closed.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ModalId {
        self.context.id()
    }

    /// Close the instance, bypassing the listener.
    pub fn force_close(&self) -> CloseOutcome {
        self.context.force_close()
    }
}

impl fmt::Debug for ForceClose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceClose").field("id", &self.id()).finish()
    }
}

/// Token for an installed before-close listener.
///
/// Dropping the token deregisters the listener. Call
/// [`detach`](Self::detach) to keep the listener for the rest of the
/// instance's lifetime.
#[must_use = "dropping the registration removes the listener; call detach() to keep it"]
pub struct BeforeCloseRegistration {
    id: ModalId,
    registry: ControlRef,
    generation: Option<u64>,
}

impl BeforeCloseRegistration {
    /// ID of the instance the listener belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ModalId {
        self.id
    }

    /// Whether this registration's listener is still the installed one.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let (Some(generation), Some(control)) = (self.generation, self.registry.upgrade()) else {
            return false;
        };
        control.listener_generation(self.id) == Some(generation)
    }

    /// Remove the listener now.
    ///
    /// Returns `true` if this registration's listener was installed.
    pub fn deregister(mut self) -> bool {
        self.release()
    }

    /// Keep the listener installed after this token is dropped.
    pub fn detach(mut self) {
        self.generation = None;
    }

    fn release(&mut self) -> bool {
        let Some(generation) = self.generation.take() else {
            return false;
        };
        self.registry
            .upgrade()
            .is_some_and(|control| control.remove_listener(self.id, generation))
    }
}

impl Drop for BeforeCloseRegistration {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for BeforeCloseRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeforeCloseRegistration")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Bundle of optional callbacks content can hand to [`ModalContext::use_callbacks`].
#[derive(Clone, Default)]
pub struct ModalCallbacks {
    /// Listener consulted before every negotiated close.
    pub on_before_close: Option<BeforeCloseListener>,
}

impl ModalCallbacks {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the before-close listener.
    #[must_use]
    pub fn on_before_close(
        mut self,
        listener: impl Fn(&mut CloseEvent, &ForceClose) + 'static,
    ) -> Self {
        self.on_before_close = Some(Rc::new(listener));
        self
    }
}

impl fmt::Debug for ModalCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalCallbacks")
            .field("on_before_close", &self.on_before_close.is_some())
            .finish()
    }
}
