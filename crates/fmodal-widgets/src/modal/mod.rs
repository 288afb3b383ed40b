#![forbid(unsafe_code)]

//! Modal registry, close negotiation, and the registry facade.
//!
//! # Close Negotiation
//!
//! Every close request runs one synchronous protocol (see [`CloseOutcome`]):
//! a fresh [`fmodal_core::CloseEvent`] goes to the instance's before-close
//! listener, and the close commits unless the listener prevented it. The
//! listener also gets a [`ForceClose`] so it can run its own confirmation
//! flow and close later.
//!
//! # Rendering
//!
//! The registry does not draw anything. Each record carries an adapter
//! ([`ModalAdapter`]) that maps [`ModalProps`] to the host's output type.
//! Hosts subscribe to [`ModalRegistry::subscribe`] and call
//! [`ModalRegistry::render`] when notified.
//!
//! # Example
//!
//! ```
//! use fmodal_core::CloseTrigger;
//! use fmodal_widgets::modal::{CloseOutcome, ModalProps, ModalRegistry};
//!
//! let registry: ModalRegistry<&'static str, (), Option<String>> =
//!     ModalRegistry::new(|props: ModalProps<'_, &'static str, ()>| {
//!         props
//!             .context
//!             .register_before_close(|event, _force| {
//!                 if event.trigger().is_dismissal() {
//!                     event.prevent_default();
//!                 }
//!             })
//!             .detach();
//!         props.is_open.then(|| props.children.to_string())
//!     });
//!
//! let handle = registry.open("Unsaved changes", ());
//! registry.render();
//!
//! assert_eq!(handle.close_with(CloseTrigger::Esc), CloseOutcome::Vetoed);
//! assert_eq!(handle.close(), CloseOutcome::Closed);
//! ```

mod adapter;
mod context;
mod handle;
mod negotiation;
mod provider;
mod registry;

pub use adapter::{ModalAdapter, ModalProps, SharedAdapter, create_modal_adapter};
pub use context::{
    BeforeCloseListener, BeforeCloseRegistration, ForceClose, ModalCallbacks, ModalContext,
};
pub use handle::ModalHandle;
pub use negotiation::CloseOutcome;
pub use provider::{
    ActiveRegistry, ModalHelper, active_registry, create_modal_helper, has_active_registry,
    open_modal,
};
pub use registry::{ModalRegistry, RenderedModal};
