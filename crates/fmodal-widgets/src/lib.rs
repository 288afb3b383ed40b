#![forbid(unsafe_code)]

//! Modal lifecycle management for fmodal.
//!
//! See [`modal`] for the registry, the close-negotiation protocol, and the
//! process-scoped facade.

pub mod modal;

pub use modal::{
    ActiveRegistry, BeforeCloseListener, BeforeCloseRegistration, CloseOutcome, ForceClose,
    ModalAdapter, ModalCallbacks, ModalContext, ModalHandle, ModalHelper, ModalProps,
    ModalRegistry, RenderedModal, SharedAdapter, active_registry, create_modal_adapter,
    create_modal_helper, has_active_registry, open_modal,
};
