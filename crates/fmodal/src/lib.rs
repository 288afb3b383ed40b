#![forbid(unsafe_code)]

//! fmodal: modal-dialog lifecycle management.
//!
//! Open a piece of content as a modal, negotiate how it closes (button,
//! backdrop click, escape, or a forced close), let the content veto a close
//! before it happens, and reclaim the record after its exit render.
//!
//! ```
//! use fmodal::prelude::*;
//!
//! let registry: ModalRegistry<&'static str, (), bool> =
//!     ModalRegistry::new(|props: ModalProps<'_, &'static str, ()>| props.is_open);
//! let _active = registry.activate();
//!
//! let handle = open_modal::<&'static str, (), bool>("Hello", ()).unwrap();
//! registry.render();
//! assert_eq!(handle.close_with(CloseTrigger::Esc), CloseOutcome::Closed);
//! ```
//!
//! Crates:
//! - [`core`]: close triggers, close events, ids, errors.
//! - [`runtime`]: observables, clocks, the deferred task queue, configuration.
//! - [`widgets`]: the registry, close negotiation, adapters, and the facade.
//! - `harness` (feature `harness`): the scripted `ModalTester`.

pub use fmodal_core as core;
#[cfg(feature = "harness")]
pub use fmodal_harness as harness;
pub use fmodal_runtime as runtime;
pub use fmodal_widgets as widgets;

pub use fmodal_core::{CloseEvent, CloseTrigger, ModalError, ModalId};
pub use fmodal_runtime::RegistryConfig;
pub use fmodal_widgets::{
    ActiveRegistry, CloseOutcome, ForceClose, ModalCallbacks, ModalContext, ModalHandle,
    ModalHelper, ModalProps, ModalRegistry, create_modal_adapter, create_modal_helper,
    has_active_registry, open_modal,
};

/// Everything needed to open, render and close modals.
pub mod prelude {
    pub use fmodal_core::{CloseEvent, CloseTrigger, ModalError, ModalId};
    pub use fmodal_runtime::{DeferredQueue, ManualClock, RegistryConfig, Subscription};
    pub use fmodal_widgets::{
        ActiveRegistry, BeforeCloseRegistration, CloseOutcome, ForceClose, ModalAdapter,
        ModalCallbacks, ModalContext, ModalHandle, ModalHelper, ModalProps, ModalRegistry,
        RenderedModal, SharedAdapter, create_modal_adapter, create_modal_helper,
        has_active_registry, open_modal,
    };

    #[cfg(feature = "harness")]
    pub use fmodal_harness::ModalTester;
}
