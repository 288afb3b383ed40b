#![forbid(unsafe_code)]

//! Facade: open modals without threading a registry through every layer.
//!
//! The host activates a registry for the lifetime of its UI tree:
//!
//! ```
//! use fmodal_widgets::{ModalProps, ModalRegistry, create_modal_helper};
//!
//! let registry: ModalRegistry<String> = ModalRegistry::new(|_: ModalProps<'_, String, ()>| ());
//! let _active = registry.activate();
//!
//! let confirm = create_modal_helper(|_: ModalProps<'_, String, ()>| ());
//! let handle = confirm.open("Delete file?".to_string(), ()).unwrap();
//! assert!(registry.contains(handle.id()));
//! ```
//!
//! # Invariants
//!
//! 1. Routing is per thread. The most recent live activation wins.
//! 2. Dropping an [`ActiveRegistry`] removes exactly its own entry, so
//!    guards may be dropped out of order.
//! 3. Opening with no active registry fails with
//!    [`ModalError::NoActiveRegistry`] and creates nothing.

use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use fmodal_core::ModalError;

use super::adapter::{ModalProps, SharedAdapter};
use super::handle::ModalHandle;
use super::registry::{ModalRegistry, RegistryShared};

struct ActiveEntry {
    token: u64,
    registry: Weak<dyn Any>,
}

thread_local! {
    static ACTIVE_REGISTRIES: RefCell<Vec<ActiveEntry>> = const { RefCell::new(Vec::new()) };
    static NEXT_TOKEN: Cell<u64> = const { Cell::new(1) };
}

/// Guard keeping a registry routable from the facade.
///
/// The guard keeps the registry alive. Dropping it deactivates the registry
/// and re-exposes whichever registry was active before.
#[must_use = "dropping the guard deactivates the registry"]
pub struct ActiveRegistry {
    token: u64,
    _registry: Rc<dyn Any>,
}

impl fmt::Debug for ActiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveRegistry")
            .field("token", &self.token)
            .finish()
    }
}

impl Drop for ActiveRegistry {
    fn drop(&mut self) {
        let token = self.token;
        let remaining = ACTIVE_REGISTRIES.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.retain(|entry| entry.token != token);
            stack.len()
        });
        tracing::debug!(token, remaining, "modal registry deactivated");
    }
}

impl<C: 'static, O: 'static, R: 'static> ModalRegistry<C, O, R> {
    /// Make this registry the target of [`open_modal`] and [`ModalHelper`]
    /// on the current thread until the guard is dropped.
    pub fn activate(&self) -> ActiveRegistry {
        let registry: Rc<dyn Any> = self.shared.clone();
        let token = NEXT_TOKEN.with(|next| {
            let token = next.get();
            next.set(token + 1);
            token
        });
        let depth = ACTIVE_REGISTRIES.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(ActiveEntry {
                token,
                registry: Rc::downgrade(&registry),
            });
            stack.len()
        });
        tracing::debug!(token, depth, "modal registry activated");
        ActiveRegistry {
            token,
            _registry: registry,
        }
    }
}

/// Whether any registry is active on this thread.
#[must_use]
pub fn has_active_registry() -> bool {
    ACTIVE_REGISTRIES.with(|stack| {
        stack
            .borrow()
            .iter()
            .any(|entry| entry.registry.strong_count() > 0)
    })
}

/// The active registry, typed.
///
/// # Errors
///
/// [`ModalError::NoActiveRegistry`] if nothing is active, and
/// [`ModalError::RegistryTypeMismatch`] if the active registry was built for
/// other content, options or output types.
pub fn active_registry<C: 'static, O: 'static, R: 'static>()
-> Result<ModalRegistry<C, O, R>, ModalError> {
    let active = ACTIVE_REGISTRIES.with(|stack| {
        stack
            .borrow()
            .iter()
            .rev()
            .find_map(|entry| entry.registry.upgrade())
    });
    let active = active.ok_or(ModalError::NoActiveRegistry)?;
    active
        .downcast::<RegistryShared<C, O, R>>()
        .map(|shared| ModalRegistry { shared })
        .map_err(|_| ModalError::RegistryTypeMismatch {
            expected: type_name::<ModalRegistry<C, O, R>>(),
        })
}

fn routed_registry<C: 'static, O: 'static, R: 'static>()
-> Result<ModalRegistry<C, O, R>, ModalError> {
    active_registry().inspect_err(|err| {
        tracing::error!(error = %err, "cannot open modal");
    })
}

/// Reusable `open` entry point bound to one adapter.
pub struct ModalHelper<C, O = (), R = ()> {
    adapter: SharedAdapter<C, O, R>,
}

impl<C, O, R> Clone for ModalHelper<C, O, R> {
    fn clone(&self) -> Self {
        Self {
            adapter: Rc::clone(&self.adapter),
        }
    }
}

impl<C, O, R> fmt::Debug for ModalHelper<C, O, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalHelper").finish_non_exhaustive()
    }
}

impl<C: 'static, O: 'static, R: 'static> ModalHelper<C, O, R> {
    /// Wrap an existing shared adapter.
    #[must_use]
    pub fn from_adapter(adapter: SharedAdapter<C, O, R>) -> Self {
        Self { adapter }
    }

    /// Open `content` on the active registry with this helper's adapter.
    ///
    /// # Errors
    ///
    /// See [`active_registry`]. Nothing is opened on error.
    pub fn open(&self, content: C, options: O) -> Result<ModalHandle, ModalError> {
        let registry = routed_registry::<C, O, R>()?;
        Ok(registry.open_with(Rc::clone(&self.adapter), content, options))
    }
}

/// Bind an adapter once and get a reusable `open`.
pub fn create_modal_helper<C: 'static, O: 'static, R: 'static>(
    render: impl Fn(ModalProps<'_, C, O>) -> R + 'static,
) -> ModalHelper<C, O, R> {
    ModalHelper::from_adapter(Rc::new(render))
}

/// Open `content` on the active registry with its default adapter.
///
/// # Errors
///
/// See [`active_registry`]. Nothing is opened on error.
pub fn open_modal<C: 'static, O: 'static, R: 'static>(
    content: C,
    options: O,
) -> Result<ModalHandle, ModalError> {
    Ok(routed_registry::<C, O, R>()?.open(content, options))
}
