#![forbid(unsafe_code)]

//! Scripted harness for exercising a single modal without a UI host.
//!
//! [`ModalTester`] opens one piece of content in its own registry, renders
//! it through a visibility adapter (`is_open && children`), and exposes the
//! buttons a dialog would have: close, escape, click-outside, and an
//! external force-close. Time only moves through [`ModalTester::advance`].
//!
//! ```
//! use fmodal_harness::ModalTester;
//!
//! let mut tester = ModalTester::new("Hello Modal Tester!");
//! assert!(tester.is_visible());
//!
//! tester.press_force_close();
//! assert!(!tester.is_visible());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use fmodal_core::{CloseTrigger, ModalId};
use fmodal_runtime::{DeferredQueue, Duration, ManualClock, RegistryConfig};
use fmodal_widgets::{
    CloseOutcome, ModalCallbacks, ModalContext, ModalHandle, ModalProps, ModalRegistry,
    create_modal_adapter,
};

type ContextSlot = Rc<RefCell<Option<ModalContext>>>;

/// A single modal driven by simulated button presses.
pub struct ModalTester<C> {
    registry: ModalRegistry<C, ModalCallbacks, Option<C>>,
    clock: ManualClock,
    handle: ModalHandle,
    context: ContextSlot,
    frame: Vec<Option<C>>,
}

impl<C: Clone + 'static> ModalTester<C> {
    /// Open `children` with no callbacks.
    pub fn new(children: C) -> Self {
        Self::with_callbacks(children, ModalCallbacks::default())
    }

    /// Open `children`, installing `callbacks` when the modal renders.
    pub fn with_callbacks(children: C, callbacks: ModalCallbacks) -> Self {
        Self::with_config(children, callbacks, RegistryConfig::default())
    }

    /// Open `children` in a registry built from `config`.
    pub fn with_config(children: C, callbacks: ModalCallbacks, config: RegistryConfig) -> Self {
        let clock = ManualClock::new();
        let context: ContextSlot = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&context);
        let adapter = create_modal_adapter(move |props: ModalProps<'_, C, ModalCallbacks>| {
            if let Some(registration) = props.context.use_callbacks(props.options) {
                registration.detach();
            }
            *slot.borrow_mut() = Some(props.context.clone());
            props.is_open.then(|| props.children.clone())
        });
        let registry =
            ModalRegistry::with_scheduler(adapter, config, DeferredQueue::with_clock(clock.clone()));
        let handle = registry.open(children, callbacks);
        tracing::debug!(modal_id = handle.id().id(), "modal tester opened");

        let mut tester = Self {
            registry,
            clock,
            handle,
            context,
            frame: Vec::new(),
        };
        tester.render();
        tester
    }

    /// ID of the modal under test.
    #[must_use]
    pub fn id(&self) -> ModalId {
        self.handle.id()
    }

    /// The handle returned by `open`.
    #[must_use]
    pub fn handle(&self) -> &ModalHandle {
        &self.handle
    }

    /// The registry hosting the modal.
    #[must_use]
    pub fn registry(&self) -> &ModalRegistry<C, ModalCallbacks, Option<C>> {
        &self.registry
    }

    /// Whether the content was visible in the last frame.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible_content().is_some()
    }

    /// The content shown in the last frame, if any.
    #[must_use]
    pub fn visible_content(&self) -> Option<&C> {
        self.frame.iter().flatten().next()
    }

    /// Click the modal's own close button.
    pub fn press_close(&mut self) -> CloseOutcome {
        self.press(CloseTrigger::Button)
    }

    /// Press escape inside the modal.
    pub fn press_esc(&mut self) -> CloseOutcome {
        self.press(CloseTrigger::Esc)
    }

    /// Click the backdrop.
    pub fn press_click_outside(&mut self) -> CloseOutcome {
        self.press(CloseTrigger::ClickOutside)
    }

    /// Click the force-close button that sits outside the modal.
    pub fn press_force_close(&mut self) -> CloseOutcome {
        let outcome = self.handle.force_close();
        self.render();
        outcome
    }

    /// Move time forward, run due evictions, and re-render.
    pub fn advance(&mut self, delta: Duration) {
        self.clock.advance(delta);
        self.registry.tick();
        self.render();
    }

    /// Re-render every instance and keep the frame.
    pub fn render(&mut self) {
        self.frame = self
            .registry
            .render()
            .into_iter()
            .map(|rendered| rendered.output)
            .collect();
    }

    fn press(&mut self, trigger: CloseTrigger) -> CloseOutcome {
        let context = self.context.borrow().clone();
        let outcome = match context {
            Some(context) => context.close_with(trigger),
            None => CloseOutcome::NotReady,
        };
        tracing::debug!(
            modal_id = self.id().id(),
            trigger = trigger.as_str(),
            outcome = outcome.as_str(),
            "modal tester button pressed"
        );
        self.render();
        outcome
    }
}

impl<C> fmt::Debug for ModalTester<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalTester")
            .field("id", &self.handle.id())
            .field("elapsed", &self.clock.elapsed())
            .finish()
    }
}
