#![forbid(unsafe_code)]

//! Adapters turn a registry record into presentation output.
//!
//! The registry knows nothing about how a modal looks. On every render it
//! hands each record's adapter a [`ModalProps`] and keeps whatever the
//! adapter returns. Any `Fn(ModalProps<'_, C, O>) -> R` is an adapter.

use std::rc::Rc;

use super::context::ModalContext;
use super::negotiation::CloseOutcome;

/// Everything an adapter needs to render one instance.
pub struct ModalProps<'a, C, O> {
    /// Open state at the time of this render.
    pub is_open: bool,
    /// Interception channel for this instance.
    pub context: &'a ModalContext,
    /// The content passed to `open`.
    pub children: &'a C,
    /// The per-instance options passed to `open`.
    pub options: &'a O,
}

impl<C, O> Clone for ModalProps<'_, C, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, O> Copy for ModalProps<'_, C, O> {}

impl<C, O> ModalProps<'_, C, O> {
    /// Negotiated close with the default trigger.
    ///
    /// Shorthand for `props.context.close()`, for adapters wiring a close
    /// button.
    pub fn close(&self) -> CloseOutcome {
        self.context.close()
    }
}

/// Renders registry records.
pub trait ModalAdapter<C, O, R> {
    /// Produce output for one instance.
    fn render(&self, props: ModalProps<'_, C, O>) -> R;
}

impl<C, O, R, F> ModalAdapter<C, O, R> for F
where
    F: Fn(ModalProps<'_, C, O>) -> R,
{
    fn render(&self, props: ModalProps<'_, C, O>) -> R {
        self(props)
    }
}

/// Reference-counted adapter, shareable between records.
pub type SharedAdapter<C, O, R> = Rc<dyn ModalAdapter<C, O, R>>;

/// Wrap a render function as a [`SharedAdapter`].
///
/// The function is returned unchanged behind an `Rc`; this exists so call
/// sites can name their adapters without spelling out the trait object.
pub fn create_modal_adapter<C, O, R>(
    render: impl Fn(ModalProps<'_, C, O>) -> R + 'static,
) -> SharedAdapter<C, O, R> {
    Rc::new(render)
}
