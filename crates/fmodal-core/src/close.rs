#![forbid(unsafe_code)]

//! Close triggers and the per-attempt close event.
//!
//! Every close request made through a modal's `close` path creates a fresh
//! [`CloseEvent`] carrying the [`CloseTrigger`] that caused it. A before-close
//! listener may call [`CloseEvent::prevent_default`] to veto the default
//! outcome for that single request.
//!
//! # Invariants
//!
//! 1. A new event always starts with `prevented == false`.
//! 2. `prevent_default` is idempotent: calling it twice equals calling it once.
//! 3. There is no way to clear the flag once set.

use std::fmt;

/// The UI action that originated a close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CloseTrigger {
    /// An explicit close/dismiss button. Used when no trigger is given.
    #[default]
    Button,
    /// A click on the backdrop, outside the dialog content.
    ClickOutside,
    /// The Escape key.
    Esc,
}

impl CloseTrigger {
    /// All triggers, in declaration order.
    pub const ALL: [CloseTrigger; 3] = [Self::Button, Self::ClickOutside, Self::Esc];

    /// Stable lowercase name for logs and test fixtures.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::ClickOutside => "click-outside",
            Self::Esc => "esc",
        }
    }

    /// Whether this trigger is a "soft" dismissal (backdrop or Escape) rather
    /// than an explicit button press.
    #[inline]
    #[must_use]
    pub const fn is_dismissal(self) -> bool {
        matches!(self, Self::ClickOutside | Self::Esc)
    }
}

impl fmt::Display for CloseTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single close attempt, handed to the before-close listener.
///
/// The registry reads [`is_default_prevented`](Self::is_default_prevented)
/// exactly once, immediately after the listener returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    trigger: CloseTrigger,
    prevented: bool,
}

impl CloseEvent {
    /// Create a fresh, non-prevented event for `trigger`.
    #[must_use]
    pub const fn new(trigger: CloseTrigger) -> Self {
        Self {
            trigger,
            prevented: false,
        }
    }

    /// The trigger that caused this close attempt.
    #[inline]
    #[must_use]
    pub const fn trigger(&self) -> CloseTrigger {
        self.trigger
    }

    /// Veto the default close outcome for this attempt.
    pub fn prevent_default(&mut self) {
        self.prevented = true;
    }

    /// Whether the default close outcome was vetoed.
    #[inline]
    #[must_use]
    pub const fn is_default_prevented(&self) -> bool {
        self.prevented
    }
}

impl Default for CloseEvent {
    fn default() -> Self {
        Self::new(CloseTrigger::default())
    }
}
