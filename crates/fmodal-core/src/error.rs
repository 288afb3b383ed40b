#![forbid(unsafe_code)]

//! Errors for registry wiring defects.
//!
//! Stale handles are not errors: closing a modal whose record is gone, or
//! whose instance has not rendered yet, is a logged no-op. The variants here
//! only describe a misconfigured host.

/// Error type for modal facade operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalError {
    /// `open` was called while no registry scope was active.
    NoActiveRegistry,
    /// The active registry renders a different content/options/output type
    /// than the helper that tried to open through it.
    RegistryTypeMismatch {
        /// Type name the caller expected the active registry to have.
        expected: &'static str,
    },
}

impl std::fmt::Display for ModalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveRegistry => write!(
                f,
                "no active modal registry; activate a ModalRegistry before opening modals"
            ),
            Self::RegistryTypeMismatch { expected } => {
                write!(f, "active modal registry is not a {expected}")
            }
        }
    }
}

impl std::error::Error for ModalError {}
