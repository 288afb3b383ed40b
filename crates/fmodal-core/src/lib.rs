#![forbid(unsafe_code)]

//! Core value types for fmodal.
//!
//! This crate provides:
//! - [`CloseTrigger`] and [`CloseEvent`] for the close-negotiation protocol
//! - [`ModalId`] for process-wide unique modal instance identifiers
//! - [`ModalError`] for wiring defects reported by the registry facade

pub mod close;
pub mod error;
pub mod id;

pub use close::{CloseEvent, CloseTrigger};
pub use error::ModalError;
pub use id::ModalId;
