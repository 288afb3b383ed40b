#![forbid(unsafe_code)]

//! Runtime plumbing for fmodal.
//!
//! - [`reactive`]: version-tracked [`Observable`] values with RAII
//!   [`Subscription`]s, used for "registry changed" notifications.
//! - [`clock`]: injectable time source ([`SystemClock`], [`ManualClock`]).
//! - [`deferred`]: single-threaded [`DeferredQueue`] of delayed tasks.
//! - [`config`]: [`RegistryConfig`] with environment overrides.

pub mod clock;
pub mod config;
pub mod deferred;
pub mod reactive;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use deferred::{DeferredQueue, TaskId};
pub use reactive::{Observable, Subscription};
pub use web_time::{Duration, Instant};
