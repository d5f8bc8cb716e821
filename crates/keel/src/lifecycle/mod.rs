//! Top-level composition of CLI dispatch, the control plane, signal
//! handling, and the hosted task.

mod errors;
mod service;
mod state;

pub use errors::LifecycleError;
pub use service::{Service, Task};
pub use state::LifecycleState;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");
