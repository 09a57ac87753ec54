//! Provider lifecycle and query dispatch
//!
//! [`ProviderCore`] holds the state every backend shares (connection id,
//! SRID, geometry factory, open flag). [`Provider`] is the contract a
//! backend implements on top of it.

pub mod contract;
pub mod instrumentation;
pub mod state;

pub use contract::Provider;
pub use instrumentation::QueryInstrumentation;
pub use state::{ListenerId, ProviderCore};
