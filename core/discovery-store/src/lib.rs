//! Durable registration state for the discovery service.
//!
//! - [`RegistrationStore`]: SQLite-backed records keyed by serial, with the
//!   confirmation transition and aggregate stats
//! - [`IdentityAllocator`]: atomic assign-or-lookup of `{prefix}-{NN}` hostnames
//!
//! All operations are blocking and serialize on one connection; async callers
//! should run them on a blocking thread.

mod allocator;
mod error;
mod store;

pub use allocator::{Assignment, IdentityAllocator, DEFAULT_MAX_ATTEMPTS};
pub use error::{StoreError, StoreResult};
pub use store::RegistrationStore;
