//! In-memory session lifecycle.
//!
//! `SessionStore` owns every in-progress session keyed by user, with TTL
//! semantics checked on access. `SessionReaper` periodically evicts the
//! expired ones so abandoned sessions do not accumulate.

pub mod reaper;
pub mod store;

pub use reaper::SessionReaper;
pub use store::SessionStore;
