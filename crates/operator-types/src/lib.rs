//! Shared domain and CRD types for the wiki translation operator.
//!
//! This crate has no async runtime dependency of its own; it is pulled in by
//! every reconciler, the session manager, and the API façade so that all of
//! them agree on one definition of a `Target`, `Page`, `TranslationJob`, and
//! the machine-readable `Reason` taxonomy.

pub mod condition;
pub mod crd;
pub mod domain;
pub mod reason;

pub use condition::Condition;
pub use reason::Reason;
