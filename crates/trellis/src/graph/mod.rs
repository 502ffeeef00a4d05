//! Graph algorithms over a single edge set.
//!
//! Nothing in here knows about tasks or storage: callers read the edges of
//! one kind and hand them over as `(source, target)` pairs.

pub mod cycle;

pub use cycle::{reachable, would_create_cycle};
