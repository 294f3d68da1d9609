//! Two-tier candidate lookup: exact transfer-index match, then a fuzzy
//! directory walk when the index has nothing under the local base.

pub mod deep;
pub mod exact;

pub use deep::{locate, DeepMatch};
pub use exact::find_candidates;
