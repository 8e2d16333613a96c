//! Exact nearest-neighbor search over fixed-dimension `f32` vectors.
//!
//! Entries are keyed by opaque [`Handle`]s issued by the index. A handle stays
//! valid until the entry is removed, and removing one entry never renumbers
//! another.

pub mod error;
pub mod flat;
pub mod l2;
pub mod vecstore;

pub use error::VecError;
pub use flat::FlatIndex;
pub use l2::{l2_normalize, squared_l2};
pub use vecstore::{Handle, Match, VecIndex};
