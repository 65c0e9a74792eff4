//! Composed prim indexes and their instancing keys.
//!
//! The composition engine collapses layered scene description into one
//! [`PrimIndex`] per prim: the ordered set of arcs that contribute
//! opinions to it, plus whether the subtree is eligible for instancing.
//! [`InstanceKey`] condenses a prim index into the fingerprint the
//! instance cache de-duplicates on.

mod instance_key;
mod prim_index;

pub use instance_key::InstanceKey;
pub use prim_index::{ArcKind, CompositionArc, PrimIndex};
