//! Absolute hierarchical scene paths.
//!
//! Everything in the composed scene graph is addressed by a [`ScenePath`]
//! like `/World/Set_1/Prop_1`. The type is a cheap owned handle with the
//! small algebra the rest of the runtime builds on: parent/child
//! navigation, prefix tests, prefix replacement, and an ordering with
//! prefix locality so ordered maps keyed by path support subtree range
//! scans.

mod error;
mod path;

pub use error::{PathError, Result};
pub use path::ScenePath;
