//! Instance de-duplication cache for the composed scene graph.
//!
//! Some subtrees of the composed scene are marked instanceable: any two
//! whose composition signature matches should be presented by a single
//! shared "master" subtree instead of being materialized per instance.
//! This crate owns the bookkeeping that makes that sharing correct and
//! incremental: staged registration of instanceable prim indexes, batched
//! application of additions and removals, and the query surface
//! (including path translation across nested instancing) that the rest of
//! the runtime asks about masters.
//!
//! The cache is driven in passes. Any number of threads stage work with
//! [`InstanceCache::register_instance_prim_index`] and
//! [`InstanceCache::unregister_instance_prim_indexes_under`]; one caller
//! then applies it with [`InstanceCache::apply_changes`] and forwards the
//! returned [`InstanceChanges`] to the subsystems that own master
//! subtrees in their own representations.

mod cache;
mod changes;
mod config;

pub use cache::InstanceCache;
pub use changes::InstanceChanges;
pub use config::{CacheConfig, ENV_DETERMINISTIC_MASTERS};
