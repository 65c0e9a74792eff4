use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use strata_compose::{InstanceKey, PrimIndex};
use strata_path::ScenePath;

use crate::changes::InstanceChanges;
use crate::config::CacheConfig;

/// Root-prim name prefix shared by every master path.
const MASTER_PREFIX: &str = "__Master_";

const LOG_TARGET: &str = "strata.instance";

/// De-duplication cache mapping instanceable prim indexes to shared
/// master subtrees.
///
/// All indices and both staging buffers live behind one lock. Writers
/// (registration, unregistration, change application) are mutually
/// exclusive with all readers; queries share the read side. Registration
/// keeps its critical section down to a couple of map operations by
/// requiring the instance key, the expensive part, to be derived before
/// the lock is taken.
#[derive(Debug)]
pub struct InstanceCache {
    config: CacheConfig,
    state: RwLock<CacheState>,
}

/// The interlocking indices.
///
/// `prim_index_to_master` is ordered so unregistration can range-scan a
/// subtree and the nested-instance queries can search for ancestors; the
/// remaining maps are plain hash maps. Values of `master_to_prim_indexes`
/// are kept sorted and duplicate-free. Mutation goes exclusively through
/// the change-application pipeline, which is what keeps the maps mutually
/// consistent.
#[derive(Debug, Default)]
struct CacheState {
    /// Instance key -> master presenting all instances with that key.
    key_to_master: HashMap<InstanceKey, ScenePath>,
    /// Inverse of `key_to_master`.
    master_to_key: HashMap<ScenePath, InstanceKey>,
    /// Registered instance prim index -> its master.
    prim_index_to_master: BTreeMap<ScenePath, ScenePath>,
    /// Inverse of `prim_index_to_master`, grouped per master.
    master_to_prim_indexes: HashMap<ScenePath, Vec<ScenePath>>,
    /// Source prim index -> the master its computation populates.
    source_to_master: HashMap<ScenePath, ScenePath>,
    /// Inverse of `source_to_master`; at most one source per master.
    master_to_source: HashMap<ScenePath, ScenePath>,
    /// Staged registrations, per key, in registration order.
    pending_added: HashMap<InstanceKey, Vec<ScenePath>>,
    /// Staged unregistrations, per key.
    pending_removed: HashMap<InstanceKey, Vec<ScenePath>>,
    /// Monotonic; master numbers are never reused, so dropping a master
    /// leaves a permanent gap in the numbering.
    last_master_index: u64,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Stage the registration of an instanceable prim index.
    ///
    /// Returns `true` iff no master exists for the index's key yet and
    /// this is the first registration staged for that key in the current
    /// pass. A `true` return is a contract: the caller must compute this
    /// prim index fully now, because it will become the source populating
    /// a new master. On `false` the caller may skip or defer the full
    /// computation.
    ///
    /// Registering a prim index that is not instanceable is a caller bug;
    /// it is reported and ignored.
    pub fn register_instance_prim_index(&self, index: &PrimIndex) -> bool {
        if !index.is_instanceable() {
            tracing::error!(
                target: LOG_TARGET,
                path = %index.path(),
                "refusing to register prim index that is not instanceable"
            );
            return false;
        }

        // Deriving the key walks the whole prim index; do it before
        // taking the lock so concurrent registrations hash in parallel.
        let key = InstanceKey::new(index);

        let mut state = self.state.write();
        let master_already_exists = state.key_to_master.contains_key(&key);
        let pending = state.pending_added.entry(key).or_default();
        pending.push(index.path().clone());

        !master_already_exists && pending.len() == 1
    }

    /// Stage the unregistration of every registered instance prim index
    /// at or under `subtree_root`.
    ///
    /// Upstream invalidation arrives as subtree events, so removal is
    /// keyed by subtree rather than by exact path. Paths under the root
    /// that are not registered are skipped silently.
    pub fn unregister_instance_prim_indexes_under(&self, subtree_root: &ScenePath) {
        let mut state = self.state.write();

        let mut staged: Vec<(InstanceKey, ScenePath)> = Vec::new();
        for (path, master) in state.prim_index_to_master.range(subtree_root..) {
            if !path.has_prefix(subtree_root) {
                break;
            }
            let Some(key) = state.master_to_key.get(master) else {
                tracing::error!(
                    target: LOG_TARGET,
                    master = %master,
                    "master is missing from the key map"
                );
                continue;
            };
            staged.push((key.clone(), path.clone()));
        }

        for (key, path) in staged {
            state.pending_removed.entry(key).or_default().push(path);
        }
    }

    /// Apply all staged registrations and unregistrations, returning the
    /// master-level effects.
    ///
    /// Must not overlap with other writers or with queries; the caller
    /// serializes passes externally. Removals apply first, then additions,
    /// and only then are masters left without instances dropped, so a key
    /// whose last instance was removed and that gained another instance in
    /// the same pass keeps its master (with a new source) instead of
    /// seeing it destroyed and recreated under a new number.
    pub fn apply_changes(&self) -> InstanceChanges {
        let mut changes = InstanceChanges::default();
        let mut guard = self.state.write();
        let state = &mut *guard;

        // Taking the buffers is also what empties the staging area for
        // the next pass.
        let mut pending_removed = std::mem::take(&mut state.pending_removed);
        let mut pending_added = std::mem::take(&mut state.pending_added);

        // Removals. A path unregistered and re-registered in the same
        // pass stays an instance of its master: it is elided from the
        // removal set rather than removed and re-added.
        for (key, removed) in &mut pending_removed {
            if let Some(added) = pending_added.get(key) {
                let mut added = added.clone();
                added.sort();
                removed.sort();
                removed.retain(|path| added.binary_search(path).is_err());
            }
            state.remove_instances(key, removed, &mut changes);
        }

        // Additions.
        if self.config.deterministic_masters {
            // Master numbering follows creation order, and creation order
            // would otherwise follow hash-map iteration. Processing keys
            // in ascending order of their smallest staged path fixes it
            // across runs; instance paths are unique, so the minima are
            // unique and the ordering is total.
            let mut keys_to_process: BTreeMap<ScenePath, InstanceKey> = BTreeMap::new();
            for (key, paths) in &pending_added {
                if let Some(min) = paths.iter().min() {
                    keys_to_process.insert(min.clone(), key.clone());
                }
            }
            for key in keys_to_process.into_values() {
                if let Some(paths) = pending_added.remove(&key) {
                    state.create_or_update_master(key, paths, &mut changes);
                }
            }
        } else {
            for (key, paths) in pending_added {
                state.create_or_update_master(key, paths, &mut changes);
            }
        }

        // Only now drop masters left without instances; an addition above
        // may have rescued one.
        for key in pending_removed.keys() {
            state.remove_master_if_no_instances(key, &mut changes);
        }

        changes
    }

    /// True when `path` names a master prim or content beneath one.
    ///
    /// Masters all live under a reserved root-prim name, so this is a
    /// function of the path's shape alone and takes no lock.
    pub fn is_path_master_or_in_master(path: &ScenePath) -> bool {
        match path.root_prim() {
            Some(root_prim) => root_prim.name().starts_with(MASTER_PREFIX),
            None => false,
        }
    }

    /// The master whose contents are computed from the prim index at
    /// `path`, if that prim index is some master's source.
    pub fn master_using_prim_index_at(&self, path: &ScenePath) -> Option<ScenePath> {
        self.state.read().source_to_master.get(path).cloned()
    }

    /// The master that the registered instance prim index at `path`
    /// belongs to.
    pub fn master_for_prim_index_at(&self, path: &ScenePath) -> Option<ScenePath> {
        self.state.read().prim_index_to_master.get(path).cloned()
    }

    /// True when `path` lies strictly below a registered instance, i.e.
    /// it describes content that only masters present in the scene.
    pub fn is_prim_in_master_for_prim_index_at(&self, path: &ScenePath) -> bool {
        let state = self.state.read();
        find_entry_for_ancestor(&state.prim_index_to_master, path).is_some()
    }

    /// Paths of every live master, in unspecified order.
    pub fn all_masters(&self) -> Vec<ScenePath> {
        self.state.read().key_to_master.values().cloned().collect()
    }

    pub fn num_masters(&self) -> usize {
        self.state.read().master_to_key.len()
    }

    /// The registered instance prim indexes of `master`, sorted
    /// ascending. Empty when `master` is not a live master.
    pub fn prim_indexes_for_master(&self, master: &ScenePath) -> Vec<ScenePath> {
        self.state
            .read()
            .master_to_prim_indexes
            .get(master)
            .cloned()
            .unwrap_or_default()
    }

    /// The source prim index whose computation populates `master`.
    pub fn source_prim_index_for_master(&self, master: &ScenePath) -> Option<ScenePath> {
        self.state.read().master_to_source.get(master).cloned()
    }

    /// True when the prim index at `path` provides content visible inside
    /// at least one master.
    pub fn is_prim_in_master_using_prim_index_at(&self, path: &ScenePath) -> bool {
        self.state.read().prims_in_masters_using(path, None)
    }

    /// Master-space paths of every prim whose content comes from the prim
    /// index at `path`.
    ///
    /// Under nested instancing one computed prim index can be seen by
    /// several masters, one per level of nesting, so this may return more
    /// than one path.
    pub fn prims_in_masters_using_prim_index_at(&self, path: &ScenePath) -> Vec<ScenePath> {
        let mut master_paths = Vec::new();
        self.state
            .read()
            .prims_in_masters_using(path, Some(&mut master_paths));
        master_paths
    }

    /// The master-space path that stands in for the prim index at `path`,
    /// or `None` when no master presents it.
    ///
    /// Only source prim indexes are ever computed. A path under a
    /// non-source instance therefore has no computed prim index of its
    /// own; it is rebased onto the source of each enclosing instance
    /// until it lands under a known source, and only then prefix-replaced
    /// into master space. Consider:
    ///
    /// ```text
    /// /World
    ///   Set_1       [instance of /__Master_1]
    ///   Set_2       [instance of /__Master_1]
    /// /__Master_1   [source index /World/Set_1]
    ///   Prop_1      [instance of /__Master_2]
    ///   Prop_2      [instance of /__Master_2]
    /// /__Master_2   [source index /World/Set_1/Prop_1]
    ///   Scope
    /// ```
    ///
    /// For `/World/Set_2/Prop_1/Scope` a single prefix replacement would
    /// answer `/__Master_1/Prop_1/Scope`; the right answer is
    /// `/__Master_2/Scope`, reached by first rebasing onto
    /// `/World/Set_1/Prop_1/Scope`.
    pub fn prim_in_master_for_prim_index_at(&self, path: &ScenePath) -> Option<ScenePath> {
        let state = self.state.read();

        let mut cur = path.clone();
        loop {
            let (instance_path, master) =
                find_entry_for_ancestor(&state.prim_index_to_master, &cur)?;
            let Some(source) = state.master_to_source.get(master) else {
                tracing::error!(
                    target: LOG_TARGET,
                    master = %master,
                    "master has no source prim index"
                );
                return None;
            };
            if instance_path == source {
                return cur.replace_prefix(instance_path, master);
            }
            // Each rebase lands strictly closer to a computed source, so
            // the loop terminates.
            cur = cur.replace_prefix(instance_path, source)?;
        }
    }
}

impl Default for InstanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheState {
    fn remove_instances(
        &mut self,
        key: &InstanceKey,
        paths: &[ScenePath],
        changes: &mut InstanceChanges,
    ) {
        let Some(master) = self.key_to_master.get(key).cloned() else {
            // The key was never applied, or its master is already gone.
            return;
        };

        let mut needs_new_source = false;
        let instances = self.master_to_prim_indexes.entry(master.clone()).or_default();
        for path in paths {
            if let Ok(pos) = instances.binary_search(path) {
                instances.remove(pos);
                self.prim_index_to_master.remove(path);
            }
            if self.source_to_master.remove(path).is_some() {
                if self.master_to_source.remove(&master).is_none() {
                    tracing::error!(
                        target: LOG_TARGET,
                        master = %master,
                        "source maps out of sync for master"
                    );
                }
                needs_new_source = true;
            }
        }

        // The unregistered source is replaced by the smallest remaining
        // instance. If none remains the master is left source-less for
        // now: an addition later in the pass may rescue it, and the drop
        // otherwise happens at the end of the pass.
        if needs_new_source && !instances.is_empty() {
            let source = instances[0].clone();
            tracing::debug!(
                target: LOG_TARGET,
                master = %master,
                source = %source,
                "assigning new source prim index"
            );
            self.source_to_master.insert(source.clone(), master.clone());
            self.master_to_source.insert(master.clone(), source.clone());
            changes.changed_masters.push(master);
            changes.changed_master_sources.push(source);
        }
    }

    fn create_or_update_master(
        &mut self,
        key: InstanceKey,
        mut paths: Vec<ScenePath>,
        changes: &mut InstanceChanges,
    ) {
        let Some(first) = paths.first().cloned() else {
            return;
        };

        let master = match self.key_to_master.get(&key).cloned() {
            None => {
                let master = self.next_master_path();
                tracing::debug!(
                    target: LOG_TARGET,
                    master = %master,
                    source = %first,
                    "creating master"
                );
                self.key_to_master.insert(key.clone(), master.clone());
                self.master_to_key.insert(master.clone(), key);
                // The first staged prim index was promised a full
                // computation when its registration returned true, so it
                // becomes the new master's source.
                self.source_to_master.insert(first.clone(), master.clone());
                self.master_to_source.insert(master.clone(), first.clone());
                changes.new_masters.push(master.clone());
                changes.new_master_sources.push(first);
                master
            }
            Some(master) => {
                // The master may have lost its source during removal
                // processing and survived to this addition: the last
                // instance of the key was unregistered and a different
                // instance registered in the same pass.
                if !self.master_to_source.contains_key(&master) {
                    tracing::debug!(
                        target: LOG_TARGET,
                        master = %master,
                        source = %first,
                        "assigning new source prim index"
                    );
                    self.source_to_master.insert(first.clone(), master.clone());
                    self.master_to_source.insert(master.clone(), first.clone());
                    changes.changed_masters.push(master.clone());
                    changes.changed_master_sources.push(first);
                }
                master
            }
        };

        // Re-adding an already-registered path overwrites its entry with
        // the same master, which is harmless.
        for path in &paths {
            self.prim_index_to_master.insert(path.clone(), master.clone());
        }

        paths.sort();
        paths.dedup();
        let instances = self.master_to_prim_indexes.entry(master).or_default();
        if instances.is_empty() {
            *instances = paths;
        } else {
            instances.append(&mut paths);
            instances.sort();
            instances.dedup();
        }
    }

    fn remove_master_if_no_instances(
        &mut self,
        key: &InstanceKey,
        changes: &mut InstanceChanges,
    ) {
        let Some(master) = self.key_to_master.get(key).cloned() else {
            return;
        };
        let Some(instances) = self.master_to_prim_indexes.get(&master) else {
            tracing::error!(
                target: LOG_TARGET,
                master = %master,
                "master is missing its instance list"
            );
            return;
        };
        if !instances.is_empty() {
            return;
        }

        // Source map entries were already cleared when the last instance
        // was removed.
        tracing::debug!(target: LOG_TARGET, master = %master, "removing master with no instances");
        self.key_to_master.remove(key);
        self.master_to_key.remove(&master);
        self.master_to_prim_indexes.remove(&master);
        changes.dead_masters.push(master);
    }

    fn next_master_path(&mut self) -> ScenePath {
        self.last_master_index += 1;
        let name = format!("{MASTER_PREFIX}{}", self.last_master_index);
        ScenePath::absolute_root()
            .append_child(&name)
            .expect("master names are valid path components")
    }

    /// Decides whether any master presents the content of the prim index
    /// at `prim_index_path`, appending the master-space path for each one
    /// that does when `collect` is given (otherwise the walk stops at the
    /// first hit).
    ///
    /// Nested instancing is what makes this subtle. Consider:
    ///
    /// ```text
    /// /World
    ///   Set_1       [instance of /__Master_1]
    /// /__Master_1   [source index /World/Set_1]
    ///   Prop_1      [instance of /__Master_2]
    ///   Prop_2      [instance of /__Master_2]
    /// /__Master_2   [source index /World/Set_1/Prop_1]
    ///   Scope
    /// ```
    ///
    /// `/World/Set_1/Prop_1/Scope` is presented by `/__Master_2/Scope`,
    /// but `/World/Set_1/Prop_2/Scope` is presented by nothing: Prop_2
    /// shares `/__Master_2`, whose contents come from Prop_1's subtree,
    /// so Prop_2's descendants are never computed. A lookup based on
    /// source prim indexes alone would report both as used.
    fn prims_in_masters_using(
        &self,
        prim_index_path: &ScenePath,
        mut collect: Option<&mut Vec<ScenePath>>,
    ) -> bool {
        let mut used = false;

        let mut cur = prim_index_path.clone();
        while !cur.is_absolute_root() {
            // Nearest instance at or above the current path. Without one
            // the path is not a descendant of an instance, and no master
            // can see it.
            let Some((instance_path, master)) =
                find_entry_for_path_or_ancestor(&self.prim_index_to_master, &cur)
            else {
                break;
            };
            let Some(source) = self.master_to_source.get(master) else {
                tracing::error!(
                    target: LOG_TARGET,
                    master = %master,
                    "master has no source prim index"
                );
                break;
            };

            // Inside the source subtree means the master's contents
            // include this prim index.
            if cur.has_prefix(source) {
                used = true;
                match collect.as_deref_mut() {
                    Some(out) => {
                        if let Some(in_master) = prim_index_path.replace_prefix(source, master) {
                            out.push(in_master);
                        }
                    }
                    None => break,
                }
            }

            // A strict descendant of an instance can be seen by exactly
            // one master. The instance root itself may be nested inside
            // another instance, so keep searching from its parent.
            if instance_path != &cur {
                break;
            }
            match instance_path.parent() {
                Some(parent) => cur = parent,
                None => break,
            }
        }

        used
    }
}

/// The entry of `map` whose key is `path` or the nearest ancestor of
/// `path` present in the map.
///
/// The greatest key not beyond the current path is the only candidate
/// that can be its prefix at that level; when it is not, the search
/// re-anchors at the parent, which skips past unrelated subtrees that
/// sort in between.
fn find_entry_for_path_or_ancestor<'a>(
    map: &'a BTreeMap<ScenePath, ScenePath>,
    path: &ScenePath,
) -> Option<(&'a ScenePath, &'a ScenePath)> {
    let mut cur = path.clone();
    while !cur.is_absolute_root() {
        match map.range(..=&cur).next_back() {
            Some((candidate, value)) if cur.has_prefix(candidate) => {
                return Some((candidate, value));
            }
            // No key sorts at or below the current path, so no key can be
            // an ancestor of it either.
            None => return None,
            Some(_) => {}
        }
        cur = cur.parent()?;
    }
    None
}

/// The entry of `map` for the nearest strict ancestor of `path`.
fn find_entry_for_ancestor<'a>(
    map: &'a BTreeMap<ScenePath, ScenePath>,
    path: &ScenePath,
) -> Option<(&'a ScenePath, &'a ScenePath)> {
    find_entry_for_path_or_ancestor(map, &path.parent()?)
}
