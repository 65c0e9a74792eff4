use serde::{Deserialize, Serialize};
use strata_path::ScenePath;

/// The master-level effects of one change-application pass.
///
/// The paired sequences run parallel: `new_masters[i]` is populated by
/// computing `new_master_sources[i]`, and likewise for the changed pair.
/// Consumers should process `dead_masters` first (release), then the new
/// pair (create), then the changed pair (reassign sources).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceChanges {
    /// Masters created this pass.
    pub new_masters: Vec<ScenePath>,
    /// The source prim index chosen for each new master.
    pub new_master_sources: Vec<ScenePath>,
    /// Masters whose source prim index was reassigned this pass.
    pub changed_masters: Vec<ScenePath>,
    /// The new source prim index for each changed master.
    pub changed_master_sources: Vec<ScenePath>,
    /// Masters dropped because their last instance was unregistered.
    pub dead_masters: Vec<ScenePath>,
}

impl InstanceChanges {
    /// True when the pass had no master-level effects.
    pub fn is_empty(&self) -> bool {
        self.new_masters.is_empty()
            && self.changed_masters.is_empty()
            && self.dead_masters.is_empty()
    }
}
