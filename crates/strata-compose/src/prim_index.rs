use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use strata_path::ScenePath;

/// The kind of arc connecting a prim to one of its sources of opinions,
/// listed in strength order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ArcKind {
    Local,
    Inherit,
    Variant,
    Relocate,
    Reference,
    Payload,
    Specialize,
}

/// One contribution to a composed prim: an arc of a given kind targeting
/// a prim in some layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositionArc {
    pub kind: ArcKind,
    /// Identifier of the layer the opinions come from.
    pub asset: SmolStr,
    /// The prim targeted inside that layer.
    pub target: ScenePath,
}

impl CompositionArc {
    pub fn new(kind: ArcKind, asset: impl Into<SmolStr>, target: ScenePath) -> Self {
        Self {
            kind,
            asset: asset.into(),
            target,
        }
    }
}

/// The composed description of one scene-graph node: where it lives and
/// the ordered arcs that built it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimIndex {
    path: ScenePath,
    instanceable: bool,
    arcs: Vec<CompositionArc>,
}

impl PrimIndex {
    pub fn new(path: ScenePath, instanceable: bool, arcs: Vec<CompositionArc>) -> Self {
        Self {
            path,
            instanceable,
            arcs,
        }
    }

    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    /// Whether upstream composition marked this subtree eligible for
    /// de-duplication. The instance cache never decides this; it only
    /// honors it.
    pub fn is_instanceable(&self) -> bool {
        self.instanceable
    }

    pub fn arcs(&self) -> &[CompositionArc] {
        &self.arcs
    }
}
