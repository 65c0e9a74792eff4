use serde::{Deserialize, Serialize};

/// Environment variable enabling deterministic master assignment.
pub const ENV_DETERMINISTIC_MASTERS: &str = "STRATA_DETERMINISTIC_MASTERS";

/// Tuning knobs for [`InstanceCache`](crate::InstanceCache).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Apply staged additions in ascending order of each key's smallest
    /// prim-index path, so the sequence of master creations (and with it
    /// the numbering of master prims) is identical across runs given the
    /// same inputs. Costs a sort over the staged keys per pass. Off by
    /// default.
    pub deterministic_masters: bool,
}

impl CacheConfig {
    /// Read configuration from the process environment.
    ///
    /// Setting `STRATA_DETERMINISTIC_MASTERS` to `1` or `true` enables
    /// deterministic master assignment.
    pub fn from_env() -> Self {
        Self {
            deterministic_masters: env_flag(ENV_DETERMINISTIC_MASTERS),
        }
    }
}

fn env_flag(var: &str) -> bool {
    matches!(
        std::env::var(var).as_deref().map(str::trim),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}
