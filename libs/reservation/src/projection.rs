use std::collections::{HashMap, HashSet};

/// The in-use projection derived from the live registry ("In-Use
/// Projection"). `inuse_c` stores the raw reservation count per
/// `(device, c-id)`; the `c_divider` fractional-cost scaling happens inside
/// the rendered ILP data, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InUseProjection {
    pub inuse_x: HashSet<u32>,
    pub inuse_c: HashMap<(String, u32), u32>,
}

impl InUseProjection {
    pub fn is_in_use(&self, var_id: u32) -> bool {
        self.inuse_x.contains(&var_id)
    }

    pub fn c_count(&self, device: &str, c_id: u32) -> u32 {
        self.inuse_c.get(&(device.to_string(), c_id)).copied().unwrap_or(0)
    }

    /// Every `c_id -> count` pair recorded for one device, for overlaying
    /// onto that device's solvec instance data ("`inuse_C` ... divided by
    /// ... `c_divider`").
    pub fn c_counts_for(&self, device: &str) -> HashMap<u32, u32> {
        self.inuse_c
            .iter()
            .filter_map(|((d, c_id), count)| (d == device).then_some((*c_id, *count)))
            .collect()
    }
}
