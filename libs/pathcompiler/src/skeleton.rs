//! The compiled shapes `compile::compile_global`/`compile::compile_solvec`
//! produce and `render` emits to disk.

use std::collections::HashMap;

use crate::vt::{VarKey, Vt};

/// One partition of a solvec-eligible device's decomposition ("`<no>`
/// partitions components into chunks of `num_comps` size").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceChunk {
    pub chunk_no: u32,
    pub components: Vec<String>,
}

/// A solvec-eligible device's per-device model text plus its chunked data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSkeleton {
    pub device: String,
    pub model_text: String,
    pub chunks: Vec<DeviceChunk>,
}

/// The compiled global pathfinding ILP skeleton (spec.md §4.4): the `vt`
/// variable table plus everything `render::render_global_model`/
/// `render_global_data` need to emit the `.model`/`.data` pair.
#[derive(Debug, Clone, Default)]
pub struct GlobalSkeleton {
    /// Component names, in topology declaration order (`set V`).
    pub v: Vec<String>,
    /// Every component's input/output port names, keyed by component.
    pub flow_in_ports: HashMap<String, Vec<String>>,
    pub flow_out_ports: HashMap<String, Vec<String>>,
    /// The channel numbers an input port accepts, keyed by component.
    pub flow_in_channels: HashMap<String, Vec<u32>>,
    /// `(component, inChan, neighborKey) -> [outChan, ...]`, the feasible
    /// out-channels for a given component/in-channel/neighbor transition.
    pub ijk2ls: HashMap<(String, u32, String), Vec<u32>>,
    /// The full qualified channel universe (`"{tableId}_{no}"`), sorted.
    pub all_channels: Vec<String>,
    /// Qualified channel name -> its bare channel number.
    pub ch_no: HashMap<String, u32>,
    pub cost: HashMap<VarKey, f64>,
    /// `vt[key] -> vt[twin key]`, present only for bidi ports with a twin.
    pub pair: HashMap<VarKey, u32>,
    /// Var ids whose component or crossed port-pair carries a negative
    /// (administratively-out-of-service) cost sentinel. Static per topology,
    /// independent of any one request's ERO exclusions.
    pub out_of_service: std::collections::HashSet<u32>,
    pub vt: Vt,
    /// var-id -> the (in-port, out-port) *display* names, for route
    /// rendering and `NextEroPorts` matching.
    pub var_ports: HashMap<u32, (String, String)>,
}

impl GlobalSkeleton {
    pub fn num_vars(&self) -> u32 {
        self.vt.num_vars()
    }
}
