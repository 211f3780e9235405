//! Available-Connections Builder (spec.md §4.3): for every component,
//! enumerate every feasible (in-port, in-channel) -> (out-port, out-channel)
//! transition by repeatedly solving a small per-component ILP and cutting
//! the optimal solution out until the model goes infeasible.

pub mod enumerate;
pub mod error;
pub mod model;
pub mod render;

pub use enumerate::{enumerate_component, write_component_files};
pub use error::AcbuildError;
pub use model::{AvailableConnection, Diagnostics};
pub use render::{decode_var, encode_var, render_cut_data, rewrite_model_template, CHANNEL_ENCODING_BASE};
