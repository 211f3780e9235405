//! Pathfinder Compiler (spec.md §4.4): compiles a topology plus the
//! Available-Connections Builder's output into the global pathfinding ILP
//! skeleton, and activated components into per-device solvec decomposition
//! skeletons, emitting deterministic `.model`/`.data` files for either.

pub mod compile;
pub mod error;
pub mod render;
pub mod skeleton;
pub mod vt;

pub use compile::{compile_global, compile_solvec};
pub use error::PathcompilerError;
pub use render::{emit_global, emit_solvec, render_device_data, render_device_model, render_global_data, render_global_model};
pub use skeleton::{DeviceChunk, DeviceSkeleton, GlobalSkeleton};
pub use vt::{VarKey, Vt};
