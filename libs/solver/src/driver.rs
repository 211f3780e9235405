use std::collections::HashSet;
use std::path::Path;

use uuid::Uuid;

use crate::error::SolverError;

/// A solver's binary assignment. `x` holds the set-to-one pathfinding/
/// enumeration variables; `c` holds the set-to-one concentrator-activation
/// variables for a solvec device's decomposition ILP. Most models only ever
/// populate one of the two — `acbuild`'s per-component enumeration never
/// touches `c`, and a solvec decomposition only ever touches `c`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Solution {
    pub x: HashSet<u32>,
    pub c: HashSet<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverOutcome {
    Optimal(Solution),
    Infeasible,
    Unbounded,
}

/// The contract between a `.model`/`.data` pair and whatever actually runs
/// the ILP. `acbuild` and `pathcompiler` render the text; this trait only
/// knows how to hand it to a solver and parse back which variables got set.
pub trait SolverDriver: Send + Sync {
    fn solve(
        &self,
        model_file: &Path,
        data_text: &str,
        tmp_dir: &Path,
        work_id: Uuid,
    ) -> Result<SolverOutcome, SolverError>;

    fn set_deltmp(&self, enabled: bool);
    fn deltmp(&self) -> bool;
    fn set_dump_glpsol(&self, enabled: bool);
    fn dump_glpsol(&self) -> bool;
}
