use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ReservationError {
    #[error(transparent)]
    Solver(#[from] solver::SolverError),

    #[error(transparent)]
    Pathcompiler(#[from] pathcompiler::PathcompilerError),

    #[error("no reservation with id `{0}`")]
    UnknownReservation(String),

    #[error("decomposition for device `{device}` was infeasible")]
    DecompositionInfeasible { device: String },

    #[error("failed to persist reservation store at {path}: {source}")]
    Persistence { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse durable store at {path}: {source}")]
    StoreFormat { path: PathBuf, #[source] source: serde_json::Error },

    #[error("reservation {0} references a 4-tuple no longer valid under the current topology")]
    ConsistencyViolation(Uuid),

    #[error("no port named `{0}` in the current topology")]
    UnknownPort(String),

    #[error("`{0}` is not a solvec-eligible component in the current topology")]
    UnknownSolvecDevice(String),

    #[error("global solve for {src} -> {dst} was unbounded")]
    UnboundedSolve { src: String, dst: String },
}
