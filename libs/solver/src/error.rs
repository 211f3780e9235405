use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("solver binary `{0}` not found on PATH")]
    NotFound(String),

    #[error("solver did not finish within {0:?}")]
    Timeout(Duration),

    #[error("solver exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },

    #[error("could not parse solver output: {0}")]
    UnparsableOutput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
