use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Topology(#[from] topology::TopologyError),

    #[error(transparent)]
    Pathcompiler(#[from] pathcompiler::PathcompilerError),

    #[error(transparent)]
    Reservation(#[from] reservation::ReservationError),

    #[error("failed to read available-connections file {path}: {source}")]
    ConnFile { path: PathBuf, #[source] source: std::io::Error },

    #[error("malformed available-connection line in {path}: `{line}`")]
    MalformedConnLine { path: PathBuf, line: String },
}
