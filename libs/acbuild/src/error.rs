use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcbuildError {
    #[error("component `{0}` has no ports")]
    NoPorts(String),

    #[error("no shared channel table between `{in_port}` and `{out_port}`")]
    NoSharedChannelTable { in_port: String, out_port: String },

    #[error("per-component ILP for `{component}` was unbounded")]
    Unbounded { component: String },

    #[error("solver returned an optimal status with no set variable to cut")]
    EmptyOptimal,

    #[error(transparent)]
    Solver(#[from] solver::SolverError),

    #[error("I/O error writing available-connections output: {0}")]
    Io(#[from] std::io::Error),
}
