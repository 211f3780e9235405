use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathcompilerError {
    #[error("unknown port `{0}` referenced by an available connection")]
    UnknownPort(String),

    #[error("I/O error writing pathfinder output: {0}")]
    Io(#[from] std::io::Error),
}
