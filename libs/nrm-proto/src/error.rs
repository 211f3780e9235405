use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("empty request line")]
    Empty,

    #[error("unknown subcommand `{0}`")]
    UnknownSubcommand(String),

    #[error("unknown flag `{0}`")]
    UnknownFlag(String),

    #[error("missing required flag `{0}`")]
    MissingFlag(&'static str),

    #[error("invalid value for flag: {0}")]
    InvalidValue(String),
}
