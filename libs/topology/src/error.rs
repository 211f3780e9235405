use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("reading topology file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("<{element}> is missing required attribute `{attr}`")]
    MissingAttribute { element: String, attr: String },

    #[error("duplicate component `{0}`")]
    DuplicateComponent(String),

    #[error("duplicate port `{0}`")]
    DuplicatePort(String),

    #[error("port pair references undefined port `{0}`")]
    UndefinedPort(String),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
}

/// Non-fatal conditions noticed while parsing. Surfaced to the caller so a
/// server or CLI can log them, but they never abort the load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyWarning {
    #[error("channel table `{table_id}` has type `{kind}`, not `optical`; dropped")]
    NonOpticalChannelTable { table_id: String, kind: String },

    #[error("port pair `{code}` does not have exactly two ends; dropped")]
    MalformedPortPair { code: String },
}
