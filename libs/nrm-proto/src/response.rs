/// A response body, rendered to the wire with a trailing sentinel empty
/// line (: "reads back a text response terminated by a sentinel
/// empty line").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Human-readable route text for a successful `pathfind`/`reserve`.
    Route(String),
    /// All channel trials were exhausted without a feasible solution.
    NoRoute,
    /// A generic success acknowledgement (`terminate`, `writeDB`,
    /// `TERMINATEALL`, `deltmp`, `dumpglpsol`).
    Ack(String),
    /// One line per reservation for `query`.
    QueryResult(Vec<String>),
    Error(String),
}

impl Response {
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        match self {
            Response::Route(text) => {
                out.push_str(text);
                if !text.ends_with('\n') {
                    out.push('\n');
                }
            }
            Response::NoRoute => out.push_str("NO ROUTE\n"),
            Response::Ack(message) => {
                out.push_str(message);
                out.push('\n');
            }
            Response::QueryResult(lines) => {
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            Response::Error(message) => {
                out.push_str("ERROR ");
                out.push_str(message);
                out.push('\n');
            }
        }
        out.push('\n'); // sentinel terminator
        out
    }
}
