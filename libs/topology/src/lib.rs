pub mod emit;
pub mod error;
pub mod model;
pub mod parse;

pub use error::{TopologyError, TopologyWarning};
pub use model::{Channel, ChannelTable, Component, Direction, Port, PortPair, Topology};
pub use parse::{from_xml_file, from_xml_str};
