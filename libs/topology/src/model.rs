//! Immutable in-memory model of an optical-network topology document.
//!
//! Once parsed, a `Topology` is never mutated again — a new topology means
//! a new process; reloading a running server's topology out from under it
//! is out of scope. Cross references between components, ports and port
//! pairs are stored as indices into the owning `Topology`'s arenas rather
//! than as pointers or `Rc`, to avoid pointer cycles and to keep the whole
//! model `Clone`.

use std::collections::HashMap;

/// A single wavelength/channel slot inside a channel table, ordered by `no`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub no: u32,
}

/// A named set of channels shared by every port that references it via
/// `supPortChannel`. Only `type="optical"` tables are kept; anything else
/// is dropped with a `TopologyWarning::NonOpticalChannelTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTable {
    pub id: String,
    pub channels: Vec<Channel>,
}

/// A port's signal direction. Ports whose `io` attribute is absent get it
/// inferred from a trailing `IN`/`OUT` substring of the display name;
/// anything else is `Bidi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    Bidi,
}

impl Direction {
    pub fn from_attr(s: &str) -> Option<Direction> {
        match s {
            "input" => Some(Direction::Input),
            "output" => Some(Direction::Output),
            "bidi" => Some(Direction::Bidi),
            _ => None,
        }
    }

    /// Infer direction from a trailing `IN`/`OUT` substring, as the
    /// checked-in topology files do when they omit an explicit `io`
    /// attribute. Anything without either suffix is `Bidi`.
    pub fn infer_from_name(display_name: &str) -> Direction {
        if display_name.ends_with("IN") {
            Direction::Input
        } else if display_name.ends_with("OUT") {
            Direction::Output
        } else {
            Direction::Bidi
        }
    }
}

/// A switching/transit device. `intermediate_controller` is set only when
/// both the `Controller` and `Socket` attributes are present and truthy —
/// such components are solvec-eligible.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    /// The raw GLPK model fragment from `<model>`, before the `Channels`
    /// token gets rewritten per-component.
    pub model_template: String,
    pub intermediate_controller: bool,
    pub cost: f64,
    pub ports: Vec<usize>,
}

impl Component {
    pub fn is_solvec_eligible(&self) -> bool {
        self.intermediate_controller
    }
}

/// A single port on a component. `name` is the synthetic `<component>_<number>`
/// identifier; `display_name` is the name given in the topology file and is
/// what the wire protocol and route rendering show to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: String,
    pub display_name: String,
    pub io: Direction,
    pub sup_port_channel: Vec<String>,
    pub component: usize,
    pub number: u32,
}

/// An inter-component edge linking two ports, with the cost of crossing it.
#[derive(Debug, Clone, PartialEq)]
pub struct PortPair {
    pub key: String,
    pub endpoints: (usize, usize),
    pub cost: f64,
}

/// The immutable, parsed topology. `component_index`/`port_index` are
/// derived lookup tables built once in `from_parts`, redundant with
/// `components`/`ports` by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub channel_tables: Vec<ChannelTable>,
    pub components: Vec<Component>,
    pub ports: Vec<Port>,
    pub port_pairs: Vec<PortPair>,
    component_index: HashMap<String, usize>,
    port_index: HashMap<String, usize>,
}

impl Topology {
    pub fn from_parts(
        channel_tables: Vec<ChannelTable>,
        components: Vec<Component>,
        ports: Vec<Port>,
        port_pairs: Vec<PortPair>,
    ) -> Self {
        let component_index = components.iter().enumerate().map(|(i, c)| (c.name.clone(), i)).collect();
        let port_index = ports.iter().enumerate().map(|(i, p)| (p.name.clone(), i)).collect();
        Topology { channel_tables, components, ports, port_pairs, component_index, port_index }
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.component_index.get(name).map(|&i| &self.components[i])
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.port_index.get(name).map(|&i| &self.ports[i])
    }

    pub fn channel_table(&self, id: &str) -> Option<&ChannelTable> {
        self.channel_tables.iter().find(|t| t.id == id)
    }

    pub fn ports_by_direction(&self, component: &Component, io: Direction) -> Vec<&Port> {
        component.ports.iter().map(|&i| &self.ports[i]).filter(|p| p.io == io).collect()
    }

    /// The port pair whose endpoints include `port_idx`, if any. A network
    /// edge — e.g. a request's final destination port — has none.
    pub fn port_pair_for(&self, port_idx: usize) -> Option<&PortPair> {
        self.port_pairs.iter().find(|pp| pp.endpoints.0 == port_idx || pp.endpoints.1 == port_idx)
    }

    /// The component on the far side of `port`'s port pair, if it has one.
    pub fn neighbor_component_of(&self, port: &Port) -> Option<&Component> {
        let port_idx = *self.port_index.get(&port.name)?;
        let pair = self.port_pair_for(port_idx)?;
        let other = if pair.endpoints.0 == port_idx { pair.endpoints.1 } else { pair.endpoints.0 };
        let other_port = &self.ports[other];
        self.components.get(other_port.component)
    }

    /// Two ports can carry the same channel trial only if they share at
    /// least one `supPortChannel` table reference.
    pub fn ports_share_channel_table(&self, a: &Port, b: &Port) -> bool {
        a.sup_port_channel.iter().any(|t| b.sup_port_channel.contains(t))
    }

    /// The port on the same component whose display name is this port's
    /// base name with the `IN`/`OUT` suffix flipped — e.g. `A_DATA_IN` <->
    /// `A_DATA_OUT`. Used to reverse a bidi request's endpoints when
    /// welding the forward and reverse solves together. A port whose
    /// display name carries neither suffix has no opposite.
    pub fn opposite_bidi_port(&self, port: &Port) -> Option<&Port> {
        let flipped = if port.display_name.ends_with("IN") {
            format!("{}OUT", &port.display_name[..port.display_name.len() - 2])
        } else if port.display_name.ends_with("OUT") {
            format!("{}IN", &port.display_name[..port.display_name.len() - 3])
        } else {
            return None;
        };
        let component = &self.components[port.component];
        component.ports.iter().map(|&i| &self.ports[i]).find(|p| p.display_name == flipped)
    }
}
