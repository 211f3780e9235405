//! Topology XML parsing ("Topology file").
//!
//! The distilled spec doesn't pin down a concrete schema ("we specify only
//! the semantic shape of what is read"); the shape implemented here is:
//!
//! ```xml
//! <topology>
//!   <channelTables>
//!     <channelTable id="opt" type="optical">
//!       <channel no="1"/>
//!       <channel no="2"/>
//!     </channelTable>
//!   </channelTables>
//!   <components>
//!     <component ref="A" cost="1.0">
//!       <model>... GLPK fragment referencing `Channels` ...</model>
//!       <attribute name="Controller" value="true"/>
//!       <attribute name="Socket" value="true"/>
//!       <port number="1" name="A_IN" io="input">
//!         <supPortChannel ref="opt"/>
//!       </port>
//!     </component>
//!   </components>
//!   <portPairs>
//!     <net code="AB1" pair="A-B_1" cost="1.0">
//!       <end port="A_2"/>
//!       <end port="B_1"/>
//!     </net>
//!   </portPairs>
//! </topology>
//! ```
//!
//! Unknown elements/attributes are ignored rather than rejected (:
//! "Warnings ... are surfaced but non-fatal"; only a genuinely missing
//! required attribute is fatal).

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{TopologyError, TopologyWarning};
use crate::model::{Channel, ChannelTable, Component, Direction, Port, PortPair, Topology};

/// Parse a topology document from a file path.
pub fn from_xml_file(path: impl AsRef<std::path::Path>) -> Result<(Topology, Vec<TopologyWarning>), TopologyError> {
    let path_ref = path.as_ref();
    let contents = std::fs::read_to_string(path_ref).map_err(|e| TopologyError::Read {
        path: path_ref.display().to_string(),
        source: e,
    })?;
    from_xml_str(&contents)
}

/// Parse a topology document from an in-memory string.
pub fn from_xml_str(xml: &str) -> Result<(Topology, Vec<TopologyWarning>), TopologyError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    parse_reader(&mut reader)
}

fn attr_map(e: &quick_xml::events::BytesStart) -> Result<HashMap<String, String>, TopologyError> {
    let mut map = HashMap::new();
    for a in e.attributes() {
        let a = a.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
        let val = a.unescape_value()?.to_string();
        map.insert(key, val);
    }
    Ok(map)
}

fn required<'a>(attrs: &'a HashMap<String, String>, element: &str, attr: &str) -> Result<&'a str, TopologyError> {
    attrs
        .get(attr)
        .map(|s| s.as_str())
        .ok_or_else(|| TopologyError::MissingAttribute {
            element: element.to_string(),
            attr: attr.to_string(),
        })
}

struct RawComponent {
    name: String,
    cost: f64,
    model_template: String,
    has_controller: bool,
    has_socket: bool,
    ports: Vec<RawPort>,
}

struct RawPort {
    number: u32,
    display_name: String,
    io_attr: Option<Direction>,
    sup_port_channel: Vec<String>,
}

struct RawNet {
    code: String,
    pair_attr: String,
    cost: f64,
    ends: Vec<String>,
}

fn parse_reader<R: BufRead>(
    reader: &mut Reader<R>,
) -> Result<(Topology, Vec<TopologyWarning>), TopologyError> {
    let mut buf = Vec::new();
    let mut warnings = Vec::new();

    let mut channel_tables: Vec<ChannelTable> = Vec::new();
    let mut raw_components: Vec<RawComponent> = Vec::new();
    let mut raw_nets: Vec<RawNet> = Vec::new();

    // Parser state while inside a <component>...</component> or
    // <channelTable>...</channelTable> or <net>...</net>.
    let mut cur_table: Option<(String, String, Vec<Channel>)> = None; // (id, type, channels)
    let mut cur_component: Option<RawComponent> = None;
    let mut cur_port: Option<RawPort> = None;
    let mut cur_net: Option<RawNet> = None;
    let mut text_buf = String::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let is_empty = matches!(event, Event::Empty(_));
        match event {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let attrs = attr_map(&e)?;
                match name.as_str() {
                    "channelTable" => {
                        let id = required(&attrs, "channelTable", "id")?.to_string();
                        let kind = attrs.get("type").cloned().unwrap_or_else(|| "optical".to_string());
                        cur_table = Some((id, kind, Vec::new()));
                    }
                    "channel" => {
                        let no: u32 = required(&attrs, "channel", "no")?
                            .parse()
                            .map_err(|_| TopologyError::MissingAttribute {
                                element: "channel".into(),
                                attr: "no".into(),
                            })?;
                        if let Some((_, _, chans)) = cur_table.as_mut() {
                            chans.push(Channel { no });
                        }
                    }
                    "component" => {
                        let name = required(&attrs, "component", "ref")?.to_string();
                        let cost: f64 = attrs.get("cost").and_then(|s| s.parse().ok()).unwrap_or(0.0);
                        cur_component = Some(RawComponent {
                            name,
                            cost,
                            model_template: String::new(),
                            has_controller: false,
                            has_socket: false,
                            ports: Vec::new(),
                        });
                    }
                    "attribute" => {
                        if let Some(c) = cur_component.as_mut() {
                            let attr_name = attrs.get("name").map(|s| s.as_str()).unwrap_or("");
                            let attr_val = attrs.get("value").map(|s| s.as_str()).unwrap_or("");
                            let present = matches!(attr_val, "true" | "1" | "yes");
                            match attr_name {
                                "Controller" => c.has_controller = present,
                                "Socket" => c.has_socket = present,
                                _ => {}
                            }
                        }
                    }
                    "port" => {
                        let number: u32 = required(&attrs, "port", "number")?
                            .parse()
                            .map_err(|_| TopologyError::MissingAttribute {
                                element: "port".into(),
                                attr: "number".into(),
                            })?;
                        let display_name = required(&attrs, "port", "name")?.to_string();
                        let io_attr = attrs.get("io").and_then(|s| Direction::from_attr(s));
                        cur_port = Some(RawPort {
                            number,
                            display_name,
                            io_attr,
                            sup_port_channel: Vec::new(),
                        });
                    }
                    "supPortChannel" => {
                        if let Some(p) = cur_port.as_mut() {
                            if let Some(r) = attrs.get("ref") {
                                p.sup_port_channel.push(r.clone());
                            }
                        }
                    }
                    "net" => {
                        let code = attrs.get("code").cloned().unwrap_or_default();
                        let pair_attr = attrs.get("pair").cloned().unwrap_or_default();
                        let cost: f64 = attrs.get("cost").and_then(|s| s.parse().ok()).unwrap_or(0.0);
                        cur_net = Some(RawNet { code, pair_attr, cost, ends: Vec::new() });
                    }
                    "end" => {
                        if let Some(n) = cur_net.as_mut() {
                            if let Some(port) = attrs.get("port") {
                                n.ends.push(port.clone());
                            }
                        }
                    }
                    "model" => {
                        text_buf.clear();
                    }
                    _ => {}
                }

                // Self-closing elements produce no matching `Event::End`;
                // finalize them right away instead of waiting for one.
                if is_empty {
                    match name.as_str() {
                        "port" => {
                            if let Some(p) = cur_port.take() {
                                if let Some(c) = cur_component.as_mut() {
                                    c.ports.push(p);
                                }
                            }
                        }
                        "net" => {
                            if let Some(n) = cur_net.take() {
                                warnings.push(TopologyWarning::MalformedPortPair { code: n.code });
                            }
                        }
                        "channelTable" => {
                            if let Some((id, kind, channels)) = cur_table.take() {
                                if kind == "optical" {
                                    channel_tables.push(ChannelTable { id, channels });
                                } else {
                                    warnings.push(TopologyWarning::NonOpticalChannelTable {
                                        table_id: id,
                                        kind,
                                    });
                                }
                            }
                        }
                        "component" => {
                            if let Some(c) = cur_component.take() {
                                raw_components.push(c);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                text_buf.push_str(&t.unescape()?);
            }
            Event::CData(t) => {
                text_buf.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "channelTable" => {
                        if let Some((id, kind, channels)) = cur_table.take() {
                            if kind == "optical" {
                                channel_tables.push(ChannelTable { id, channels });
                            } else {
                                warnings.push(TopologyWarning::NonOpticalChannelTable {
                                    table_id: id,
                                    kind,
                                });
                            }
                        }
                    }
                    "model" => {
                        if let Some(c) = cur_component.as_mut() {
                            c.model_template = text_buf.trim().to_string();
                        }
                        text_buf.clear();
                    }
                    "port" => {
                        if let Some(p) = cur_port.take() {
                            if let Some(c) = cur_component.as_mut() {
                                c.ports.push(p);
                            }
                        }
                    }
                    "component" => {
                        if let Some(c) = cur_component.take() {
                            raw_components.push(c);
                        }
                    }
                    "net" => {
                        if let Some(n) = cur_net.take() {
                            raw_nets.push(n);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    build_topology(channel_tables, raw_components, raw_nets, warnings)
}

fn build_topology(
    channel_tables: Vec<ChannelTable>,
    raw_components: Vec<RawComponent>,
    raw_nets: Vec<RawNet>,
    mut warnings: Vec<TopologyWarning>,
) -> Result<(Topology, Vec<TopologyWarning>), TopologyError> {
    let mut components = Vec::with_capacity(raw_components.len());
    let mut ports = Vec::new();
    let mut seen_component_names = std::collections::HashSet::new();
    let mut seen_port_names = std::collections::HashSet::new();

    for raw in &raw_components {
        if !seen_component_names.insert(raw.name.clone()) {
            return Err(TopologyError::DuplicateComponent(raw.name.clone()));
        }
    }

    for (comp_idx, raw) in raw_components.into_iter().enumerate() {
        let mut port_indices = Vec::with_capacity(raw.ports.len());
        for rp in raw.ports {
            let name = format!("{}_{}", raw.name, rp.number);
            if !seen_port_names.insert(name.clone()) {
                return Err(TopologyError::DuplicatePort(name));
            }
            let io = rp.io_attr.unwrap_or_else(|| Direction::infer_from_name(&rp.display_name));
            let idx = ports.len();
            ports.push(Port {
                name,
                display_name: rp.display_name,
                io,
                sup_port_channel: rp.sup_port_channel,
                component: comp_idx,
                number: rp.number,
            });
            port_indices.push(idx);
        }

        components.push(Component {
            name: raw.name,
            model_template: raw.model_template,
            intermediate_controller: raw.has_controller && raw.has_socket,
            cost: raw.cost,
            ports: port_indices,
        });
    }

    let port_index: HashMap<String, usize> =
        ports.iter().enumerate().map(|(i, p)| (p.name.clone(), i)).collect();

    let mut port_pairs = Vec::new();
    for net in raw_nets {
        let key = net
            .pair_attr
            .split('-')
            .next()
            .unwrap_or(&net.pair_attr)
            .to_string();

        if net.ends.len() != 2 {
            warnings.push(TopologyWarning::MalformedPortPair { code: net.code });
            continue;
        }
        let a = match port_index.get(&net.ends[0]) {
            Some(&i) => i,
            None => return Err(TopologyError::UndefinedPort(net.ends[0].clone())),
        };
        let b = match port_index.get(&net.ends[1]) {
            Some(&i) => i,
            None => return Err(TopologyError::UndefinedPort(net.ends[1].clone())),
        };
        port_pairs.push(PortPair { key, endpoints: (a, b), cost: net.cost });
    }

    Ok((Topology::from_parts(channel_tables, components, ports, port_pairs), warnings))
}
