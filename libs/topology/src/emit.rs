//! Render a `Topology` back to the XML shape `parse` reads ('s
//! "Parse(topology) -> emit -> parse gives an equal model" round-trip law).

use std::fmt::Write as _;

use crate::model::{Direction, Topology};

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn direction_attr(io: Direction) -> &'static str {
    match io {
        Direction::Input => "input",
        Direction::Output => "output",
        Direction::Bidi => "bidi",
    }
}

pub fn to_xml_string(topo: &Topology) -> String {
    let mut out = String::new();
    out.push_str("<topology>\n  <channelTables>\n");
    for table in &topo.channel_tables {
        let _ = writeln!(out, "    <channelTable id=\"{}\" type=\"optical\">", escape(&table.id));
        for channel in &table.channels {
            let _ = writeln!(out, "      <channel no=\"{}\"/>", channel.no);
        }
        out.push_str("    </channelTable>\n");
    }
    out.push_str("  </channelTables>\n  <components>\n");
    for component in &topo.components {
        let _ = writeln!(
            out,
            "    <component ref=\"{}\" cost=\"{}\">",
            escape(&component.name),
            component.cost
        );
        if !component.model_template.is_empty() {
            let _ = writeln!(out, "      <model>{}</model>", escape(&component.model_template));
        }
        if component.intermediate_controller {
            out.push_str("      <attribute name=\"Controller\" value=\"true\"/>\n");
            out.push_str("      <attribute name=\"Socket\" value=\"true\"/>\n");
        }
        for &port_idx in &component.ports {
            let port = &topo.ports[port_idx];
            let _ = writeln!(
                out,
                "      <port number=\"{}\" name=\"{}\" io=\"{}\">",
                port.number,
                escape(&port.display_name),
                direction_attr(port.io)
            );
            for table_ref in &port.sup_port_channel {
                let _ = writeln!(out, "        <supPortChannel ref=\"{}\"/>", escape(table_ref));
            }
            out.push_str("      </port>\n");
        }
        out.push_str("    </component>\n");
    }
    out.push_str("  </components>\n  <portPairs>\n");
    for (i, pair) in topo.port_pairs.iter().enumerate() {
        let a = &topo.ports[pair.endpoints.0];
        let b = &topo.ports[pair.endpoints.1];
        let _ = writeln!(
            out,
            "    <net code=\"pair{}\" pair=\"{}-{}\" cost=\"{}\">",
            i, escape(&pair.key), i, pair.cost
        );
        let _ = writeln!(out, "      <end port=\"{}\"/>", escape(&a.name));
        let _ = writeln!(out, "      <end port=\"{}\"/>", escape(&b.name));
        out.push_str("    </net>\n");
    }
    out.push_str("  </portPairs>\n</topology>\n");
    out
}
