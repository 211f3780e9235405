//! Compiles a topology plus per-component available connections into the
//! global pathfinding ILP skeleton (spec.md §4.4), and a set of activated
//! components into per-device solvec decomposition skeletons.

use std::collections::{HashMap, HashSet};

use acbuild::AvailableConnection;
use topology::{Direction, Topology};

use crate::error::PathcompilerError;
use crate::skeleton::{DeviceChunk, DeviceSkeleton, GlobalSkeleton};
use crate::vt::{VarKey, Vt};

/// Tie-break weight folded into a transition's cost so that, among equally
/// cheap port-pair routes, the solver prefers lower channel numbers —
/// keeps channel assignment deterministic without a separate objective
/// term (spec.md §4.4 "cost").
const CHANNEL_TIEBREAK_WEIGHT: f64 = 0.0001;

/// A negative `Component.cost` or `PortPair.cost` marks that component or
/// edge administratively out of service — costs are otherwise always
/// non-negative switching penalties, so any negative value is an
/// unambiguous sentinel rather than a real cost.
fn is_out_of_service_cost(cost: f64) -> bool {
    cost < 0.0
}

pub fn compile_global(
    topo: &Topology,
    connections: &HashMap<String, Vec<AvailableConnection>>,
) -> Result<GlobalSkeleton, PathcompilerError> {
    let mut keys: Vec<VarKey> = Vec::new();
    let mut synth_names: HashMap<VarKey, (String, String)> = HashMap::new();
    let mut cost: HashMap<VarKey, f64> = HashMap::new();
    let mut out_of_service_keys: HashSet<VarKey> = HashSet::new();

    for component in &topo.components {
        let Some(acs) = connections.get(&component.name) else { continue };
        for ac in acs {
            let in_port =
                topo.port(&ac.in_port).ok_or_else(|| PathcompilerError::UnknownPort(ac.in_port.clone()))?;
            let out_port =
                topo.port(&ac.out_port).ok_or_else(|| PathcompilerError::UnknownPort(ac.out_port.clone()))?;

            let neighbor_key = match topo.neighbor_component_of(out_port) {
                Some(neighbor) => neighbor.name.clone(),
                None => format!("PORT:{}", out_port.display_name),
            };

            let key: VarKey = (component.name.clone(), ac.in_channel, neighbor_key, ac.out_channel);
            keys.push(key.clone());
            synth_names.insert(key.clone(), (ac.in_port.clone(), ac.out_port.clone()));

            let in_pp_cost = port_pair_cost(topo, &ac.in_port);
            let out_pp_cost = port_pair_cost(topo, &ac.out_port);
            if is_out_of_service_cost(component.cost)
                || is_out_of_service_cost(in_pp_cost)
                || is_out_of_service_cost(out_pp_cost)
            {
                out_of_service_keys.insert(key.clone());
            }

            let entry_cost = component.cost
                + in_pp_cost
                + out_pp_cost
                + CHANNEL_TIEBREAK_WEIGHT * (ac.in_channel as f64 + ac.out_channel as f64);
            cost.insert(key, entry_cost);
        }
    }

    let vt = Vt::build(keys);

    let out_of_service: HashSet<u32> = out_of_service_keys
        .iter()
        .filter_map(|key| {
            let id = vt.get(key);
            (id != 0).then_some(id)
        })
        .collect();

    let mut pair: HashMap<VarKey, u32> = HashMap::new();
    for key in synth_names.keys() {
        if let Some(twin_key) = twin_key(topo, key, &synth_names) {
            let twin_id = vt.get(&twin_key);
            if twin_id != 0 {
                pair.insert(key.clone(), twin_id);
            }
        }
    }

    let mut var_ports: HashMap<u32, (String, String)> = HashMap::new();
    for (key, (in_synth, out_synth)) in &synth_names {
        let id = vt.get(key);
        if id == 0 {
            continue;
        }
        let in_display = topo.port(in_synth).map(|p| p.display_name.clone()).unwrap_or_else(|| in_synth.clone());
        let out_display = topo.port(out_synth).map(|p| p.display_name.clone()).unwrap_or_else(|| out_synth.clone());
        var_ports.insert(id, (in_display, out_display));
    }

    let v: Vec<String> = topo.components.iter().map(|c| c.name.clone()).collect();

    let mut flow_in_ports: HashMap<String, Vec<String>> = HashMap::new();
    let mut flow_out_ports: HashMap<String, Vec<String>> = HashMap::new();
    let mut flow_in_channels: HashMap<String, Vec<u32>> = HashMap::new();
    for component in &topo.components {
        let mut ins = Vec::new();
        let mut outs = Vec::new();
        let mut in_channels: Vec<u32> = Vec::new();
        for &idx in &component.ports {
            let port = &topo.ports[idx];
            if matches!(port.io, Direction::Input | Direction::Bidi) {
                ins.push(port.name.clone());
                for table_id in &port.sup_port_channel {
                    if let Some(table) = topo.channel_table(table_id) {
                        in_channels.extend(table.channels.iter().map(|c| c.no));
                    }
                }
            }
            if matches!(port.io, Direction::Output | Direction::Bidi) {
                outs.push(port.name.clone());
            }
        }
        in_channels.sort_unstable();
        in_channels.dedup();
        flow_in_ports.insert(component.name.clone(), ins);
        flow_out_ports.insert(component.name.clone(), outs);
        flow_in_channels.insert(component.name.clone(), in_channels);
    }

    let mut ijk2ls: HashMap<(String, u32, String), Vec<u32>> = HashMap::new();
    for key in synth_names.keys() {
        let (component, j, k, l) = key;
        ijk2ls.entry((component.clone(), *j, k.clone())).or_default().push(*l);
    }
    for ls in ijk2ls.values_mut() {
        ls.sort_unstable();
        ls.dedup();
    }

    let mut all_channels: Vec<String> = Vec::new();
    let mut ch_no: HashMap<String, u32> = HashMap::new();
    for table in &topo.channel_tables {
        for channel in &table.channels {
            let name = format!("{}_{}", table.id, channel.no);
            ch_no.insert(name.clone(), channel.no);
            all_channels.push(name);
        }
    }
    all_channels.sort();

    Ok(GlobalSkeleton {
        v,
        flow_in_ports,
        flow_out_ports,
        flow_in_channels,
        ijk2ls,
        all_channels,
        ch_no,
        cost,
        pair,
        out_of_service,
        vt,
        var_ports,
    })
}

fn port_pair_cost(topo: &Topology, port_name: &str) -> f64 {
    let Some(idx) = topo.ports.iter().position(|p| p.name == port_name) else { return 0.0 };
    topo.port_pair_for(idx).map(|pp| pp.cost).unwrap_or(0.0)
}

/// The twin of a bidi transition: the variable representing the same pair
/// of physical ports carrying traffic the opposite way, obtained by
/// flipping each port's IN/OUT suffix and swapping the channel roles.
/// `None` unless both the in-port and out-port are genuinely bidirectional.
fn twin_key(topo: &Topology, key: &VarKey, synth_names: &HashMap<VarKey, (String, String)>) -> Option<VarKey> {
    let (component, j, _k, l) = key;
    let (in_synth, out_synth) = synth_names.get(key)?;
    let in_port = topo.port(in_synth)?;
    let out_port = topo.port(out_synth)?;
    if in_port.io != Direction::Bidi || out_port.io != Direction::Bidi {
        return None;
    }

    let twin_in_port = topo.opposite_bidi_port(out_port)?;
    let twin_out_port = topo.opposite_bidi_port(in_port)?;
    let _ = twin_in_port; // the twin transition re-enters this component, it doesn't need a separate lookup

    let twin_neighbor = match topo.neighbor_component_of(twin_out_port) {
        Some(neighbor) => neighbor.name.clone(),
        None => format!("PORT:{}", twin_out_port.display_name),
    };

    Some((component.clone(), *l, twin_neighbor, *j))
}

/// Partition `activated_components` into `num_comps`-sized chunks for each
/// solvec-eligible device among them (`0` means a single chunk holding all
/// of them, i.e. "one chunk per device" in the degenerate case).
pub fn compile_solvec(topo: &Topology, activated_components: &[String], num_comps: usize) -> Vec<DeviceSkeleton> {
    let mut seen = HashSet::new();
    let mut devices = Vec::new();

    let chunk_size = if num_comps == 0 { activated_components.len().max(1) } else { num_comps };

    for name in activated_components {
        if !seen.insert(name.clone()) {
            continue;
        }
        let Some(component) = topo.component(name) else { continue };
        if !component.is_solvec_eligible() {
            continue;
        }

        let model_text = acbuild::rewrite_model_template(component, topo);
        let chunks = activated_components
            .chunks(chunk_size)
            .enumerate()
            .map(|(no, group)| DeviceChunk { chunk_no: no as u32, components: group.to_vec() })
            .collect();

        devices.push(DeviceSkeleton { device: component.name.clone(), model_text, chunks });
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE_TOPOLOGY: &str = r#"
    <topology>
      <channelTables>
        <channelTable id="opt" type="optical"><channel no="1"/><channel no="2"/></channelTable>
      </channelTables>
      <components>
        <component ref="A" cost="1.0">
          <model>m</model>
          <port number="1" name="A_IN" io="input"><supPortChannel ref="opt"/></port>
          <port number="2" name="A_OUT" io="output"><supPortChannel ref="opt"/></port>
        </component>
        <component ref="B" cost="2.0">
          <model>m</model>
          <port number="1" name="B_IN" io="input"><supPortChannel ref="opt"/></port>
          <port number="2" name="B_OUT" io="output"><supPortChannel ref="opt"/></port>
        </component>
      </components>
      <portPairs>
        <net code="AB" pair="A-B_1" cost="0.5"><end port="A_2"/><end port="B_1"/></net>
      </portPairs>
    </topology>
    "#;

    fn sample_connections() -> HashMap<String, Vec<AvailableConnection>> {
        let mut connections = HashMap::new();
        connections.insert(
            "A".to_string(),
            vec![AvailableConnection {
                in_port: "A_1".into(),
                in_channel: 1,
                out_port: "A_2".into(),
                out_channel: 1,
            }],
        );
        connections
    }

    #[test]
    fn compiles_a_var_per_available_connection_with_neighbor_resolved() {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        let skeleton = compile_global(&topo, &sample_connections()).unwrap();

        assert_eq!(skeleton.num_vars(), 1);
        let id = skeleton.vt.get(&("A".to_string(), 1, "B".to_string(), 1));
        assert_eq!(id, 1);
        assert_eq!(skeleton.var_ports.get(&1), Some(&("A_IN".to_string(), "A_OUT".to_string())));
    }

    #[test]
    fn cost_includes_component_and_port_pair_cost() {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        let skeleton = compile_global(&topo, &sample_connections()).unwrap();
        let key = ("A".to_string(), 1, "B".to_string(), 1);
        let cost = *skeleton.cost.get(&key).unwrap();
        assert!((cost - (1.0 + 0.5 + CHANNEL_TIEBREAK_WEIGHT * 2.0)).abs() < 1e-9);
    }

    #[test]
    fn all_channels_are_qualified_and_sorted() {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        let skeleton = compile_global(&topo, &HashMap::new()).unwrap();
        assert_eq!(skeleton.all_channels, vec!["opt_1".to_string(), "opt_2".to_string()]);
    }

    #[test]
    fn unknown_port_in_available_connection_is_an_error() {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        let mut connections = HashMap::new();
        connections.insert(
            "A".to_string(),
            vec![AvailableConnection { in_port: "GHOST".into(), in_channel: 1, out_port: "A_2".into(), out_channel: 1 }],
        );
        let result = compile_global(&topo, &connections);
        assert!(matches!(result, Err(PathcompilerError::UnknownPort(_))));
    }

    #[test]
    fn negative_port_pair_cost_marks_the_crossing_var_out_of_service() {
        let xml = r#"
        <topology>
          <channelTables><channelTable id="opt" type="optical"><channel no="1"/></channelTable></channelTables>
          <components>
            <component ref="A" cost="1.0">
              <model>m</model>
              <port number="1" name="A_IN" io="input"><supPortChannel ref="opt"/></port>
              <port number="2" name="A_OUT" io="output"><supPortChannel ref="opt"/></port>
            </component>
            <component ref="B" cost="2.0">
              <model>m</model>
              <port number="1" name="B_IN" io="input"><supPortChannel ref="opt"/></port>
              <port number="2" name="B_OUT" io="output"><supPortChannel ref="opt"/></port>
            </component>
          </components>
          <portPairs>
            <net code="AB" pair="A-B_1" cost="-1.0"><end port="A_2"/><end port="B_1"/></net>
          </portPairs>
        </topology>
        "#;
        let (topo, _) = topology::from_xml_str(xml).unwrap();
        let skeleton = compile_global(&topo, &sample_connections()).unwrap();
        let id = skeleton.vt.get(&("A".to_string(), 1, "B".to_string(), 1));
        assert!(skeleton.out_of_service.contains(&id));
    }

    #[test]
    fn non_negative_costs_leave_out_of_service_empty() {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        let skeleton = compile_global(&topo, &sample_connections()).unwrap();
        assert!(skeleton.out_of_service.is_empty());
    }

    #[test]
    fn solvec_chunking_defaults_to_one_chunk_per_device() {
        let xml = r#"
        <topology>
          <channelTables><channelTable id="opt" type="optical"><channel no="1"/></channelTable></channelTables>
          <components>
            <component ref="X" cost="0">
              <model>m</model>
              <attribute name="Controller" value="true"/>
              <attribute name="Socket" value="true"/>
              <port number="1" name="X_IN" io="input"><supPortChannel ref="opt"/></port>
              <port number="2" name="X_OUT" io="output"><supPortChannel ref="opt"/></port>
            </component>
          </components>
          <portPairs></portPairs>
        </topology>
        "#;
        let (topo, _) = topology::from_xml_str(xml).unwrap();
        let activated = vec!["X".to_string()];
        let devices = compile_solvec(&topo, &activated, 0);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].chunks.len(), 1);
        assert_eq!(devices[0].chunks[0].components, vec!["X".to_string()]);
    }

    #[test]
    fn non_eligible_components_are_skipped_in_solvec_compilation() {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        let activated = vec!["A".to_string(), "B".to_string()];
        let devices = compile_solvec(&topo, &activated, 0);
        assert!(devices.is_empty());
    }
}
