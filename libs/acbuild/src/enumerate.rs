//! Per-component available-connections enumeration (spec.md §4.3): for
//! every candidate (in-port, out-port) pair sharing a channel table, solve
//! the component's enumeration ILP, cut the optimal transitions out, and
//! repeat until infeasible.

use std::path::Path;

use solver::{SolverDriver, SolverOutcome};
use topology::{ChannelTable, Component, Direction, Port, Topology};
use uuid::Uuid;

use crate::error::AcbuildError;
use crate::model::{AvailableConnection, Diagnostics};
use crate::render::{decode_var, render_cut_data, rewrite_model_template};

fn shared_channel_table<'a>(topo: &'a Topology, a: &Port, b: &Port) -> Option<&'a ChannelTable> {
    a.sup_port_channel.iter().find(|id| b.sup_port_channel.contains(id)).and_then(|id| topo.channel_table(id))
}

/// Enumerate every available connection through `component`, returning the
/// connections found in deterministic (in-port, in-channel, out-port,
/// out-channel) order plus counters for logging.
pub fn enumerate_component(
    topo: &Topology,
    component: &Component,
    driver: &dyn SolverDriver,
    tmp_dir: &Path,
) -> Result<(Vec<AvailableConnection>, Diagnostics), AcbuildError> {
    if component.ports.is_empty() {
        return Err(AcbuildError::NoPorts(component.name.clone()));
    }

    let in_ports: Vec<&Port> = component
        .ports
        .iter()
        .map(|&idx| &topo.ports[idx])
        .filter(|p| matches!(p.io, Direction::Input | Direction::Bidi))
        .collect();
    let out_ports: Vec<&Port> = component
        .ports
        .iter()
        .map(|&idx| &topo.ports[idx])
        .filter(|p| matches!(p.io, Direction::Output | Direction::Bidi))
        .collect();

    let mut connections = Vec::new();
    let mut diagnostics = Diagnostics::default();
    let model_file = tmp_dir.join(format!("{}.model", component.name));

    for &in_port in &in_ports {
        for &out_port in &out_ports {
            if in_port.name == out_port.name {
                continue;
            }
            let Some(table) = shared_channel_table(topo, in_port, out_port) else { continue };
            diagnostics.candidate_port_pairs += 1;

            let mut forbidden: Vec<(u32, u32)> = Vec::new();
            loop {
                let data = render_cut_data(in_port, out_port, table, &forbidden);
                let work_id = Uuid::new_v4();
                let outcome = driver.solve(&model_file, &data, tmp_dir, work_id)?;

                match outcome {
                    SolverOutcome::Infeasible => break,
                    SolverOutcome::Unbounded => {
                        return Err(AcbuildError::Unbounded { component: component.name.clone() });
                    }
                    SolverOutcome::Optimal(solution) => {
                        if solution.x.is_empty() {
                            return Err(AcbuildError::EmptyOptimal);
                        }
                        diagnostics.cut_count += 1;
                        let mut vars: Vec<u32> = solution.x.into_iter().collect();
                        vars.sort_unstable();
                        for var in vars {
                            let (in_channel, out_channel) = decode_var(var);
                            connections.push(AvailableConnection {
                                in_port: in_port.name.clone(),
                                in_channel,
                                out_port: out_port.name.clone(),
                                out_channel,
                            });
                            forbidden.push((in_channel, out_channel));
                        }
                    }
                }
            }
        }
    }

    connections.sort_by(|a, b| {
        (&a.in_port, a.in_channel, &a.out_port, a.out_channel).cmp(&(&b.in_port, b.in_channel, &b.out_port, b.out_channel))
    });

    Ok((connections, diagnostics))
}

/// Write a component's enumeration result to `<ac_dir>/<component>.conn.txt`
/// (one `AvailableConnection::to_line()` per line) and its rewritten model
/// fragment to `<ac_dir>/<component>.model`.
pub fn write_component_files(
    component: &Component,
    topo: &Topology,
    connections: &[AvailableConnection],
    ac_dir: &Path,
) -> Result<(), AcbuildError> {
    std::fs::create_dir_all(ac_dir)?;

    let mut lines: Vec<String> = connections.iter().map(AvailableConnection::to_line).collect();
    lines.sort();
    let body = if lines.is_empty() { String::new() } else { format!("{}\n", lines.join("\n")) };
    std::fs::write(ac_dir.join(format!("{}.conn.txt", component.name)), body)?;

    let model_text = rewrite_model_template(component, topo);
    std::fs::write(ac_dir.join(format!("{}.model", component.name)), model_text)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solver::{FakeSolverDriver, Solution as SolverSolution};
    use std::collections::HashSet;

    const TWO_PORT_TOPOLOGY: &str = r#"
    <topology>
      <channelTables><channelTable id="opt" type="optical"><channel no="1"/><channel no="2"/></channelTable></channelTables>
      <components>
        <component ref="A" cost="0">
          <model>m</model>
          <port number="1" name="A_IN" io="input"><supPortChannel ref="opt"/></port>
          <port number="2" name="A_OUT" io="output"><supPortChannel ref="opt"/></port>
        </component>
      </components>
      <portPairs></portPairs>
    </topology>
    "#;

    #[test]
    fn enumerates_until_infeasible_and_decodes_cuts() {
        let (topo, _) = topology::from_xml_str(TWO_PORT_TOPOLOGY).unwrap();
        let component = topo.component("A").unwrap();
        let dir = tempfile::tempdir().unwrap();

        let driver = FakeSolverDriver::new(vec![
            Ok(SolverOutcome::Optimal(SolverSolution { x: HashSet::from([100_001]), c: HashSet::new() })),
            Ok(SolverOutcome::Optimal(SolverSolution { x: HashSet::from([200_002]), c: HashSet::new() })),
            Ok(SolverOutcome::Infeasible),
        ]);

        let (connections, diagnostics) = enumerate_component(&topo, component, &driver, dir.path()).unwrap();

        assert_eq!(diagnostics.candidate_port_pairs, 1);
        assert_eq!(diagnostics.cut_count, 2);
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].in_channel, 1);
        assert_eq!(connections[0].out_channel, 1);
        assert_eq!(connections[1].in_channel, 2);
        assert_eq!(connections[1].out_channel, 2);
        assert_eq!(driver.call_count(), 3);
    }

    #[test]
    fn unbounded_solve_is_an_error() {
        let (topo, _) = topology::from_xml_str(TWO_PORT_TOPOLOGY).unwrap();
        let component = topo.component("A").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let driver = FakeSolverDriver::always(SolverOutcome::Unbounded);

        let result = enumerate_component(&topo, component, &driver, dir.path());
        assert!(matches!(result, Err(AcbuildError::Unbounded { .. })));
    }

    #[test]
    fn component_with_no_ports_is_an_error() {
        let xml = r#"
        <topology>
          <channelTables></channelTables>
          <components><component ref="Lonely" cost="0"><model>m</model></component></components>
          <portPairs></portPairs>
        </topology>
        "#;
        let (topo, _) = topology::from_xml_str(xml).unwrap();
        let component = topo.component("Lonely").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let driver = FakeSolverDriver::always(SolverOutcome::Infeasible);

        let result = enumerate_component(&topo, component, &driver, dir.path());
        assert!(matches!(result, Err(AcbuildError::NoPorts(_))));
    }

    #[test]
    fn write_component_files_sorts_lines_and_writes_rewritten_model() {
        let (topo, _) = topology::from_xml_str(TWO_PORT_TOPOLOGY).unwrap();
        let component = topo.component("A").unwrap();
        let connections = vec![
            AvailableConnection { in_port: "A_1".into(), in_channel: 2, out_port: "A_2".into(), out_channel: 2 },
            AvailableConnection { in_port: "A_1".into(), in_channel: 1, out_port: "A_2".into(), out_channel: 1 },
        ];
        let dir = tempfile::tempdir().unwrap();

        write_component_files(component, &topo, &connections, dir.path()).unwrap();

        let body = std::fs::read_to_string(dir.path().join("A.conn.txt")).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines, vec!["A_1 1 A_2 1", "A_1 2 A_2 2"]);
    }
}
