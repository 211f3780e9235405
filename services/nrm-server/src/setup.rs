//! Startup wiring: parse the topology, load the available connections
//! `ac-build` produced, compile the pathfinding skeleton, and assemble the
//! `Engine` the server runs against.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use acbuild::AvailableConnection;
use nrm_config::Config;
use pathcompiler::{compile_global, DeviceSkeleton};
use reservation::{Engine, ReservationRegistry};
use solver::{GlpsolDriver, SolverDriver};
use topology::Topology;
use tracing::{info, warn};

use crate::error::ServerError;

/// Everything `main` needs to start serving: the assembled engine, the
/// durable store path, and the address to bind.
pub struct Bootstrap {
    pub engine: Arc<Engine>,
    pub db_path: PathBuf,
    pub bind_addr: String,
}

pub async fn bootstrap(
    config: &Config,
    glpsol_binary: PathBuf,
    solver_timeout: Duration,
    num_threads: usize,
    load_db: bool,
) -> Result<Bootstrap, ServerError> {
    let (topo, warnings) = topology::from_xml_file(&config.topo_xml_path())?;
    for warning in &warnings {
        warn!(?warning, "topology warning");
    }

    let connections = load_available_connections(&topo, &config.ac_dir_path())?;
    let skeleton = compile_global(&topo, &connections)?;

    let solvec_devices: Vec<DeviceSkeleton> = topo
        .components
        .iter()
        .filter(|c| c.is_solvec_eligible())
        .map(|c| DeviceSkeleton { device: c.name.clone(), model_text: String::new(), chunks: Vec::new() })
        .collect();

    let driver: Arc<dyn SolverDriver> = Arc::new(GlpsolDriver::new(glpsol_binary, solver_timeout));
    let registry = Arc::new(ReservationRegistry::new());

    let db_path = config.reserved_db_path();
    // Load is opt-in (spec.md §3 "loaded from durable store at startup iff
    // the server was launched with the DB option"); the file is otherwise
    // left untouched until an explicit `writeDB`.
    if load_db {
        reservation::store::load(&registry, &db_path, &skeleton).await?;
    }

    let engine = Engine::new(
        Arc::new(topo),
        Arc::new(skeleton),
        solvec_devices,
        driver,
        registry,
        config.pf_tmp_model_path(),
        config.tmp_dir_path(),
        num_threads,
    )?;
    engine.set_num_comps(config.params.num_comps);

    let bind_addr = format!("{}:{}", config.params.nrm_host, config.params.nrm_port);
    info!(%bind_addr, "reservation engine assembled");

    Ok(Bootstrap { engine: Arc::new(engine), db_path, bind_addr })
}

/// Read every topology component's `<name>.conn.txt` written by
/// `ac-build`. A missing file means the component has no available
/// connections, not an error — not every component in a topology needs to
/// have been enumerated (e.g. pure pass-through components).
fn load_available_connections(
    topo: &Topology,
    ac_dir: &Path,
) -> Result<HashMap<String, Vec<AvailableConnection>>, ServerError> {
    let mut connections = HashMap::new();

    for component in &topo.components {
        let path = ac_dir.join(format!("{}.conn.txt", component.name));
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => return Err(ServerError::ConnFile { path, source }),
        };

        let mut acs = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let ac = parse_conn_line(line).ok_or_else(|| ServerError::MalformedConnLine {
                path: path.clone(),
                line: line.to_string(),
            })?;
            acs.push(ac);
        }
        connections.insert(component.name.clone(), acs);
    }

    Ok(connections)
}

/// Parse one `AvailableConnection::to_line()` line back into its parts.
fn parse_conn_line(line: &str) -> Option<AvailableConnection> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [in_port, in_channel, out_port, out_channel] = tokens[..] else { return None };
    Some(AvailableConnection {
        in_port: in_port.to_string(),
        in_channel: in_channel.parse().ok()?,
        out_port: out_port.to_string(),
        out_channel: out_channel.parse().ok()?,
    })
}
