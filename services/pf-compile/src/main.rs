//! `pf-compile` — the Pathfinder Compiler CLI. Reads the topology plus
//! `ac-build`'s available-connections files and emits the global pathfinding
//! ILP skeleton, and, with `--solvec`, per-device decomposition skeletons.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use acbuild::AvailableConnection;
use clap::Parser;
use nrm_config::Config;
use pathcompiler::{compile_global, compile_solvec, emit_global, emit_solvec};
use topology::Topology;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "pf-compile")]
#[command(about = "Compile the global pathfinding ILP skeleton and, optionally, solvec decomposition")]
#[command(version)]
struct Args {
    /// Path to param.json
    #[arg(long)]
    param: PathBuf,

    /// Key used in emitted file names (pf_<key>.model, pf_<key>_<channel>.data)
    #[arg(long, default_value = "global")]
    key: String,

    /// Also emit solvec decomposition for these components (repeatable)
    #[arg(long)]
    solvec: Vec<String>,

    /// solvec chunk size; 0 means one chunk holding every activated component
    #[arg(long, default_value_t = 0)]
    num_comps: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(code) => return code,
    };
    init_logging(&args.log_level);

    let config = match Config::load(&args.param) {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load {}: {err}", args.param.display());
            return ExitCode::from(2);
        }
    };

    let (topo, warnings) = match topology::from_xml_file(&config.topo_xml_path()) {
        Ok(result) => result,
        Err(err) => {
            error!("failed to parse {}: {err}", config.topo_xml_path().display());
            return ExitCode::from(2);
        }
    };
    for warning in &warnings {
        warn!(?warning, "topology warning");
    }

    let connections = match load_available_connections(&topo, &config.ac_dir_path()) {
        Ok(connections) => connections,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(2);
        }
    };

    let skeleton = match compile_global(&topo, &connections) {
        Ok(skeleton) => skeleton,
        Err(err) => {
            error!("failed to compile the global skeleton: {err}");
            return ExitCode::from(4);
        }
    };

    let pf_dir = config.pf_dir_path();
    if let Err(err) = emit_global(&skeleton, &args.key, &pf_dir) {
        error!("failed to emit global skeleton: {err}");
        return ExitCode::from(4);
    }
    info!(vars = skeleton.num_vars(), channels = skeleton.all_channels.len(), "global skeleton emitted");

    if !args.solvec.is_empty() {
        let devices = compile_solvec(&topo, &args.solvec, args.num_comps);
        if let Err(err) = emit_solvec(&devices, &args.key, &pf_dir) {
            error!("failed to emit solvec decomposition: {err}");
            return ExitCode::from(4);
        }
        info!(devices = devices.len(), "solvec decomposition emitted");
    }

    ExitCode::SUCCESS
}

/// `clap`'s own `Args::parse()` exits with its default usage-error code (2);
/// this CLI reserves 2 for config/topology load failure, so a bad argv
/// exits 1 instead (`--help`/`--version` still exit 0).
fn parse_args() -> Result<Args, ExitCode> {
    use clap::error::ErrorKind;
    Args::try_parse().map_err(|err| {
        if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
            print!("{err}");
            ExitCode::SUCCESS
        } else {
            eprint!("{err}");
            ExitCode::from(1)
        }
    })
}

/// Read every topology component's `<name>.conn.txt` written by `ac-build`.
/// A missing file means the component has no available connections.
fn load_available_connections(
    topo: &Topology,
    ac_dir: &Path,
) -> Result<HashMap<String, Vec<AvailableConnection>>, String> {
    let mut connections = HashMap::new();

    for component in &topo.components {
        let path = ac_dir.join(format!("{}.conn.txt", component.name));
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(format!("failed to read {}: {err}", path.display())),
        };

        let mut acs = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let ac = parse_conn_line(line)
                .ok_or_else(|| format!("malformed available-connection line in {}: `{line}`", path.display()))?;
            acs.push(ac);
        }
        connections.insert(component.name.clone(), acs);
    }

    Ok(connections)
}

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

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
