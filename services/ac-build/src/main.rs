//! `ac-build` — the Available-Connections Builder CLI. For every component
//! in the topology, enumerates its feasible (in-port, in-channel) ->
//! (out-port, out-channel) transitions and writes `<ac_dir>/<name>.conn.txt`
//! plus `<ac_dir>/<name>.model`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use acbuild::{enumerate_component, rewrite_model_template, write_component_files};
use clap::Parser;
use nrm_config::Config;
use solver::GlpsolDriver;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ac-build")]
#[command(about = "Enumerate per-component available connections")]
#[command(version)]
struct Args {
    /// Path to param.json
    #[arg(long)]
    param: PathBuf,

    /// Path or bare name of the `glpsol` binary
    #[arg(long, default_value = "glpsol")]
    glpsol: String,

    /// Per-solve timeout, in seconds
    #[arg(long, default_value_t = 30)]
    solver_timeout_secs: u64,

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

    let glpsol_binary = PathBuf::from(&args.glpsol);
    if !glpsol_is_reachable(&glpsol_binary) {
        error!(glpsol = %args.glpsol, "glpsol binary not found on PATH or at the given path");
        return ExitCode::from(3);
    }

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
        tracing::warn!(?warning, "topology warning");
    }

    let driver = GlpsolDriver::new(glpsol_binary, Duration::from_secs(args.solver_timeout_secs));
    let tmp_dir = config.tmp_dir_path();
    let ac_dir = config.ac_dir_path();

    for component in &topo.components {
        let model_text = rewrite_model_template(component, &topo);
        if let Err(err) = std::fs::create_dir_all(&tmp_dir) {
            error!(dir = %tmp_dir.display(), "failed to create tmp dir: {err}");
            return ExitCode::from(4);
        }
        if let Err(err) = std::fs::write(tmp_dir.join(format!("{}.model", component.name)), &model_text) {
            error!(component = %component.name, "failed to stage model file: {err}");
            return ExitCode::from(4);
        }

        match enumerate_component(&topo, component, &driver, &tmp_dir) {
            Ok((connections, diagnostics)) => {
                info!(
                    component = %component.name,
                    candidates = diagnostics.candidate_port_pairs,
                    cuts = diagnostics.cut_count,
                    found = connections.len(),
                    "enumerated"
                );
                if let Err(err) = write_component_files(component, &topo, &connections, &ac_dir) {
                    error!(component = %component.name, "failed to write output files: {err}");
                    return ExitCode::from(4);
                }
            }
            Err(err) => {
                error!(component = %component.name, "enumeration failed: {err}");
                return ExitCode::from(4);
            }
        }
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

fn glpsol_is_reachable(binary: &std::path::Path) -> bool {
    let path_like = binary.is_absolute() || binary.components().count() > 1;
    if path_like {
        binary.is_file()
    } else {
        solver::glpsol::which(binary).is_some()
    }
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
