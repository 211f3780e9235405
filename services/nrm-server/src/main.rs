//! `nrm-server` — the Reservation Engine's long-running process.
//!
//! Usage:
//!   nrm-server --param glpk/param.json
//!   nrm-server --param glpk/param.json --glpsol /opt/glpk/bin/glpsol -p 4

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use nrm_config::Config;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "nrm-server")]
#[command(about = "Reservation Engine server: accepts the NRM line protocol over TCP")]
#[command(version)]
struct Args {
    /// Path to param.json
    #[arg(long)]
    param: PathBuf,

    /// Load reserved.json at startup (shortIds are re-assigned on load)
    #[arg(long)]
    db: bool,

    /// Worker threads reserved for solvec fan-out
    #[arg(short = 'p', long = "num-threads", default_value_t = num_cpus::get())]
    num_threads: usize,

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

#[tokio::main]
async fn main() -> ExitCode {
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

    let solver_timeout = Duration::from_secs(args.solver_timeout_secs);
    let bootstrap =
        match nrm_server::bootstrap(&config, glpsol_binary, solver_timeout, args.num_threads, args.db).await {
            Ok(bootstrap) => bootstrap,
            Err(err) => {
                error!("failed to assemble the reservation engine: {err}");
                return ExitCode::from(2);
            }
        };

    let db_path = bootstrap.db_path;

    let listener = match tokio::net::TcpListener::bind(&bootstrap.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %bootstrap.bind_addr, "failed to bind: {err}");
            return ExitCode::from(1);
        }
    };

    info!(addr = %bootstrap.bind_addr, "listening");

    tokio::select! {
        result = nrm_server::serve(listener, bootstrap.engine, db_path) => {
            if let Err(err) = result {
                error!("server loop ended with an error: {err}");
                return ExitCode::from(4);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    ExitCode::SUCCESS
}

/// `clap`'s own `Args::parse()` exits with its default usage-error code (2);
/// this service reserves 2 for config/topology load failure, so a bad
/// argv exits 1 instead (`--help`/`--version` still exit 0).
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
