//! `nrm-client` — a bare interactive/one-shot client for the Reservation
//! Engine's line protocol. Readline-style editing and history are out of
//! scope (see `nrm_client::Connection`'s doc comment); this is stdin in,
//! response lines out.

use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;

use clap::Parser;
use nrm_client::Connection;
use nrm_config::Config;

#[derive(Parser, Debug)]
#[command(name = "nrm-client")]
#[command(about = "Line-oriented client for the Reservation Engine")]
#[command(version)]
struct Args {
    /// Path to param.json, used to default --host/--port
    #[arg(long)]
    param: Option<PathBuf>,

    /// Server host, overrides param.json
    #[arg(long)]
    host: Option<String>,

    /// Server port, overrides param.json
    #[arg(long)]
    port: Option<u16>,

    /// Send a single request line and exit instead of reading stdin
    #[arg(short, long)]
    command: Option<String>,

    /// Log level (trace, debug, info, warn, error), overridable via RUST_LOG
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Some(args) => args,
        None => return Ok(()),
    };
    init_logging(&args.log_level);

    let (default_host, default_port) = match &args.param {
        Some(path) => {
            let config = Config::load(path)?;
            (config.params.nrm_host.clone(), config.params.nrm_port)
        }
        None => ("127.0.0.1".to_string(), 6700),
    };
    let host = args.host.unwrap_or(default_host);
    let port = args.port.unwrap_or(default_port);

    let mut conn = Connection::connect(&host, port).await?;

    if let Some(command) = args.command {
        for line in conn.request(&command).await? {
            println!("{line}");
        }
        return Ok(());
    }

    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            print!("> ");
            io::stdout().flush()?;
            continue;
        }
        for response_line in conn.request(&line).await? {
            println!("{response_line}");
        }
        print!("> ");
        io::stdout().flush()?;
    }
    println!();
    Ok(())
}

/// `clap`'s own `Args::parse()` exits with its default usage-error code (2);
/// this CLI reserves 2 for config load failure, so a bad argv exits 1
/// instead. `--help`/`--version` print and exit 0 as usual.
fn parse_args() -> Option<Args> {
    use clap::error::ErrorKind;
    match Args::try_parse() {
        Ok(args) => Some(args),
        Err(err) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                print!("{err}");
            } else {
                eprint!("{err}");
                std::process::exit(1);
            }
            None
        }
    }
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
