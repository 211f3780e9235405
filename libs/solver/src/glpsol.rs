//! Drives a real `glpsol` subprocess. The model fragments this crate is
//! handed always end in a `printf` block (added by the caller, not by this
//! crate) that prints each set decision variable as `x[<idx>] <value>` or
//! `c[<idx>] <value>` — this is the only output format this driver knows
//! how to read back.

use std::collections::HashSet;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::driver::{SolverDriver, SolverOutcome};
use crate::driver::Solution as SolverSolution;
use crate::error::SolverError;

pub struct GlpsolDriver {
    binary: PathBuf,
    timeout: Duration,
    deltmp: AtomicBool,
    dump_glpsol: AtomicBool,
}

impl GlpsolDriver {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        GlpsolDriver {
            binary: binary.into(),
            timeout,
            deltmp: AtomicBool::new(true),
            dump_glpsol: AtomicBool::new(false),
        }
    }

    fn resolve_binary(&self) -> Result<PathBuf, SolverError> {
        let path_like = self.binary.is_absolute() || self.binary.components().count() > 1;
        if path_like {
            if self.binary.is_file() {
                return Ok(self.binary.clone());
            }
            return Err(SolverError::NotFound(self.binary.display().to_string()));
        }
        which(&self.binary).ok_or_else(|| SolverError::NotFound(self.binary.display().to_string()))
    }
}

/// A minimal `PATH` lookup — enough to decide whether a bare binary name
/// like `glpsol` can be found without shelling out to `which(1)`.
pub fn which(binary: &Path) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).map(|dir| dir.join(binary)).find(|candidate| candidate.is_file())
}

impl SolverDriver for GlpsolDriver {
    fn solve(
        &self,
        model_file: &Path,
        data_text: &str,
        tmp_dir: &Path,
        work_id: Uuid,
    ) -> Result<SolverOutcome, SolverError> {
        let binary = self.resolve_binary()?;
        fs::create_dir_all(tmp_dir)?;
        let data_path = tmp_dir.join(format!("{work_id}.data"));
        fs::write(&data_path, data_text)?;

        let mut child = Command::new(&binary)
            .arg("--model")
            .arg(model_file)
            .arg("--data")
            .arg(&data_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let waiter = std::thread::spawn(move || {
            use std::io::Read;
            let mut out = String::new();
            let mut err = String::new();
            if let Some(s) = stdout.as_mut() {
                let _ = s.read_to_string(&mut out);
            }
            if let Some(s) = stderr.as_mut() {
                let _ = s.read_to_string(&mut err);
            }
            (out, err)
        });

        let status = match child.try_wait() {
            Ok(Some(status)) => status,
            _ => {
                let start = std::time::Instant::now();
                loop {
                    match child.try_wait()? {
                        Some(status) => break status,
                        None if start.elapsed() > self.timeout => {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(SolverError::Timeout(self.timeout));
                        }
                        None => std::thread::sleep(Duration::from_millis(20)),
                    }
                }
            }
        };

        let (stdout_text, stderr_text) = waiter.join().unwrap_or_else(|_| (String::new(), String::new()));

        if self.dump_glpsol() {
            let dump_path = tmp_dir.join(format!("{work_id}.glpsol.log"));
            if let Ok(mut f) = fs::File::create(&dump_path) {
                let _ = writeln!(f, "{stdout_text}");
            }
        }

        if !status.success() {
            // Temp files are kept on failure for diagnosis regardless of
            // `deltmp` (spec.md §4.2 "keep on failure unless disabled").
            return Err(SolverError::NonZeroExit {
                status: status.code().unwrap_or(-1),
                stderr: stderr_text,
            });
        }

        let outcome = parse_output(&stdout_text);
        if outcome.is_ok() && self.deltmp() {
            let _ = fs::remove_file(&data_path);
        }
        outcome
    }

    fn set_deltmp(&self, enabled: bool) {
        self.deltmp.store(enabled, Ordering::Relaxed);
    }

    fn deltmp(&self) -> bool {
        self.deltmp.load(Ordering::Relaxed)
    }

    fn set_dump_glpsol(&self, enabled: bool) {
        self.dump_glpsol.store(enabled, Ordering::Relaxed);
    }

    fn dump_glpsol(&self) -> bool {
        self.dump_glpsol.load(Ordering::Relaxed)
    }
}

/// Parse a `glpsol` run's captured stdout into a `SolverOutcome`. Looks for
/// a `Status:` line and, when optimal, `x[<idx>] <value>` / `c[<idx>]
/// <value>` lines for every variable the model's `printf` block emitted.
fn parse_output(stdout: &str) -> Result<SolverOutcome, SolverError> {
    let upper = stdout.to_uppercase();
    if upper.contains("INFEASIBLE") {
        return Ok(SolverOutcome::Infeasible);
    }
    if upper.contains("UNBOUNDED") {
        return Ok(SolverOutcome::Unbounded);
    }
    if !upper.contains("OPTIMAL") {
        return Err(SolverError::UnparsableOutput(stdout.to_string()));
    }

    let mut x = HashSet::new();
    let mut c = HashSet::new();
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("x[") {
            if let Some((idx, value)) = parse_var_line(rest) {
                if value != 0 {
                    x.insert(idx);
                }
            }
        } else if let Some(rest) = line.strip_prefix("c[") {
            if let Some((idx, value)) = parse_var_line(rest) {
                if value != 0 {
                    c.insert(idx);
                }
            }
        }
    }

    Ok(SolverOutcome::Optimal(SolverSolution { x, c }))
}

fn parse_var_line(rest: &str) -> Option<(u32, i64)> {
    let close = rest.find(']')?;
    let idx: u32 = rest[..close].trim().parse().ok()?;
    let value: i64 = rest[close + 1..].trim().parse().ok()?;
    Some((idx, value))
}
