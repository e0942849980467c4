use super::{
    CacheScope, CoevalOutput, GridParams, LibraryDescription, LightconeOutput, Simulator,
};
use crate::domain::{FixtureError, FixtureResult, LogLevel, ParamMap};
use crate::params::{GlobalParams, ResolvedRunOptions};
use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, info};

const DRIVER_SOURCE: &str = include_str!("bridge_driver.py");
const REPLY_FILE: &str = "reply.json";
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Describe,
    Coeval,
    Lightcone,
}

impl RequestKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Describe => "describe",
            Self::Coeval => "coeval",
            Self::Lightcone => "lightcone",
        }
    }

    const fn failure_placeholder(self) -> &'static str {
        match self {
            Self::Describe => "RUN.SIMULATION_DESCRIBE",
            Self::Coeval => "RUN.SIMULATION_COEVAL",
            Self::Lightcone => "RUN.SIMULATION_LIGHTCONE",
        }
    }
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    kind: &'static str,
    log_level: &'static str,
    output_dir: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_dir: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    global_params: Option<ParamMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_redshift: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoevalReply {
    user_params: GridParams,
}

#[derive(Debug, Deserialize)]
struct LightconeReply {
    user_params: GridParams,
    lightcone_dimensions: [f64; 3],
}

/// Runs the simulation library in a child interpreter, one process per call.
///
/// Requests travel as JSON on stdin; the driver answers with `reply.json`
/// and `.npy` arrays in a scratch directory, so library output on stdout
/// never mixes with the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonBridge {
    interpreter: String,
    log_level: LogLevel,
}

impl PythonBridge {
    pub fn new(interpreter: impl Into<String>, log_level: LogLevel) -> Self {
        Self {
            interpreter: interpreter.into(),
            log_level,
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    fn request<'a>(&self, kind: RequestKind, output_dir: &'a Path) -> BridgeRequest<'a> {
        BridgeRequest {
            kind: kind.as_str(),
            log_level: self.log_level.as_str(),
            output_dir,
            cache_dir: None,
            global_params: None,
            options: None,
            max_redshift: None,
        }
    }

    /// Runs one request to completion. The library's own error text, or the
    /// tail of its stderr, becomes the message of a failed call.
    fn call(&self, kind: RequestKind, request: &BridgeRequest<'_>) -> FixtureResult<()> {
        debug!(
            interpreter = %self.interpreter,
            kind = kind.as_str(),
            "invoking simulation host"
        );
        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(DRIVER_SOURCE)
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                FixtureError::io_system(
                    "IO.SIMULATION_BRIDGE_SPAWN",
                    format!(
                        "failed to start simulation host '{}': {}",
                        self.interpreter, source
                    ),
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(source) = serde_json::to_writer(&mut stdin, request) {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(FixtureError::io_system(
                    "IO.SIMULATION_BRIDGE_REQUEST",
                    format!(
                        "failed to send {} request to simulation host: {}",
                        kind.as_str(),
                        source
                    ),
                ));
            }
        }

        let output = child.wait_with_output().map_err(|source| {
            FixtureError::io_system(
                "IO.SIMULATION_BRIDGE_WAIT",
                format!("failed to wait for simulation host: {}", source),
            )
        })?;
        if output.status.success() {
            return Ok(());
        }

        let status_text = output.status.code().map_or_else(
            || "terminated by signal".to_string(),
            |code| format!("exit code {}", code),
        );
        let detail = failure_detail(request.output_dir, &output.stderr);
        Err(FixtureError::computation(
            kind.failure_placeholder(),
            match detail {
                Some(detail) => format!(
                    "{} simulation failed with {}: {}",
                    kind.as_str(),
                    status_text,
                    detail
                ),
                None => format!("{} simulation failed with {}", kind.as_str(), status_text),
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
struct FailureReply {
    error: String,
    #[serde(default)]
    traceback: Option<String>,
}

/// Prefers the error the driver recorded in its reply, then the last
/// stderr lines of the interpreter.
fn failure_detail(output_dir: &Path, stderr: &[u8]) -> Option<String> {
    let recorded = fs::read_to_string(output_dir.join(REPLY_FILE))
        .ok()
        .and_then(|content| serde_json::from_str::<FailureReply>(&content).ok());
    if let Some(reply) = recorded {
        if let Some(traceback) = &reply.traceback {
            debug!(traceback = %traceback, "simulation host traceback");
        }
        return Some(reply.error);
    }

    let stderr = String::from_utf8_lossy(stderr);
    let lines = stderr
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    if lines.is_empty() {
        return None;
    }
    Some(lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n"))
}

fn read_reply<T: DeserializeOwned>(kind: RequestKind, output_dir: &Path) -> FixtureResult<T> {
    let reply_path = output_dir.join(REPLY_FILE);
    let content = fs::read_to_string(&reply_path).map_err(|source| {
        FixtureError::io_system(
            "IO.SIMULATION_BRIDGE_REPLY",
            format!(
                "failed to read simulation reply '{}': {}",
                reply_path.display(),
                source
            ),
        )
    })?;
    serde_json::from_str(&content).map_err(|source| {
        FixtureError::computation(
            "RUN.SIMULATION_BRIDGE_REPLY",
            format!(
                "failed to parse {} reply '{}': {}",
                kind.as_str(),
                reply_path.display(),
                source
            ),
        )
    })
}

fn collect_coeval(scratch: &Path) -> FixtureResult<CoevalOutput> {
    let reply: CoevalReply = read_reply(RequestKind::Coeval, scratch)?;
    Ok(CoevalOutput {
        user_params: reply.user_params,
        brightness_temp: read_field(scratch, "brightness_temp")?,
    })
}

fn collect_lightcone(scratch: &Path) -> FixtureResult<LightconeOutput> {
    let reply: LightconeReply = read_reply(RequestKind::Lightcone, scratch)?;
    Ok(LightconeOutput {
        user_params: reply.user_params,
        brightness_temp: read_field(scratch, "brightness_temp")?,
        lightcone_dimensions: reply.lightcone_dimensions,
        global_xhi: read_series(scratch, "global_xHI")?,
        global_brightness_temp: read_series(scratch, "global_brightness_temp")?,
    })
}

fn scratch_directory(kind: RequestKind, scope: Option<&CacheScope<'_>>) -> FixtureResult<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(kind.as_str());
    let created = match scope {
        Some(scope) => builder.tempdir_in(scope.directory()),
        None => builder.tempdir(),
    };
    created.map_err(|source| {
        FixtureError::io_system(
            "IO.SIMULATION_SCRATCH",
            format!(
                "failed to create scratch directory for {} request: {}",
                kind.as_str(),
                source
            ),
        )
    })
}

fn read_field(directory: &Path, name: &str) -> FixtureResult<Array3<f64>> {
    let path = directory.join(format!("{name}.npy"));
    ndarray_npy::read_npy(&path).map_err(|source| {
        FixtureError::computation(
            "RUN.SIMULATION_BRIDGE_ARRAY",
            format!("failed to read 3-D array '{}': {}", path.display(), source),
        )
    })
}

fn read_series(directory: &Path, name: &str) -> FixtureResult<Vec<f64>> {
    let path = directory.join(format!("{name}.npy"));
    let series: Array1<f64> = ndarray_npy::read_npy(&path).map_err(|source| {
        FixtureError::computation(
            "RUN.SIMULATION_BRIDGE_ARRAY",
            format!("failed to read 1-D array '{}': {}", path.display(), source),
        )
    })?;
    Ok(series.to_vec())
}

impl Simulator for PythonBridge {
    fn describe(&self) -> FixtureResult<LibraryDescription> {
        let scratch = scratch_directory(RequestKind::Describe, None)?;
        let request = self.request(RequestKind::Describe, scratch.path());
        self.call(RequestKind::Describe, &request)?;
        read_reply(RequestKind::Describe, scratch.path())
    }

    fn run_coeval(
        &self,
        scope: &CacheScope<'_>,
        options: &ResolvedRunOptions,
        globals: &GlobalParams,
    ) -> FixtureResult<CoevalOutput> {
        info!(redshift = options.redshift, "running coeval simulation");
        let scratch = scratch_directory(RequestKind::Coeval, Some(scope))?;
        let mut request = self.request(RequestKind::Coeval, scratch.path());
        request.cache_dir = Some(scope.directory());
        request.global_params = Some(globals.assigned());
        request.options = Some(options.to_kwargs());

        self.call(RequestKind::Coeval, &request)?;
        collect_coeval(scratch.path())
    }

    fn run_lightcone(
        &self,
        scope: &CacheScope<'_>,
        options: &ResolvedRunOptions,
        globals: &GlobalParams,
        max_redshift: f64,
    ) -> FixtureResult<LightconeOutput> {
        info!(
            redshift = options.redshift,
            max_redshift, "running lightcone simulation"
        );
        let scratch = scratch_directory(RequestKind::Lightcone, Some(scope))?;
        let mut request = self.request(RequestKind::Lightcone, scratch.path());
        request.cache_dir = Some(scope.directory());
        request.global_params = Some(globals.assigned());
        request.options = Some(options.to_kwargs());
        request.max_redshift = Some(max_redshift);

        self.call(RequestKind::Lightcone, &request)?;
        collect_lightcone(scratch.path())
    }
}
