use crate::services::devices::{DeviceListing, parse_device_list};
use crate::services::udid::{UdidOutcome, classify_udid};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Arguments for enumerating attached devices
pub const LIST_TARGETS_ARGS: [&str; 2] = ["list", "targets"];

/// Arguments for starting the hdc background server
pub const START_SERVER_ARGS: [&str; 1] = ["start"];

/// Arguments for stopping the hdc background server
pub const KILL_SERVER_ARGS: [&str; 1] = ["kill"];

/// Build the argument vector that reads the UDID of `device`
pub fn udid_query_args(device: &str) -> Vec<&str> {
    vec!["-t", device, "shell", "bm", "get", "-u"]
}

/// Captured output of one hdc invocation
///
/// `stdout` is `None` when the process could not be launched at all; `stderr`
/// then carries a description of the launch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Option<String>,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    fn launch_failure(error: &HdcError) -> Self {
        Self {
            stdout: None,
            stderr: error.to_string(),
            exit_code: None,
        }
    }

    pub fn launched(&self) -> bool {
        self.stdout.is_some()
    }

    pub fn stdout_str(&self) -> Option<&str> {
        self.stdout.as_deref()
    }
}

/// Errors that can occur while launching hdc
#[derive(Error, Debug)]
pub enum HdcError {
    #[error("Failed to prepare hdc executable {path}: {source}")]
    Permissions {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch hdc: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to wait for hdc: {0}")]
    Wait(#[source] std::io::Error),

    #[error("hdc timed out after {0:?}")]
    Timeout(Duration),
}

/// Client for the `hdc` device-bridge executable
///
/// Every call launches a fresh subprocess; the client itself holds no state beyond
/// the resolved paths, so it can be shared freely behind an `Arc`.
#[derive(Debug, Clone)]
pub struct HdcClient {
    exe_path: Utf8PathBuf,
    library_dir: Option<Utf8PathBuf>,
    command_timeout: Option<Duration>,
}

impl HdcClient {
    pub fn new(exe_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            exe_path: exe_path.into(),
            library_dir: None,
            command_timeout: None,
        }
    }

    /// Directory holding the shared library hdc links against (macOS only)
    pub fn with_library_dir(mut self, library_dir: Option<Utf8PathBuf>) -> Self {
        self.library_dir = library_dir;
        self
    }

    /// Optional upper bound on a single invocation. `None` waits forever.
    pub fn with_timeout(mut self, command_timeout: Option<Duration>) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Run hdc with `args` and capture trimmed stdout/stderr.
    ///
    /// Never fails: launch errors come back as `stdout: None` with the error text
    /// in `stderr`.
    pub async fn run(&self, args: &[&str]) -> CommandOutput {
        match self.try_run(args).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("hdc {:?} could not be run: {}", args, e);
                CommandOutput::launch_failure(&e)
            }
        }
    }

    async fn try_run(&self, args: &[&str]) -> Result<CommandOutput, HdcError> {
        ensure_executable(&self.exe_path)?;

        tracing::debug!("Executing: {} {}", self.exe_path, args.join(" "));
        let start = Instant::now();

        let mut cmd = Command::new(self.exe_path.as_std_path());
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        self.configure_platform(&mut cmd);

        let child = cmd.spawn().map_err(HdcError::Spawn)?;

        let output = match self.command_timeout {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| HdcError::Timeout(limit))?,
            None => child.wait_with_output().await,
        }
        .map_err(HdcError::Wait)?;

        let exit_code = output.status.code();
        tracing::info!(
            "hdc {} finished in {:.2}s with exit code {:?}",
            args.first().copied().unwrap_or_default(),
            start.elapsed().as_secs_f32(),
            exit_code
        );

        Ok(CommandOutput {
            stdout: Some(String::from_utf8_lossy(&output.stdout).trim().to_string()),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code,
        })
    }

    #[cfg(target_os = "macos")]
    fn configure_platform(&self, cmd: &mut Command) {
        // hdc ships next to its own libusb build; force it over any system copy
        if let Some(ref dir) = self.library_dir {
            cmd.env("DYLD_LIBRARY_PATH", dir.as_str())
                .env("DYLD_FORCE_FLAT_NAMESPACE", "1");
        }
    }

    #[cfg(windows)]
    fn configure_platform(&self, cmd: &mut Command) {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    #[cfg(not(any(target_os = "macos", windows)))]
    fn configure_platform(&self, _cmd: &mut Command) {}

    /// Enumerate attached devices via `hdc list targets`
    pub async fn list_targets(&self) -> DeviceListing {
        let output = self.run(&LIST_TARGETS_ARGS).await;
        let mut listing = parse_device_list(output.stdout_str());
        if !output.launched() {
            listing.launch_error = Some(output.stderr);
        }
        tracing::info!("hdc reported {} device(s)", listing.len());
        listing
    }

    /// Read and classify the UDID of `device`
    pub async fn query_udid(&self, device: &str) -> UdidOutcome {
        let output = self.run(&udid_query_args(device)).await;
        tracing::debug!(
            "UDID query for {}: stdout={:?}, stderr={:?}",
            device,
            output.stdout,
            output.stderr
        );
        classify_udid(output.stdout_str(), &output.stderr)
    }

    pub async fn start_server(&self) -> CommandOutput {
        self.run(&START_SERVER_ARGS).await
    }

    pub async fn kill_server(&self) -> CommandOutput {
        self.run(&KILL_SERVER_ARGS).await
    }
}

/// Make sure the bridge binary carries the executable bit before launching it
#[cfg(unix)]
fn ensure_executable(path: &Utf8Path) -> Result<(), HdcError> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let to_error = |source| HdcError::Permissions {
        path: path.to_path_buf(),
        source,
    };

    // Owner execute bit; group/other bits do not help the launching user
    let mut permissions = fs::metadata(path).map_err(to_error)?.permissions();
    if permissions.mode() & 0o100 == 0 {
        permissions.set_mode(0o755);
        fs::set_permissions(path, permissions).map_err(to_error)?;
        tracing::debug!("Marked {} as executable", path);
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Utf8Path) -> Result<(), HdcError> {
    Ok(())
}
