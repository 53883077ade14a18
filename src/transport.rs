//! Pluggable-transport process lifecycle.
//!
//! # How it works
//!
//! 1. We spawn the helper executable (lyrebird / obfs4proxy) with the
//!    managed-transport environment, requesting the meek_lite client
//!    transport
//! 2. The helper prints a `CMETHOD` line on stdout once its local SOCKS
//!    proxy is listening
//! 3. We scan stdout line by line for that handshake and extract the port
//! 4. The returned handle owns the child process; the caller terminates it
//!    once the discovery request is done

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::LaunchError;

/// The client transport requested from the helper. Must be a single,
/// comma-free name.
const CLIENT_TRANSPORT: &str = "meek_lite";

/// Host the helper binds its SOCKS listener to.
const PROXY_HOST: &str = "127.0.0.1";

/// Local SOCKS endpoint announced by the transport helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

/// Handle to a running transport helper process.
///
/// Owned by exactly one discovery call. The process is killed either by
/// [`terminate`](Self::terminate) or, as a backstop, when the handle drops.
#[derive(Debug)]
pub struct TransportHandle {
    child: Option<Child>,
}

impl TransportHandle {
    /// Kill and reap the helper process. Idempotent.
    pub async fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            debug!("Terminating {} helper", CLIENT_TRANSPORT);
            if let Err(e) = child.start_kill() {
                debug!("Transport helper already exited: {}", e);
            }
            let _ = child.wait().await;
        }
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
        }
    }
}

/// Spawns the transport helper and waits for its proxy announcement.
#[derive(Debug, Clone)]
pub struct TransportLauncher {
    executable: PathBuf,
    state_dir: PathBuf,
    handshake_timeout: Duration,
    transport_log: bool,
}

impl TransportLauncher {
    pub fn new(executable: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            state_dir: state_dir.into(),
            handshake_timeout: crate::config::DEFAULT_TIMEOUT,
            transport_log: false,
        }
    }

    /// Bound the wait for the handshake line.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Pass `-enableLogging -logLevel=DEBUG` to the helper.
    pub fn transport_log(mut self, enabled: bool) -> Self {
        self.transport_log = enabled;
        self
    }

    /// Find a transport helper binary in PATH.
    pub fn find_executable(name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }

    /// Spawn the helper and wait for it to announce its SOCKS proxy.
    ///
    /// On failure the child is already terminated; on success the caller
    /// owns the returned handle and must call
    /// [`terminate`](TransportHandle::terminate) when done.
    pub async fn launch(&self) -> Result<(TransportHandle, ProxyEndpoint), LaunchError> {
        if !self.executable.is_file() {
            return Err(LaunchError::InvalidConfig(format!(
                "transport executable not found: {}",
                self.executable.display()
            )));
        }
        if !self.state_dir.is_dir() {
            return Err(LaunchError::InvalidConfig(format!(
                "transport state location is not a directory: {}",
                self.state_dir.display()
            )));
        }

        let mut cmd = Command::new(&self.executable);
        if self.transport_log {
            cmd.args(["-enableLogging", "-logLevel=DEBUG"]);
        }
        cmd.env("TOR_PT_MANAGED_TRANSPORT_VER", "1")
            .env("TOR_PT_STATE_LOCATION", &self.state_dir)
            .env("TOR_PT_EXIT_ON_STDIN_CLOSE", "0")
            .env("TOR_PT_CLIENT_TRANSPORTS", CLIENT_TRANSPORT)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Spawning transport helper: {}", self.executable.display());
        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LaunchError::Io(std::io::Error::other("stdout not captured")))?;

        // Helper stderr goes to the log; only stdout carries the handshake.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("{} stderr: {}", CLIENT_TRANSPORT, line);
                }
            });
        }

        let mut handle = TransportHandle { child: Some(child) };
        let port = match timeout(self.handshake_timeout, scan_for_proxy_port(stdout)).await {
            Ok(Ok(port)) => port,
            Ok(Err(e)) => {
                handle.terminate().await;
                return Err(e);
            }
            Err(_) => {
                handle.terminate().await;
                return Err(LaunchError::Timeout(self.handshake_timeout));
            }
        };

        info!("{} proxy ready on {}:{}", CLIENT_TRANSPORT, PROXY_HOST, port);
        Ok((
            handle,
            ProxyEndpoint {
                host: PROXY_HOST.to_string(),
                port,
            },
        ))
    }
}

/// Scan helper stdout for the proxy announcement.
///
/// Three outcomes: a matching handshake line yields the port, EOF without a
/// match is `HandshakeNotFound`, and a matching line with a non-numeric port
/// is `InvalidHandshake`.
async fn scan_for_proxy_port(stdout: ChildStdout) -> Result<u16, LaunchError> {
    let prefix = format!("CMETHOD {} socks5 {}:", CLIENT_TRANSPORT, PROXY_HOST);
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!("{}: {}", CLIENT_TRANSPORT, line);
                if let Some(port) = line.strip_prefix(&prefix) {
                    return port
                        .trim()
                        .parse()
                        .map_err(|_| LaunchError::InvalidHandshake(line.clone()));
                }
            }
            Ok(None) => return Err(LaunchError::HandshakeNotFound),
            Err(e) => return Err(LaunchError::Io(e)),
        }
    }
}
