//! Lifecycle of a weather service instance owned by the shell.

use crate::client::connection::Connection;
use crate::client::error::{ClientError, ClientResult};
use crate::config::{ClientConfig, ServerConfig};
use crate::service::WeatherService;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection to whichever kind of service instance is running.
pub type ServiceConnection = Connection<BoxedReader, BoxedWriter>;

enum Runner {
    /// A spawned child process speaking over its stdio.
    Child {
        child: Child,
        stderr_task: JoinHandle<()>,
    },
    /// The service running on a task of this process.
    Embedded(JoinHandle<anyhow::Result<()>>),
}

/// A running weather service and the connection used to talk to it.
pub struct ServiceHandle {
    runner: Runner,
    connection: Option<ServiceConnection>,
}

impl ServiceHandle {
    /// Launch according to config: embedded task or child process.
    pub fn launch(server: &ServerConfig, client: &ClientConfig) -> ClientResult<Self> {
        if server.embedded {
            Ok(Self::embedded(client))
        } else {
            Self::spawn(server, client)
        }
    }

    /// Spawn the service as a child process with piped stdio.
    pub fn spawn(server: &ServerConfig, client: &ClientConfig) -> ClientResult<Self> {
        let program = server.program().map_err(|source| ClientError::Spawn {
            program: "<current executable>".to_string(),
            source,
        })?;

        info!(
            "Starting weather service: {} {}",
            program.display(),
            server.args.join(" ")
        );

        let mut child = Command::new(&program)
            .args(&server.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ClientError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let stderr_task = tokio::spawn(forward_stderr(stderr));
        let connection = Connection::new(
            Box::new(stdout) as BoxedReader,
            Box::new(stdin) as BoxedWriter,
            client.request_timeout(),
        );

        Ok(Self {
            runner: Runner::Child { child, stderr_task },
            connection: Some(connection),
        })
    }

    /// Run the service on an in-process task connected through memory pipes.
    pub fn embedded(client: &ClientConfig) -> Self {
        let (client_end, service_end) = tokio::io::duplex(64 * 1024);
        let (service_read, service_write) = tokio::io::split(service_end);
        let task = tokio::spawn(async move {
            WeatherService::default()
                .serve(service_read, service_write)
                .await
        });

        let (client_read, client_write) = tokio::io::split(client_end);
        let connection = Connection::new(
            Box::new(client_read) as BoxedReader,
            Box::new(client_write) as BoxedWriter,
            client.request_timeout(),
        );

        info!("Started embedded weather service");
        Self {
            runner: Runner::Embedded(task),
            connection: Some(connection),
        }
    }

    /// OS process id, if this is a child process that has not been reaped.
    pub fn pid(&self) -> Option<u32> {
        match &self.runner {
            Runner::Child { child, .. } => child.id(),
            Runner::Embedded(_) => None,
        }
    }

    /// Wait until the service answers a ping.
    pub async fn wait_ready(&mut self, timeout: Duration) -> ClientResult<()> {
        let connection = self.connection()?;
        tokio::time::timeout(timeout, connection.ping())
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
    }

    pub fn connection(&mut self) -> ClientResult<&mut ServiceConnection> {
        self.connection.as_mut().ok_or(ClientError::Closed)
    }

    /// Close the service's input and wait for it to exit, killing it after
    /// `timeout`. Returns the exit status for child processes.
    pub async fn stop(&mut self, timeout: Duration) -> ClientResult<Option<ExitStatus>> {
        // Dropping the writer closes the service's stdin, which ends its read loop.
        self.connection = None;

        match &mut self.runner {
            Runner::Child { child, stderr_task } => {
                let status = match tokio::time::timeout(timeout, child.wait()).await {
                    Ok(status) => status?,
                    Err(_) => {
                        warn!("Weather service did not exit within {:?}, killing it", timeout);
                        child.kill().await?;
                        child.wait().await?
                    }
                };
                stderr_task.abort();
                info!("Weather service exited with {}", status);
                Ok(Some(status))
            }
            Runner::Embedded(task) => {
                match tokio::time::timeout(timeout, &mut *task).await {
                    Ok(Ok(Ok(()))) => {}
                    Ok(Ok(Err(e))) => warn!("Embedded weather service failed: {:#}", e),
                    Ok(Err(e)) => warn!("Embedded weather service panicked: {}", e),
                    Err(_) => {
                        warn!("Embedded weather service did not stop within {:?}", timeout);
                        task.abort();
                    }
                }
                info!("Embedded weather service stopped");
                Ok(None)
            }
        }
    }
}

fn missing_pipe(name: &str) -> ClientError {
    ClientError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("child {} was not captured", name),
    ))
}

/// Relay the service's stderr into our log.
async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(target: "wxmcp::service", "{}", line.trim()),
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading service stderr: {}", e);
                break;
            }
        }
    }
}
