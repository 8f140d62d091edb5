//! Module pipeline backed by an external render worker process.
//!
//! The worker is a user-provided command (usually a small Node.js script)
//! that evaluates generated modules and runs the framework's
//! `renderToString`. It is started through `sh -c` in the project root and
//! speaks newline-delimited JSON on stdin/stdout:
//!
//! ```text
//! -> {"id":0,"op":"render","module":"virtual:page:entry-server:index","source":"..."}
//! <- {"id":0,"html":"<html>...</html>"}
//! -> {"id":1,"op":"transform","url":"/","html":"...","originalUrl":"/"}
//! <- {"id":1,"error":"..."}
//! -> {"id":2,"op":"client","module":"/virtual:page:entry-client:index","source":"..."}
//! <- {"id":2,"code":"..."}
//! -> {"id":3,"op":"close"}
//! ```
//!
//! The `client` reply is a browser-ready script: the worker resolves and
//! compiles the entry's imports, including the page's `.tsx` source.
//!
//! Replies to requests whose caller went away are skipped by the next
//! request. Stdout lines that do not start with `{` are treated as worker
//! log output.
//! Stderr is forwarded to `tracing`. The `VPAGE_MODE` environment variable
//! tells the worker whether it serves the dev server or a build.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use vpage_routes::ModuleId;

use crate::error::PipelineError;
use crate::host::{ModulePipeline, PipelineFactory, ServerModule};
use crate::session::PageSession;

/// Environment variable carrying the [`WorkerMode`].
pub const MODE_ENV: &str = "VPAGE_MODE";

/// What a worker process is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// Live pipeline behind the dev server.
    Dev,
    /// Headless instance used during a build.
    Headless,
}

impl WorkerMode {
    /// Value passed in [`MODE_ENV`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Headless => "headless",
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    #[serde(flatten)]
    op: Op<'a>,
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Op<'a> {
    Render {
        module: &'a str,
        source: &'a str,
    },
    Transform {
        url: &'a str,
        html: &'a str,
        #[serde(rename = "originalUrl")]
        original_url: &'a str,
    },
    Client {
        module: &'a str,
        source: &'a str,
    },
    Close,
}

#[derive(Deserialize)]
struct Reply {
    id: u64,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

struct WorkerIo {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

struct WorkerShared {
    command: String,
    io: Mutex<Option<WorkerIo>>,
    next_id: AtomicU64,
}

fn encode(request: &Request<'_>) -> Result<String, PipelineError> {
    let mut line =
        serde_json::to_string(request).map_err(|e| PipelineError::Protocol(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

impl WorkerShared {
    /// Send one request and wait for its reply.
    ///
    /// The I/O lock is held for the whole exchange, so requests never
    /// interleave. A caller dropped mid-exchange leaves its reply unread;
    /// older ids are skipped here.
    async fn request(&self, op: Op<'_>) -> Result<Reply, PipelineError> {
        let mut guard = self.io.lock().await;
        let io = guard.as_mut().ok_or(PipelineError::Closed)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = encode(&Request { id, op })?;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        loop {
            let Some(line) = io.stdout.next_line().await? else {
                return Err(PipelineError::Protocol(format!(
                    "`{}` exited before replying to request {id}",
                    self.command
                )));
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !line.starts_with('{') {
                tracing::info!(target: "vpage::worker", "{line}");
                continue;
            }

            let reply: Reply = serde_json::from_str(line)
                .map_err(|e| PipelineError::Protocol(format!("invalid reply: {e}")))?;
            if reply.id < id {
                tracing::debug!(command = %self.command, stale = reply.id, expected = id, "Skipping abandoned reply");
                continue;
            }
            if reply.id != id {
                return Err(PipelineError::Protocol(format!(
                    "expected reply {id}, got {}",
                    reply.id
                )));
            }
            if let Some(error) = reply.error {
                return Err(PipelineError::Worker(error));
            }
            return Ok(reply);
        }
    }

    async fn request_html(&self, op: Op<'_>) -> Result<String, PipelineError> {
        let reply = self.request(op).await?;
        reply
            .html
            .ok_or_else(|| PipelineError::Protocol(format!("reply {} has neither html nor error", reply.id)))
    }

    async fn request_code(&self, op: Op<'_>) -> Result<String, PipelineError> {
        let reply = self.request(op).await?;
        reply
            .code
            .ok_or_else(|| PipelineError::Protocol(format!("reply {} has neither code nor error", reply.id)))
    }

    async fn close(&self) -> Result<(), PipelineError> {
        let Some(io) = self.io.lock().await.take() else {
            return Ok(());
        };
        let WorkerIo {
            mut child,
            mut stdin,
            stdout: _,
        } = io;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = encode(&Request { id, op: Op::Close })?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        drop(stdin);

        let status = child.wait().await?;
        if status.success() {
            tracing::debug!(command = %self.command, "Render worker exited");
        } else {
            tracing::warn!(command = %self.command, %status, "Render worker exited with failure");
        }
        Ok(())
    }
}

async fn forward_stderr(stderr: ChildStderr, mode: WorkerMode) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::warn!(target: "vpage::worker", mode = mode.as_str(), "{line}");
    }
}

/// [`ModulePipeline`] driving one render worker process.
///
/// Server entry sources come from the [`PageSession`]; the worker only
/// evaluates them.
pub struct WorkerPipeline {
    session: Arc<PageSession>,
    shared: Arc<WorkerShared>,
}

impl std::fmt::Debug for WorkerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPipeline")
            .field("command", &self.shared.command)
            .finish_non_exhaustive()
    }
}

impl WorkerPipeline {
    /// Start a worker process.
    ///
    /// Must be called inside a tokio runtime. The process is killed if the
    /// pipeline is dropped without [`close`](ModulePipeline::close).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Spawn`] if the command cannot be started.
    pub fn spawn(
        command: &str,
        root_dir: &Path,
        mode: WorkerMode,
        session: Arc<PageSession>,
    ) -> Result<Self, PipelineError> {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd.current_dir(root_dir);
        cmd.env(MODE_ENV, mode.as_str());
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| PipelineError::Spawn {
            command: command.to_owned(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipelineError::Protocol("worker stdin is not piped".to_owned()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Protocol("worker stdout is not piped".to_owned()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr, mode));
        }

        tracing::info!(command, mode = mode.as_str(), "Started render worker");

        Ok(Self {
            session,
            shared: Arc::new(WorkerShared {
                command: command.to_owned(),
                io: Mutex::new(Some(WorkerIo {
                    child,
                    stdin,
                    stdout: BufReader::new(stdout).lines(),
                })),
                next_id: AtomicU64::new(0),
            }),
        })
    }
}

struct WorkerModule {
    shared: Arc<WorkerShared>,
    module: String,
    source: String,
}

#[async_trait]
impl ServerModule for WorkerModule {
    async fn render(&self) -> Result<String, PipelineError> {
        self.shared
            .request_html(Op::Render {
                module: &self.module,
                source: &self.source,
            })
            .await
    }
}

#[async_trait]
impl ModulePipeline for WorkerPipeline {
    async fn load_module(&self, id: &ModuleId) -> Result<Box<dyn ServerModule>, PipelineError> {
        if !matches!(id, ModuleId::ServerEntry(_)) {
            return Err(PipelineError::ModuleNotFound(id.to_string()));
        }
        let source = self
            .session
            .entry_source(id)
            .map_err(|e| PipelineError::Source {
                id: id.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| PipelineError::ModuleNotFound(id.to_string()))?;

        Ok(Box::new(WorkerModule {
            shared: Arc::clone(&self.shared),
            module: id.to_string(),
            source,
        }))
    }

    async fn transform_html(
        &self,
        url: &str,
        html: &str,
        original_url: &str,
    ) -> Result<String, PipelineError> {
        self.shared
            .request_html(Op::Transform {
                url,
                html,
                original_url,
            })
            .await
    }

    async fn transform_client(&self, id: &ModuleId, source: &str) -> Result<String, PipelineError> {
        if !matches!(id, ModuleId::ClientEntry(_)) {
            return Err(PipelineError::ModuleNotFound(id.to_string()));
        }
        self.shared
            .request_code(Op::Client {
                module: &id.to_string(),
                source,
            })
            .await
    }

    async fn close(&self) -> Result<(), PipelineError> {
        self.shared.close().await
    }
}

/// [`PipelineFactory`] starting a fresh headless worker per call.
#[derive(Debug)]
pub struct WorkerFactory {
    command: String,
    root_dir: PathBuf,
    session: Arc<PageSession>,
}

impl WorkerFactory {
    /// Create a factory for `command` run in `root_dir`.
    #[must_use]
    pub fn new(command: impl Into<String>, root_dir: impl Into<PathBuf>, session: Arc<PageSession>) -> Self {
        Self {
            command: command.into(),
            root_dir: root_dir.into(),
            session,
        }
    }
}

#[async_trait]
impl PipelineFactory for WorkerFactory {
    async fn create(&self) -> Result<Arc<dyn ModulePipeline>, PipelineError> {
        let pipeline = WorkerPipeline::spawn(
            &self.command,
            &self.root_dir,
            WorkerMode::Headless,
            Arc::clone(&self.session),
        )?;
        Ok(Arc::new(pipeline))
    }
}
