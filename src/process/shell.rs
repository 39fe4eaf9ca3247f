/*!
 * Command Streamer
 * Runs a command and forwards its stdout/stderr as ordered chunks
 *
 * Two reader tasks drain the pipes independently. Each reports exactly once
 * on a two-slot completion queue; the first failure kills the child.
 */

use super::environment::HostEnvironment;
use super::types::{OutputOrigin, ResolvedCommand, ShellError, ShellRequest, ShellResult};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// One chunk of child output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub origin: OutputOrigin,
    pub data: Vec<u8>,
}

/// Downstream consumer of output chunks.
///
/// An error from `send` means the consumer is gone; the call is cancelled.
pub trait OutputSink: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send;

    fn send(
        &self,
        chunk: OutputChunk,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
}

impl OutputSink for mpsc::Sender<OutputChunk> {
    type Error = mpsc::error::SendError<OutputChunk>;

    async fn send(&self, chunk: OutputChunk) -> Result<(), Self::Error> {
        mpsc::Sender::send(self, chunk).await
    }
}

/// Apply request defaults against the host
pub fn resolve_command(
    request: &ShellRequest,
    default_shell: &str,
    host: &dyn HostEnvironment,
) -> ShellResult<ResolvedCommand> {
    if request.command.is_empty() {
        return Err(ShellError::EmptyCommand);
    }

    let working_dir = if request.working_dir.is_empty() {
        host.current_dir().map_err(ShellError::WorkingDirectory)?
    } else {
        PathBuf::from(&request.working_dir)
    };

    let env = if request.env.is_empty() {
        host.vars()
    } else {
        request
            .env
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    };

    // Non-empty args: direct exec, no shell involved
    let (program, args) = if request.args.is_empty() {
        let shell = if request.shell.is_empty() {
            default_shell.to_string()
        } else {
            request.shell.clone()
        };
        (shell, vec!["-c".to_string(), request.command.clone()])
    } else {
        (request.command.clone(), request.args.clone())
    };

    Ok(ResolvedCommand {
        program,
        args,
        working_dir,
        env,
    })
}

/// A started child plus its two pipes
pub struct RunningCommand {
    child: Child,
    stdout: tokio::process::ChildStdout,
    stderr: tokio::process::ChildStderr,
    chunk_size: usize,
}

impl RunningCommand {
    /// Drain both pipes into `sink`, then reap the child
    pub async fn stream_to<S: OutputSink>(self, sink: S) -> ShellResult<()> {
        let RunningCommand {
            mut child,
            stdout,
            stderr,
            chunk_size,
        } = self;

        let (done_tx, mut done_rx) = mpsc::channel::<Result<(), String>>(2);
        spawn_reader(stdout, OutputOrigin::Stdout, chunk_size, sink.clone(), done_tx.clone());
        spawn_reader(stderr, OutputOrigin::Stderr, chunk_size, sink, done_tx);

        for _ in 0..2 {
            let outcome = done_rx
                .recv()
                .await
                .unwrap_or_else(|| Err("output reader exited without reporting".to_string()));
            if let Err(e) = outcome {
                warn!(error = %e, pid = ?child.id(), "Output streaming failed, killing command");
                if let Err(kill_err) = child.kill().await {
                    warn!(error = %kill_err, "Failed to kill command");
                }
                return Err(ShellError::Stream(e));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ShellError::CommandFailed(e.to_string()))?;

        if status.success() {
            debug!(status = %status, "Command completed");
            Ok(())
        } else {
            Err(ShellError::CommandFailed(status.to_string()))
        }
    }
}

fn spawn_reader<R, S>(
    mut pipe: R,
    origin: OutputOrigin,
    chunk_size: usize,
    sink: S,
    done: mpsc::Sender<Result<(), String>>,
) where
    R: AsyncRead + Unpin + Send + 'static,
    S: OutputSink,
{
    tokio::spawn(async move {
        let outcome = pump(&mut pipe, origin, chunk_size, &sink).await;
        // Capacity 2 with one message per reader: never blocks
        let _ = done.send(outcome).await;
    });
}

async fn pump<R, S>(pipe: &mut R, origin: OutputOrigin, chunk_size: usize, sink: &S) -> Result<(), String>
where
    R: AsyncRead + Unpin,
    S: OutputSink,
{
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = pipe
            .read(&mut buf)
            .await
            .map_err(|e| format!("{} read: {}", origin.as_str(), e))?;
        if n == 0 {
            return Ok(());
        }
        sink.send(OutputChunk {
            origin,
            data: buf[..n].to_vec(),
        })
        .await
        .map_err(|e| format!("{} send: {}", origin.as_str(), e))?;
    }
}

/// Shell execution with injected host state
#[derive(Clone)]
pub struct CommandStreamer {
    host: Arc<dyn HostEnvironment>,
    default_shell: String,
    chunk_size: usize,
}

impl CommandStreamer {
    pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
        Self {
            host,
            default_shell: DEFAULT_SHELL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_default_shell(mut self, shell: impl Into<String>) -> Self {
        self.default_shell = shell.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Validate, resolve and spawn. Nothing is started if this fails.
    pub fn start(&self, request: &ShellRequest) -> ShellResult<RunningCommand> {
        let resolved = resolve_command(request, &self.default_shell, self.host.as_ref())?;

        let mut cmd = Command::new(&resolved.program);
        cmd.args(&resolved.args)
            .current_dir(&resolved.working_dir)
            .env_clear()
            .envs(resolved.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(ShellError::SpawnFailed)?;
        let stdout = child
            .stdout
            .take()
            .ok_or(ShellError::PipeUnavailable("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(ShellError::PipeUnavailable("stderr"))?;

        info!(
            program = %resolved.program,
            args = resolved.args.len(),
            working_dir = %resolved.working_dir.display(),
            pid = ?child.id(),
            "Started command"
        );

        Ok(RunningCommand {
            child,
            stdout,
            stderr,
            chunk_size: self.chunk_size,
        })
    }

    /// Start and stream in one go
    pub async fn run<S: OutputSink>(&self, request: &ShellRequest, sink: S) -> ShellResult<()> {
        self.start(request)?.stream_to(sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::environment::{FixedEnvironment, SystemEnvironment};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    fn streamer() -> CommandStreamer {
        CommandStreamer::new(Arc::new(SystemEnvironment))
    }

    async fn collect(request: ShellRequest) -> (ShellResult<()>, Vec<OutputChunk>) {
        collect_with(streamer(), request).await
    }

    async fn collect_with(
        streamer: CommandStreamer,
        request: ShellRequest,
    ) -> (ShellResult<()>, Vec<OutputChunk>) {
        let (tx, mut rx) = mpsc::channel(8);
        let drain = tokio::spawn(async move {
            let mut chunks = Vec::new();
            while let Some(chunk) = rx.recv().await {
                chunks.push(chunk);
            }
            chunks
        });
        let result = streamer.run(&request, tx).await;
        (result, drain.await.unwrap())
    }

    fn joined(chunks: &[OutputChunk], origin: OutputOrigin) -> Vec<u8> {
        chunks
            .iter()
            .filter(|c| c.origin == origin)
            .flat_map(|c| c.data.clone())
            .collect()
    }

    #[test]
    fn test_resolve_shell_form() {
        let host = FixedEnvironment::new("/work").with_var("A", "1");
        let resolved = resolve_command(&ShellRequest::new("echo hi"), DEFAULT_SHELL, &host).unwrap();

        assert_eq!(resolved.program, "/bin/sh");
        assert_eq!(resolved.args, vec!["-c", "echo hi"]);
        assert_eq!(resolved.working_dir, PathBuf::from("/work"));
        assert_eq!(resolved.env, vec![(OsString::from("A"), OsString::from("1"))]);
    }

    #[test]
    fn test_resolve_direct_form_ignores_shell() {
        let host = FixedEnvironment::new("/");
        let request = ShellRequest::new("printf")
            .with_args(vec!["%s".into(), "x".into()])
            .with_shell("/bin/bash")
            .with_working_dir("/tmp")
            .with_env(HashMap::from([("B".to_string(), "2".to_string())]));
        let resolved = resolve_command(&request, DEFAULT_SHELL, &host).unwrap();

        assert_eq!(resolved.program, "printf");
        assert_eq!(resolved.args, vec!["%s", "x"]);
        assert_eq!(resolved.working_dir, PathBuf::from("/tmp"));
        assert_eq!(resolved.env, vec![(OsString::from("B"), OsString::from("2"))]);
    }

    #[test]
    fn test_resolve_shell_override() {
        let host = FixedEnvironment::new("/");
        let request = ShellRequest::new("true").with_shell("/bin/bash");
        let resolved = resolve_command(&request, DEFAULT_SHELL, &host).unwrap();
        assert_eq!(resolved.program, "/bin/bash");
    }

    #[test]
    fn test_empty_command_rejected() {
        let host = FixedEnvironment::new("/");
        assert!(matches!(
            resolve_command(&ShellRequest::new(""), DEFAULT_SHELL, &host),
            Err(ShellError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_echo_hi() {
        let (result, chunks) = collect(ShellRequest::new("echo hi")).await;
        assert!(result.is_ok());
        assert_eq!(
            chunks,
            vec![OutputChunk {
                origin: OutputOrigin::Stdout,
                data: b"hi\n".to_vec()
            }]
        );
    }

    #[tokio::test]
    async fn test_streams_are_separated() {
        let (result, chunks) = collect(ShellRequest::new("echo out; echo err >&2; echo more")).await;
        assert!(result.is_ok());
        assert_eq!(joined(&chunks, OutputOrigin::Stdout), b"out\nmore\n".to_vec());
        assert_eq!(joined(&chunks, OutputOrigin::Stderr), b"err\n".to_vec());
    }

    #[tokio::test]
    async fn test_large_output_is_chunked_in_order() {
        let (result, chunks) = collect(ShellRequest::new("seq 1 5000")).await;
        assert!(result.is_ok());
        assert!(chunks.iter().all(|c| c.data.len() <= DEFAULT_CHUNK_SIZE));

        let expected: String = (1..=5000).map(|i| format!("{}\n", i)).collect();
        assert_eq!(joined(&chunks, OutputOrigin::Stdout), expected.into_bytes());
    }

    #[tokio::test]
    async fn test_interleaved_streams_reassemble_per_origin() {
        let script =
            "i=1; while [ $i -le 3000 ]; do echo out$i; echo err$i >&2; i=$((i+1)); done";
        let (result, chunks) = collect(ShellRequest::new(script)).await;
        assert!(result.is_ok());

        let out: String = (1..=3000).map(|i| format!("out{}\n", i)).collect();
        let err: String = (1..=3000).map(|i| format!("err{}\n", i)).collect();
        assert_eq!(joined(&chunks, OutputOrigin::Stdout), out.into_bytes());
        assert_eq!(joined(&chunks, OutputOrigin::Stderr), err.into_bytes());
    }

    #[tokio::test]
    async fn test_inherited_env_keeps_non_utf8_values() {
        let host = FixedEnvironment::new("/")
            .with_var("PATH", "/usr/bin:/bin")
            .with_var("RAW_VALUE", OsStr::from_bytes(b"\xff\xfe"));
        let streamer = CommandStreamer::new(Arc::new(host));
        let request = ShellRequest::new("/usr/bin/env").with_args(vec!["-0".into()]);
        let (result, chunks) = collect_with(streamer, request).await;
        assert!(result.is_ok());

        let stdout = joined(&chunks, OutputOrigin::Stdout);
        let mut entries: Vec<&[u8]> = stdout
            .split(|b| *b == 0)
            .filter(|e| !e.is_empty())
            .collect();
        entries.sort();
        assert_eq!(entries, vec![&b"PATH=/usr/bin:/bin"[..], &b"RAW_VALUE=\xff\xfe"[..]]);
    }

    #[tokio::test]
    async fn test_inherited_env_matches_server_env() {
        let request = ShellRequest::new("/usr/bin/env").with_args(vec!["-0".into()]);
        let (result, chunks) = collect(request).await;
        assert!(result.is_ok());

        let stdout = joined(&chunks, OutputOrigin::Stdout);
        let mut child: Vec<Vec<u8>> = stdout
            .split(|b| *b == 0)
            .filter(|e| !e.is_empty())
            .map(<[u8]>::to_vec)
            .collect();
        let mut server: Vec<Vec<u8>> = std::env::vars_os()
            .map(|(k, v)| {
                let mut entry = k.as_bytes().to_vec();
                entry.push(b'=');
                entry.extend_from_slice(v.as_bytes());
                entry
            })
            .collect();
        child.sort();
        server.sort();
        assert_eq!(child, server);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let (result, chunks) = collect(ShellRequest::new("echo partial; exit 3")).await;
        assert!(matches!(result, Err(ShellError::CommandFailed(_))));
        assert_eq!(joined(&chunks, OutputOrigin::Stdout), b"partial\n".to_vec());
    }

    #[tokio::test]
    async fn test_missing_program_via_shell() {
        let (result, chunks) = collect(ShellRequest::new("nonexistent-binary-xyz")).await;
        assert!(matches!(result, Err(ShellError::CommandFailed(_))));
        assert!(!joined(&chunks, OutputOrigin::Stderr).is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_direct_fails_to_spawn() {
        let request = ShellRequest::new("nonexistent-binary-xyz").with_args(vec!["a".into()]);
        let result = streamer().start(&request);
        assert!(matches!(result, Err(ShellError::SpawnFailed(_))));
    }

    #[tokio::test]
    async fn test_direct_exec_does_not_use_shell() {
        let request = ShellRequest::new("echo").with_args(vec!["$HOME".into()]);
        let (tx, mut rx) = mpsc::channel(8);
        streamer().run(&request, tx).await.unwrap();
        let chunk = rx.recv().await.unwrap();
        assert_eq!(chunk.data, b"$HOME\n".to_vec());
    }

    #[tokio::test]
    async fn test_explicit_env_replaces_inherited() {
        let request = ShellRequest::new("/usr/bin/env")
            .with_env(HashMap::from([("ONLY_VAR".to_string(), "42".to_string())]));
        let (result, chunks) = collect(request).await;
        assert!(result.is_ok());
        let stdout = String::from_utf8(joined(&chunks, OutputOrigin::Stdout)).unwrap();
        assert!(stdout.contains("ONLY_VAR=42"));
        assert!(!stdout.contains("HOME="));
    }

    #[tokio::test]
    async fn test_working_dir_applies() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        let request = ShellRequest::new("pwd -P").with_working_dir(canonical.display().to_string());
        let (result, chunks) = collect(request).await;
        assert!(result.is_ok());
        assert_eq!(
            joined(&chunks, OutputOrigin::Stdout),
            format!("{}\n", canonical.display()).into_bytes()
        );
    }

    #[tokio::test]
    async fn test_dropped_consumer_kills_command() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let started = std::time::Instant::now();
        let result = streamer()
            .run(&ShellRequest::new("echo first; sleep 30"), tx)
            .await;
        assert!(matches!(result, Err(ShellError::Stream(_))));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }
}
