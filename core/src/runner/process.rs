use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::LaunchError;

use super::capture::TailBuffer;
use super::exit::normalize_exit;
use super::framework::RunnerSpec;

#[derive(Debug, Clone, Copy)]
pub struct ProcessLimits {
    pub timeout: Duration,
    pub capture_bytes: usize,
    pub drain_grace: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    TimedOut,
    Canceled,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
    /// The stream outgrew `capture_bytes` and only its tail was kept.
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration: Duration,
}

enum Wake {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Canceled,
}

/// Runs `spec` to completion, killing the child on timeout or when `cancel` flips to `true`.
pub async fn run_process(
    spec: &RunnerSpec,
    limits: ProcessLimits,
    cancel: &mut watch::Receiver<bool>,
) -> Result<ProcessOutcome, LaunchError> {
    let started = Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(
        target: "testexec.runner",
        program = %spec.program,
        args = ?spec.args,
        cwd = %spec.cwd.display(),
        "spawning runner"
    );

    let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    let out_buf = Arc::new(Mutex::new(TailBuffer::new(limits.capture_bytes)));
    let err_buf = Arc::new(Mutex::new(TailBuffer::new(limits.capture_bytes)));
    let out_task = child
        .stdout
        .take()
        .map(|s| tokio::spawn(pump(s, out_buf.clone())));
    let err_task = child
        .stderr
        .take()
        .map(|s| tokio::spawn(pump(s, err_buf.clone())));

    let wake = tokio::select! {
        res = child.wait() => Wake::Exited(res),
        _ = tokio::time::sleep(limits.timeout) => Wake::TimedOut,
        _ = canceled(cancel) => Wake::Canceled,
    };

    let termination = match wake {
        Wake::Exited(res) => {
            let status = res.map_err(|source| LaunchError::StreamIo {
                stream: "wait",
                source,
            })?;
            Termination::Exited(normalize_exit(status))
        }
        Wake::TimedOut => {
            kill(&mut child, &spec.program).await;
            Termination::TimedOut
        }
        Wake::Canceled => {
            kill(&mut child, &spec.program).await;
            Termination::Canceled
        }
    };

    // A grandchild may still hold the pipes open; don't wait on it past the grace.
    drain(out_task, "stdout", limits.drain_grace).await;
    drain(err_task, "stderr", limits.drain_grace).await;

    let (stdout, stdout_truncated) = snapshot(&out_buf);
    let (stderr, stderr_truncated) = snapshot(&err_buf);
    Ok(ProcessOutcome {
        termination,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        duration: started.elapsed(),
    })
}

/// Resolves once cancellation is requested; never resolves if the sender is gone.
async fn canceled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn kill(child: &mut tokio::process::Child, program: &str) {
    if let Err(e) = child.kill().await {
        tracing::warn!(
            target: "testexec.runner",
            program = %program,
            error = %e,
            "failed to kill runner process"
        );
    }
}

async fn pump<R>(mut reader: R, sink: Arc<Mutex<TailBuffer>>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(&chunk[..n]);
    }
}

async fn drain(
    task: Option<JoinHandle<std::io::Result<()>>>,
    stream: &'static str,
    grace: Duration,
) {
    let Some(mut task) = task else {
        return;
    };
    match tokio::time::timeout(grace, &mut task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => {
            tracing::debug!(target: "testexec.runner", stream, error = %e, "pipe read failed");
        }
        Ok(Err(e)) => {
            tracing::debug!(target: "testexec.runner", stream, error = %e, "pipe reader panicked");
        }
        Err(_) => {
            task.abort();
            tracing::debug!(target: "testexec.runner", stream, "pipe still open after grace, abandoned");
        }
    }
}

fn snapshot(buf: &Arc<Mutex<TailBuffer>>) -> (String, bool) {
    let buf = buf.lock().unwrap_or_else(PoisonError::into_inner);
    (buf.to_string_lossy(), buf.truncated())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn limits(timeout_ms: u64) -> ProcessLimits {
        ProcessLimits {
            timeout: Duration::from_millis(timeout_ms),
            capture_bytes: 4096,
            drain_grace: Duration::from_millis(200),
        }
    }

    fn sh(script: &str) -> RunnerSpec {
        RunnerSpec::new("sh", std::env::temp_dir())
            .arg("-c")
            .arg(script)
    }

    #[tokio::test]
    async fn captures_exit_code_and_streams() {
        let (_tx, mut rx) = watch::channel(false);
        let out = run_process(&sh("echo out; echo err >&2; exit 3"), limits(5_000), &mut rx)
            .await
            .unwrap();
        assert_eq!(out.termination, Termination::Exited(3));
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
    }

    #[tokio::test]
    async fn flags_truncated_stream() {
        let (_tx, mut rx) = watch::channel(false);
        let out = run_process(
            &sh("head -c 5000 /dev/zero | tr '\\0' x; echo done >&2"),
            limits(5_000),
            &mut rx,
        )
        .await
        .unwrap();
        assert_eq!(out.stdout.len(), 4096);
        assert!(out.stdout_truncated);
        assert!(!out.stderr_truncated);
        assert_eq!(out.stderr, "done\n");
    }

    #[tokio::test]
    async fn passes_environment() {
        let (_tx, mut rx) = watch::channel(false);
        let mut spec = sh("printf %s \"$TESTEXEC_GREETING\"");
        spec.env.push(("TESTEXEC_GREETING".into(), "hello".into()));
        let out = run_process(&spec, limits(5_000), &mut rx).await.unwrap();
        assert_eq!(out.stdout, "hello");
    }

    #[tokio::test]
    async fn times_out_long_process() {
        let (_tx, mut rx) = watch::channel(false);
        let out = run_process(&sh("exec sleep 10"), limits(200), &mut rx)
            .await
            .unwrap();
        assert_eq!(out.termination, Termination::TimedOut);
        assert!(out.duration < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancel_kills_process() {
        let (tx, mut rx) = watch::channel(false);
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
            tx
        });
        let out = run_process(&sh("exec sleep 10"), limits(30_000), &mut rx)
            .await
            .unwrap();
        assert_eq!(out.termination, Termination::Canceled);
        assert!(out.duration < Duration::from_secs(5));
        drop(canceller.await);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let (_tx, mut rx) = watch::channel(false);
        let spec = RunnerSpec::new("testexec-definitely-missing-binary", std::env::temp_dir());
        let err = run_process(&spec, limits(1_000), &mut rx).await.unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }
}
