//! Byte-stream transports.
//!
//! A transport is anything that splits into an `AsyncRead` half and an
//! `AsyncWrite` half; the peer's IO tasks apply the newline framing (one
//! JSON object per line) on top. Connection setup happens in the concrete
//! constructors, e.g. [`ChildProcessTransport::spawn`].

use std::collections::HashMap;
use std::ffi::OsString;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::ReadHalf;
use tokio::io::WriteHalf;
use tokio::io::{self};
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;

pub trait Transport: Send + 'static {
    type Reader: AsyncRead + Send + Unpin + 'static;
    type Writer: AsyncWrite + Send + Unpin + 'static;

    fn into_split(self) -> (Self::Reader, Self::Writer);
}

/// This process's stdin/stdout, the server side of a stdio session.
pub struct StdioTransport;

impl Transport for StdioTransport {
    type Reader = io::Stdin;
    type Writer = io::Stdout;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        (io::stdin(), io::stdout())
    }
}

/// Any duplex byte stream, split down the middle. Tests drive peers over
/// `tokio::io::duplex` through this.
pub struct IoTransport<S>(pub S);

impl<S> Transport for IoTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    type Reader = ReadHalf<S>;
    type Writer = WriteHalf<S>;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        io::split(self.0)
    }
}

impl<R, W> Transport for (R, W)
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    type Reader = R;
    type Writer = W;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        self
    }
}

/// A subprocess speaking MCP over its piped stdio, the client side of a
/// stdio session.
pub struct ChildProcessTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

impl ChildProcessTransport {
    /// Spawn the given command with piped stdio. The child's environment is
    /// narrowed to an inherited allowlist plus the caller's extras.
    pub fn spawn(
        program: OsString,
        args: Vec<OsString>,
        env: Option<HashMap<String, String>>,
    ) -> std::io::Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .env_clear()
            .envs(create_env_for_child(env))
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            // As noted in the `kill_on_drop` documentation, the Tokio runtime
            // makes a "best effort" to reap-after-exit to avoid zombie
            // processes, but it is not a guarantee.
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture child stdout"))?;

        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }
}

impl Transport for ChildProcessTransport {
    type Reader = ChildStdout;
    type Writer = ChildWriter;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        let Self {
            child,
            stdin,
            stdout,
        } = self;
        (stdout, ChildWriter { stdin, child })
    }
}

/// Write half of a [`ChildProcessTransport`]. Owns the child so the process
/// lives exactly as long as the peer's writer task; dropping it closes the
/// child's stdin and kills the process.
pub struct ChildWriter {
    stdin: ChildStdin,
    child: Child,
}

impl AsyncWrite for ChildWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stdin).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdin).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdin).poll_shutdown(cx)
    }
}

impl Drop for ChildWriter {
    fn drop(&mut self) {
        // `kill_on_drop(true)` already covers the child; the extra check
        // reaps an already-exited process immediately instead of waiting
        // for the runtime to do it later.
        let _ = self.child.try_wait();
    }
}

/// Environment variables always forwarded to a spawned server.
///
/// https://modelcontextprotocol.io/docs/tools/debugging#environment-variables
/// states that MCP servers inherit only a subset of environment variables
/// automatically, like `USER`, `HOME`, and `PATH`; this list mirrors what
/// mainstream hosts pass along.
#[rustfmt::skip]
#[cfg(unix)]
const DEFAULT_ENV_VARS: &[&str] = &[
    "HOME",
    "LANG",
    "LC_ALL",
    "LOGNAME",
    "PATH",
    "SHELL",
    "TERM",
    "TMPDIR",
    "TZ",
    "USER",
];

#[cfg(windows)]
const DEFAULT_ENV_VARS: &[&str] = &[
    "PATH",
    "PATHEXT",
    "USERNAME",
    "USERDOMAIN",
    "USERPROFILE",
    "TEMP",
    "TMP",
];

fn create_env_for_child(
    extra_env: Option<HashMap<String, String>>,
) -> HashMap<String, String> {
    DEFAULT_ENV_VARS
        .iter()
        .filter_map(|var| match std::env::var(var) {
            Ok(value) => Some((var.to_string(), value)),
            Err(_) => None,
        })
        .chain(extra_env.unwrap_or_default())
        .collect::<HashMap<_, _>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_env_overrides_inherited_values() {
        let var = "PATH";
        let replacement = "/overridden".to_string();
        let extra = HashMap::from([(var.to_string(), replacement.clone())]);
        let env = create_env_for_child(Some(extra));
        assert_eq!(env.get(var), Some(&replacement));
    }

    #[test]
    fn unlisted_variables_are_not_inherited() {
        // SAFETY: test-local variable, no other thread reads it.
        unsafe { std::env::set_var("MCP_RUNTIME_TEST_SECRET", "1") };
        let env = create_env_for_child(None);
        assert!(!env.contains_key("MCP_RUNTIME_TEST_SECRET"));
    }
}
