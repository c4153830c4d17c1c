//! Child process supervision with line-streamed output.
//!
//! A [`StreamedCommand`] launches one child, relays its stdout and stderr
//! as a single merged line stream into a [`LineSink`], then reports the
//! exit status as one final line through the same sink. Nothing here
//! panics or returns an error: every failure becomes a console line.

use std::io;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedSender};

/// Prefix applied to every line that originates from the child process.
pub const OUTPUT_PREFIX: &str = "[yt-dlp]";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Destination for relayed output lines. Implemented for closures so tests
/// can capture lines into a `Vec` without a process or a UI.
pub trait LineSink: Send {
    fn accept(&mut self, line: String);
}

impl<F> LineSink for F
where
    F: FnMut(String) + Send,
{
    fn accept(&mut self, line: String) {
        self(line);
    }
}

/// One invocation of an external binary with streamed output.
pub struct StreamedCommand {
    /// Full argument vector; the first element is the program.
    pub argv: Vec<String>,
    /// Lines containing this substring are dropped from the stream. This is
    /// a plain substring match and can suppress unrelated lines; the
    /// imprecision is long-standing observed behavior and kept as-is.
    pub suppress: Option<&'static str>,
    /// Terminal line emitted after a zero exit.
    pub success_line: &'static str,
}

impl StreamedCommand {
    /// Runs the child to completion, forwarding each output line to `sink`
    /// in production order, then exactly one terminal status line. The only
    /// exception is a missing executable, which emits a single not-found
    /// line and nothing else. Returns the exit code when the child ran.
    pub async fn run(&self, sink: &mut dyn LineSink) -> Option<i32> {
        let Some((program, args)) = self.argv.split_first() else {
            sink.accept("An unexpected error occurred: empty command".to_string());
            return None;
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        tracing::debug!(argv = ?self.argv, "spawning child process");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                sink.accept(format!("Error: Executable not found at {program}"));
                return None;
            }
            Err(e) => {
                sink.accept(format!("An unexpected error occurred: {e}"));
                return None;
            }
        };

        // Both pipes feed one channel, which closes once both readers are
        // done; every streamed line is therefore forwarded before the wait.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(relay_lines(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(relay_lines(stderr, tx.clone())));
        }
        drop(tx);

        while let Some(raw) = rx.recv().await {
            let line = raw.trim();
            if let Some(needle) = self.suppress {
                if line.contains(needle) {
                    continue;
                }
            }
            sink.accept(format!("{OUTPUT_PREFIX} {line}"));
        }
        for reader in readers {
            let _ = reader.await;
        }

        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                sink.accept(format!("An unexpected error occurred: {e}"));
                return None;
            }
        };

        if status.success() {
            sink.accept(format!("{OUTPUT_PREFIX} {}", self.success_line));
        } else {
            match status.code() {
                Some(code) => sink.accept(format!(
                    "{OUTPUT_PREFIX} Process exited with error code: {code}"
                )),
                None => sink.accept(format!(
                    "{OUTPUT_PREFIX} Process terminated abnormally: {status}"
                )),
            }
        }
        status.code()
    }
}

/// Reads raw lines and forwards them decoded, replacing invalid bytes
/// rather than failing; yt-dlp output is not guaranteed to be UTF-8.
async fn relay_lines<R>(reader: R, tx: UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}
