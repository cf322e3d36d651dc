//! Worker output forwarding and defect detection.
//!
//! Worker stdout and stderr are piped through the harness so they still reach the console
//! verbatim, and every line is checked for the defect signature. A match sets a shared flag
//! the driver reads after each attempt, which turns "look for the traceback in the scrollback"
//! into a per-attempt yes/no.

use std::{
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    task::JoinHandle,
};
use tracing::warn;

/// Which console stream a forwarded line goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Shared detection state between the forwarding tasks and the worker handle.
#[derive(Debug, Default)]
pub struct DefectFlag {
    pending: AtomicBool,
}

impl DefectFlag {
    /// Records a defect observation until the next [`DefectFlag::take`].
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Returns whether a match was seen since the last call and clears it.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

/// Forwards a worker's output streams and watches them for the defect signature.
pub struct OutputMonitor {
    flag: Arc<DefectFlag>,
    forwarders: Vec<JoinHandle<()>>,
}

impl OutputMonitor {
    /// Creates a monitor with no attached streams.
    pub fn new() -> Self {
        Self {
            flag: Arc::new(DefectFlag::default()),
            forwarders: Vec::new(),
        }
    }

    /// Spawns a task forwarding `reader` line by line to `stream`.
    ///
    /// Lines are read as raw bytes so non-UTF-8 output is forwarded unchanged; matching is
    /// done on a lossy UTF-8 view. An empty `pattern` disables matching.
    pub fn attach<R>(&mut self, reader: R, stream: Stream, pattern: &str)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let flag = Arc::clone(&self.flag);
        let pattern = pattern.to_string();

        let handle = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = Vec::new();

            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        forward(stream, &line);
                        if !pattern.is_empty()
                            && String::from_utf8_lossy(&line).contains(pattern.as_str())
                        {
                            warn!("Defect signature `{}` observed in worker output", pattern);
                            flag.raise();
                        }
                    }
                    Err(e) => {
                        warn!("Stopped forwarding worker {:?}: {}", stream, e);
                        break;
                    }
                }
            }
        });

        self.forwarders.push(handle);
    }

    /// Handle to the detection flag.
    pub fn flag(&self) -> Arc<DefectFlag> {
        Arc::clone(&self.flag)
    }

    /// Waits up to `timeout` for the forwarders to drain after the worker exited.
    ///
    /// Grandchildren that inherited the pipes can keep them open past the worker's own exit,
    /// so draining is bounded; forwarders still running after the timeout are left to finish
    /// in the background.
    pub async fn settle(&mut self, timeout: Duration) {
        let forwarders = std::mem::take(&mut self.forwarders);
        let _ = tokio::time::timeout(timeout, async move {
            for handle in forwarders {
                let _ = handle.await;
            }
        })
        .await;
    }
}

impl Default for OutputMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn forward(stream: Stream, line: &[u8]) {
    // Console write failures are not worth aborting the run over
    let _ = match stream {
        Stream::Stdout => std::io::stdout().lock().write_all(line),
        Stream::Stderr => std::io::stderr().lock().write_all(line),
    };
}
