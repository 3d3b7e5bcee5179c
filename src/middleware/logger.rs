//! Access logging.
//!
//! Every request produces one logfmt line on standard output:
//!
//! ```text
//! request at=finish method=POST path=/heroku/resources status=201 elapsed=412.337
//! ```
//!
//! `elapsed` is wall-clock microseconds from the moment the logger received
//! the request to the moment the inner handler returned.
//!
//! Request tasks never write to stdout themselves. They push a [`LogEvent`]
//! into a bounded channel ([`LOG_QUEUE_CAPACITY`]) and a single [`LogSink`]
//! task drains it in FIFO order. Lines from concurrent requests may
//! interleave in any order; each line is written whole.
//!
//! When the queue is full the default [`OverflowPolicy::Block`] makes the
//! request task wait for room, so no line is ever lost but a stalled stdout
//! adds latency. [`OverflowPolicy::DropNewest`] trades that for a counter of
//! discarded lines.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::handler::{BoxFuture, Handler};
use crate::middleware::{self, Layered, Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// Bound of the shared access-log queue.
pub const LOG_QUEUE_CAPACITY: usize = 10_000;

/// One access-log record.
///
/// Carries no timestamp: the line format has no time field, and the
/// platform's log router stamps each stdout line on arrival.
#[derive(Clone, Debug, PartialEq)]
pub enum LogEvent {
    Request {
        method: String,
        path: String,
        /// `-1` when no response status was observed.
        status: i32,
        elapsed_micros: f64,
    },
    ServerStart {
        port: u16,
    },
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { method, path, status, elapsed_micros } => write!(
                f,
                "request at=finish method={method} path={path} status={status} elapsed={elapsed_micros:.3}"
            ),
            Self::ServerStart { port } => write!(f, "serve at=start port={port}"),
        }
    }
}

/// What [`RequestLogger::emit`] does when the queue is full.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OverflowPolicy {
    /// Wait for the sink to make room. Lossless.
    #[default]
    Block,
    /// Discard the new event and bump [`RequestLogger::dropped`].
    DropNewest,
}

/// Records the status of the response produced downstream.
///
/// Starts at the `-1` sentinel; [`observe`](Self::observe) stores the code
/// and passes the response through untouched.
#[derive(Debug)]
pub struct StatusCapture {
    status: Option<u16>,
}

impl StatusCapture {
    pub fn new() -> Self {
        Self { status: None }
    }

    pub fn observe(&mut self, res: Response) -> Response {
        self.status = Some(res.status_code());
        res
    }

    pub fn status(&self) -> i32 {
        self.status.map_or(-1, i32::from)
    }
}

impl Default for StatusCapture {
    fn default() -> Self { Self::new() }
}

/// Creates the producer and consumer halves of the access log.
pub fn log_channel(capacity: usize, policy: OverflowPolicy) -> (RequestLogger, LogSink) {
    let (tx, rx) = mpsc::channel(capacity);
    let logger = RequestLogger { tx, policy, dropped: Arc::new(AtomicU64::new(0)) };
    (logger, LogSink { rx })
}

/// Producer half: cheap to clone, one per layer or task that logs.
#[derive(Clone)]
pub struct RequestLogger {
    tx: mpsc::Sender<LogEvent>,
    policy: OverflowPolicy,
    dropped: Arc<AtomicU64>,
}

impl RequestLogger {
    /// Enqueues one event according to the overflow policy.
    pub async fn emit(&self, event: LogEvent) {
        match self.policy {
            OverflowPolicy::Block => {
                if self.tx.send(event).await.is_err() {
                    debug!("access log sink closed, event discarded");
                }
            }
            OverflowPolicy::DropNewest => match self.tx.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if n.is_power_of_two() {
                        warn!(dropped = n, "access log queue full, dropping events");
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("access log sink closed, event discarded");
                }
            },
        }
    }

    /// Events discarded under [`OverflowPolicy::DropNewest`].
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Wraps `handler` with this logger.
    pub fn wrap(&self, handler: impl Handler) -> Layered {
        middleware::layer(self.clone(), handler)
    }
}

impl Middleware for RequestLogger {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let logger = self.clone();
        Box::pin(async move {
            let method = req.method().to_owned();
            let path = req.path().to_owned();
            let mut capture = StatusCapture::new();

            let start = Instant::now();
            let res = capture.observe(next.run(req).await);
            let elapsed_micros = start.elapsed().as_secs_f64() * 1_000_000.0;

            logger
                .emit(LogEvent::Request { method, path, status: capture.status(), elapsed_micros })
                .await;
            res
        })
    }
}

/// Consumer half: the single task that owns the output stream.
pub struct LogSink {
    rx: mpsc::Receiver<LogEvent>,
}

impl LogSink {
    /// Writes one line per event to `out` until every [`RequestLogger`]
    /// clone has been dropped and the queue is empty.
    pub async fn run<W: AsyncWrite + Unpin>(mut self, mut out: W) -> std::io::Result<()> {
        while let Some(event) = self.rx.recv().await {
            out.write_all(format!("{event}\n").as_bytes()).await?;
            out.flush().await?;
        }
        Ok(())
    }
}
