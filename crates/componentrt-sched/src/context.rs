//! The per-call context threaded from a guest call down into host
//! handlers and pending ops: cancellation, deadlines, and user-attached
//! key-value payloads (spec.md §4.3 "Per-call dispatch", §4.4
//! "Cancellation"/"Timeouts").

use componentrt_types::{Error, ErrorKind, Phase};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cheaply-cloned cancellation signal shared between a call session
/// and everything it spawns. Cloning shares the same underlying flag;
/// cancelling any clone cancels all of them.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ambient state carried through one guest call: a cancellation
/// signal, an optional deadline, and arbitrary caller-attached
/// metadata that host handlers may read (request ids, trace context,
/// and the like). Constructed once per call session and handed down
/// unchanged to every handler and pending op the call touches.
#[derive(Clone, Debug)]
pub struct CallContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    attachments: HashMap<String, String>,
}

impl CallContext {
    pub fn new() -> Self {
        CallContext {
            cancellation: CancellationToken::new(),
            deadline: None,
            attachments: HashMap::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_attachment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attachments.insert(key.into(), value.into());
        self
    }

    pub fn attachment(&self, key: &str) -> Option<&str> {
        self.attachments.get(key).map(String::as_str)
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Checked at every scheduler step boundary (spec.md §4.4): fails
    /// with `Cancelled` if the token was tripped, then with
    /// `DeadlineExceeded` if the deadline has passed. Order matters —
    /// an explicit cancellation always takes precedence over a
    /// deadline that happened to expire at the same step.
    pub fn check(&self) -> Result<(), Error> {
        if self.cancellation.is_cancelled() {
            return Err(Error::new(ErrorKind::Cancelled, Phase::Scheduler, "call was cancelled"));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::new(
                    ErrorKind::DeadlineExceeded,
                    Phase::Scheduler,
                    "call exceeded its deadline",
                ));
            }
        }
        Ok(())
    }
}

impl Default for CallContext {
    fn default() -> Self {
        CallContext::new()
    }
}
