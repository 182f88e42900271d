//! # Candidate Prober
//!
//! Checks whether an origin can be loaded as an iframe in this runtime by
//! loading its handshake document in a hidden frame and waiting for the
//! document to post a message back.
//!
//! ## Invariants
//!
//! - The hidden frame and the listener exist only while the probe runs. Both
//!   are released on success, timeout, cancellation, and if the probe future
//!   is dropped part way.
//! - Only messages whose source is the probe's own frame count as an answer.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::page::FrameId;
use crate::page::HostPage;
use crate::page::Iframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeError {
    /// Nothing answered within the window.
    Timeout(Duration),
    /// The caller gave up before an answer arrived.
    Cancelled,
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout(d) => write!(f, "Protocol failed to start within {} ms", d.as_millis()),
            Self::Cancelled => write!(f, "Probe cancelled"),
        }
    }
}

impl std::error::Error for ProbeError {}

pub type Result<T> = std::result::Result<T, ProbeError>;

/// Removes the hidden frame when the probe ends, however it ends.
struct MountedProbe<'a> {
    page: &'a dyn HostPage,
    frame: FrameId,
}

impl Drop for MountedProbe<'_> {
    fn drop(&mut self) {
        self.page.remove_iframe(self.frame);
    }
}

/// Loads `origin` in a hidden frame and waits for it to post a message.
pub async fn probe(
    page: &dyn HostPage,
    origin: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    // listen before mounting so an immediate answer is not missed
    let mut listener = page.messages().listen();
    let mounted = MountedProbe {
        page,
        frame: page.append_iframe(Iframe::hidden(origin)),
    };
    let frame = mounted.frame;
    tracing::debug!(origin, frame = %frame, "probing");

    let answered = async {
        loop {
            match listener.recv().await {
                Some(message) if message.source == Some(frame) => break,
                Some(_) => continue,
                // the bus is gone, so no answer can come; let the timer decide
                None => std::future::pending::<()>().await,
            }
        }
    };

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProbeError::Cancelled),
        res = tokio::time::timeout(timeout, answered) => res.map_err(|_| ProbeError::Timeout(timeout)),
    };

    match &outcome {
        Ok(()) => tracing::debug!(origin, "probe answered"),
        Err(e) => tracing::debug!(origin, error = %e, "probe failed"),
    }

    drop(mounted);
    drop(listener);
    outcome
}
