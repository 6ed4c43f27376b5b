//! # Completion Signal
//!
//! Bridges the push-based lifecycle of a call into a single await point.
//!
//! [`CompletionSignal`] is a [`StreamObserver`] that ignores values and records the first
//! terminal event it sees. The paired [`Completion`] handle resolves once that happens:
//!
//! * `on_completed` resolves it to `Ok(())`.
//! * `on_error(status)` resolves it to `Err(status)`.
//!
//! The outcome is written exactly once; any terminal event delivered afterwards is ignored.
//! Handles can be cloned and awaited any number of times, always yielding the same outcome.
use crate::observer::StreamObserver;
use tokio::sync::watch;
use tonic::Status;

/// Terminal outcome of a call.
pub type Outcome = Result<(), Status>;

/// Observer side of the signal, handed to the transport (usually inside a
/// [`crate::observer::CompositeObserver`]).
#[derive(Debug)]
pub struct CompletionSignal {
    tx: watch::Sender<Option<Outcome>>,
}

/// Awaitable, cloneable view of a call's terminal outcome.
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<Option<Outcome>>,
}

impl CompletionSignal {
    pub fn new() -> (CompletionSignal, Completion) {
        let (tx, rx) = watch::channel(None);
        (CompletionSignal { tx }, Completion { rx })
    }

    /// Records `outcome` unless the signal already resolved. Returns whether it was recorded.
    fn resolve(&self, outcome: Outcome) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome);
            true
        })
    }
}

impl<T> StreamObserver<T> for CompletionSignal {
    fn on_next(&mut self, _value: T) -> Result<(), Status> {
        Ok(())
    }

    fn on_error(&mut self, status: Status) {
        if !self.resolve(Err(status)) {
            tracing::debug!("ignoring error event on an already resolved call");
        }
    }

    fn on_completed(&mut self) {
        if !self.resolve(Ok(())) {
            tracing::debug!("ignoring completed event on an already resolved call");
        }
    }
}

impl Completion {
    /// Waits for the call to finish.
    ///
    /// If the signal is dropped before any terminal event arrives (for example because the task
    /// driving the call was aborted), the call is reported as cancelled.
    pub async fn wait(&self) -> Outcome {
        let mut rx = self.rx.clone();
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map(|resolved| (*resolved).clone());

        match outcome {
            Ok(Some(outcome)) => outcome,
            Ok(None) | Err(_) => Err(abandoned()),
        }
    }

    /// Returns the outcome if the call already finished, without waiting.
    pub fn try_outcome(&self) -> Option<Outcome> {
        self.rx.borrow().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

fn abandoned() -> Status {
    Status::cancelled("Call ended without reporting completion")
}
