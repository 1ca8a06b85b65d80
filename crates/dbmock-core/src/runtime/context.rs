// crates/dbmock-core/src/runtime/context.rs
// ============================================================================
// Module: dbmock Call Context
// Description: Cancellation and deadline carrier passed to every facade call.
// Purpose: Let callers abort a call while it waits out a declared delay.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! A [`Context`] combines an optional cancellation signal with an optional
//! deadline. Contexts are cheap to clone; clones observe the same signal.
//! Cancellation is triggered through the [`CancelHandle`] returned by
//! [`Context::with_cancel`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::runtime::error::DriverError;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Cancellation signal and deadline for a call.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Receiver flipped to true on cancellation.
    cancel: Option<watch::Receiver<bool>>,
    /// Instant after which the context is expired.
    deadline: Option<Instant>,
}

/// Handle that cancels the contexts derived from it.
#[derive(Debug)]
pub struct CancelHandle {
    /// Sender shared with every derived context.
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancels every context sharing this handle.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Context {
    /// Returns a context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a cancellable context and its cancel handle.
    #[must_use]
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        let context = Self {
            cancel: Some(receiver),
            deadline: None,
        };
        (context, CancelHandle {
            sender,
        })
    }

    /// Returns a context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().child_with_timeout(timeout)
    }

    /// Returns a context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: None,
            deadline: Some(deadline),
        }
    }

    /// Returns a child sharing this context's cancellation, expiring after
    /// `timeout` or at the parent deadline, whichever is earlier.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the context error if it is already cancelled or expired.
    #[must_use]
    pub fn err(&self) -> Option<DriverError> {
        if self.cancel.as_ref().is_some_and(|receiver| *receiver.borrow()) {
            return Some(DriverError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(DriverError::DeadlineExceeded);
        }
        None
    }

    /// Resolves with the context error once the context is cancelled or expired.
    pub(crate) async fn done(&self) -> DriverError {
        tokio::select! {
            () = wait_cancelled(self.cancel.clone()) => DriverError::Cancelled,
            () = wait_deadline(self.deadline) => DriverError::DeadlineExceeded,
        }
    }

    /// Waits `delay` unless the context ends first.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Cancelled`] or [`DriverError::DeadlineExceeded`]
    /// when the context ends before the delay elapses.
    pub(crate) async fn sleep(&self, delay: Duration) -> Result<(), DriverError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

/// Completes when the receiver observes cancellation; never completes otherwise.
async fn wait_cancelled(receiver: Option<watch::Receiver<bool>>) {
    if let Some(mut receiver) = receiver
        && receiver.wait_for(|cancelled| *cancelled).await.is_ok()
    {
        return;
    }
    std::future::pending::<()>().await;
}

/// Completes at the deadline; never completes without one.
async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
