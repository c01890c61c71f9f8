//! Suspension and resumption of non-blocking attempts over the reactor.

use {
    crate::{
        misc::{is_would_block, retry_on_intr, timeout_expiry},
        reactor::{Interest, Reactor, Readiness},
    },
    std::{
        io,
        os::fd::{AsRawFd, BorrowedFd, OwnedFd},
        time::{Duration, Instant},
    },
};

/// A suspended non-blocking operation.
///
/// Holds everything needed to retry: the handle being waited on (an owned
/// duplicate, making the parked state self-contained), the awaited interest,
/// the absolute deadline if any, the attempt closure and the completion
/// callback. [`park`](Self::park) hands the whole object to the reactor;
/// the notification consumes it, either terminally (success, hard failure or
/// timeout, with exactly one completion call) or by parking again after another
/// transient non-readiness. Re-parking re-submits this object instead of
/// recursing, so arbitrarily many wakeups cost constant stack.
pub(crate) struct Pending<T, A, C>
where
    T: 'static,
    A: FnMut(&OwnedFd) -> io::Result<T> + 'static,
    C: FnOnce(Option<T>) + 'static,
{
    handle: OwnedFd,
    interest: Interest,
    deadline: Option<Instant>,
    attempt: A,
    complete: C,
}

impl<T, A, C> Pending<T, A, C>
where
    T: 'static,
    A: FnMut(&OwnedFd) -> io::Result<T> + 'static,
    C: FnOnce(Option<T>) + 'static,
{
    pub fn new(
        handle: OwnedFd,
        interest: Interest,
        timeout: Option<Duration>,
        attempt: A,
        complete: C,
    ) -> io::Result<Self> {
        let deadline = timeout.map(timeout_expiry).transpose()?;
        Ok(Self { handle, interest, deadline, attempt, complete })
    }

    /// Registers interest with the reactor, parking this operation until
    /// readiness or expiry.
    pub fn park(self, reactor: &dyn Reactor) {
        let raw = self.handle.as_raw_fd();
        let timeout = self.deadline.map(|d| d.saturating_duration_since(Instant::now()));
        let handle = unsafe {
            // SAFETY: the registration only captures the raw value during
            // this call, and the closure it is handed owns the descriptor
            BorrowedFd::borrow_raw(raw)
        };
        reactor.register(
            handle,
            self.interest,
            timeout,
            Box::new(move |reactor, readiness| self.resume(reactor, readiness)),
        );
    }

    fn resume(mut self, reactor: &dyn Reactor, readiness: Readiness) {
        match readiness {
            Readiness::TimedOut => (self.complete)(None),
            Readiness::Ready => match retry_on_intr(|| (self.attempt)(&self.handle)) {
                Ok(value) => (self.complete)(Some(value)),
                Err(e) if is_would_block(&e) => self.park(reactor),
                // Failures past the first suspension are only ever reported
                // through the completion callback, not raised.
                Err(_) => (self.complete)(None),
            },
        }
    }
}
