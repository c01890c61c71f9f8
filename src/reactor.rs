//! The readiness-notification seam and a reference single-threaded
//! implementation of it.
//!
//! The rest of the crate only suspends on the [`Reactor`] trait: one
//! registration, one callback, carrying either [`Readiness::Ready`] or
//! [`Readiness::TimedOut`]. [`PollReactor`] is the implementation shipped
//! with the crate; an application that already runs its own event loop can
//! implement the trait on top of that loop instead.

use {
    crate::os::unix::c_wrappers,
    std::{
        cell::RefCell,
        fmt::{self, Debug, Formatter},
        io,
        os::fd::{AsRawFd, BorrowedFd, RawFd},
        time::{Duration, Instant},
    },
};

/// The readiness condition a registration waits for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interest {
    /// The handle can be read from without blocking.
    Readable,
    /// The handle can be written to without blocking.
    Writable,
}

/// What a registration resolved with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// The awaited readiness condition arrived.
    Ready,
    /// The registration's timeout elapsed first.
    TimedOut,
}

/// Callback invoked exactly once when a registration resolves. The reactor
/// passes itself back in so the callback can register a follow-up.
pub type EventFn = Box<dyn FnOnce(&dyn Reactor, Readiness)>;

/// A readiness-notification loop that operations suspend on.
///
/// Each `register` call arms exactly one callback invocation: with
/// [`Readiness::Ready`] once `handle` can make progress in the direction of
/// `interest`, or with [`Readiness::TimedOut`] once `timeout` elapses,
/// whichever comes first. A timeout of `None` waits indefinitely. The raw
/// handle value is captured at registration time; the caller keeps the
/// descriptor open until the callback fires (the suspended operations in
/// this crate do so by owning a duplicate).
pub trait Reactor {
    /// Arms a one-shot readiness callback for `handle`.
    fn register(
        &self,
        handle: BorrowedFd<'_>,
        interest: Interest,
        timeout: Option<Duration>,
        on_event: EventFn,
    );
}

struct Registration {
    fd: RawFd,
    interest: Interest,
    deadline: Option<Instant>,
    on_event: EventFn,
}

/// Single-threaded `poll(2)`-backed [`Reactor`].
///
/// Registrations accumulate between turns; [`turn`](Self::turn) performs one
/// `poll(2)` pass, sleeping no longer than the nearest deadline, and fires
/// the callbacks of every registration that resolved. Callbacks run on the
/// calling thread and may register anew; such registrations are picked up
/// from the next turn onward.
#[derive(Default)]
pub struct PollReactor {
    registrations: RefCell<Vec<Registration>>,
}

impl PollReactor {
    /// Creates a reactor with no registrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no registrations are currently waiting.
    pub fn is_idle(&self) -> bool {
        self.registrations.borrow().is_empty()
    }

    /// Performs one `poll(2)` pass and fires every resolved callback,
    /// returning how many fired. Returns immediately with zero if there is
    /// nothing to wait on.
    pub fn turn(&self) -> io::Result<usize> {
        let mut pollfds;
        let timeout_ms;
        {
            let regs = self.registrations.borrow();
            if regs.is_empty() {
                return Ok(0);
            }
            pollfds = regs
                .iter()
                .map(|r| libc::pollfd {
                    fd: r.fd,
                    events: match r.interest {
                        Interest::Readable => libc::POLLIN,
                        Interest::Writable => libc::POLLOUT,
                    },
                    revents: 0,
                })
                .collect::<Vec<_>>();
            timeout_ms = nearest_timeout_ms(&regs, Instant::now());
        }
        c_wrappers::poll(&mut pollfds, timeout_ms)?;

        // Resolved registrations are detached before anything is invoked so
        // that callbacks are free to take the borrow and register again.
        let mut fired = Vec::new();
        {
            let now = Instant::now();
            let mut regs = self.registrations.borrow_mut();
            // Back-to-front so that swap_remove only disturbs already-visited
            // indices and regs stays in lockstep with pollfds.
            #[allow(clippy::indexing_slicing)] // pollfds was built from regs
            for idx in (0..pollfds.len()).rev() {
                let revents = pollfds[idx].revents;
                let ready = revents
                    & (pollfds[idx].events | libc::POLLERR | libc::POLLHUP | libc::POLLNVAL)
                    != 0;
                let expired = regs[idx].deadline.is_some_and(|d| d <= now);
                if ready || expired {
                    let Registration { on_event, .. } = regs.swap_remove(idx);
                    let readiness = if ready { Readiness::Ready } else { Readiness::TimedOut };
                    fired.push((on_event, readiness));
                }
            }
        }
        let fired_count = fired.len();
        for (on_event, readiness) in fired {
            on_event(self, readiness);
        }
        Ok(fired_count)
    }

    /// Runs [`turn`](Self::turn) until no registrations remain.
    pub fn run_until_idle(&self) -> io::Result<()> {
        while !self.is_idle() {
            self.turn()?;
        }
        Ok(())
    }
}

impl Reactor for PollReactor {
    fn register(
        &self,
        handle: BorrowedFd<'_>,
        interest: Interest,
        timeout: Option<Duration>,
        on_event: EventFn,
    ) {
        // A timeout too large for Instant arithmetic is indistinguishable
        // from waiting forever.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        self.registrations.borrow_mut().push(Registration {
            fd: handle.as_raw_fd(),
            interest,
            deadline,
            on_event,
        });
    }
}

impl Debug for PollReactor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollReactor")
            .field("registrations", &self.registrations.borrow().len())
            .finish()
    }
}

/// Milliseconds until the nearest deadline, rounded up so that `poll(2)`
/// never wakes before an expiry, or -1 for an unbounded wait.
#[allow(clippy::cast_possible_truncation)] // clamped to c_int::MAX
fn nearest_timeout_ms(regs: &[Registration], now: Instant) -> libc::c_int {
    let mut nearest: Option<Duration> = None;
    for reg in regs {
        if let Some(deadline) = reg.deadline {
            let remaining = deadline.saturating_duration_since(now);
            nearest = Some(match nearest {
                Some(cur) => cur.min(remaining),
                None => remaining,
            });
        }
    }
    match nearest {
        Some(d) if d.is_zero() => 0,
        Some(d) => d
            .as_millis()
            .saturating_add(1)
            .min(libc::c_int::MAX as u128) as libc::c_int,
        None => -1,
    }
}
