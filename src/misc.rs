use std::{
    io,
    time::{Duration, Instant},
};

/// Whether the error is an `EAGAIN`-class report of transient non-readiness,
/// as opposed to a genuine failure.
#[inline]
pub(crate) fn is_would_block(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
}

/// Runs `f`, transparently repeating attempts interrupted by signal delivery.
pub(crate) fn retry_on_intr<T>(mut f: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match f() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

pub(crate) fn timeout_expiry(timeout: Duration) -> io::Result<Instant> {
    let msg = "timeout expiry time overflowed std::time::Instant";
    Instant::now()
        .checked_add(timeout)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, msg))
}
