//! Operations that keep observing non-readiness must resolve through their
//! timeout: exactly one callback, a distinguished absent result, nothing
//! raised and nothing leaked.

use {
    crate::{tests::util::*, Endpoint, PollReactor},
    color_eyre::eyre::{bail, ensure, ContextCompat},
    std::{
        fs::File,
        time::{Duration, Instant},
    },
};

const SHORT_TIMEOUT: Duration = Duration::from_millis(250);

/// Fills the send buffer of a connection whose peer never reads until a send
/// parks, then lets that send run into its deadline.
pub fn send_times_out(id: &'static str) -> TestResult {
    let reactor = PollReactor::new();
    let (sender, _receiver) = connected_pair(&reactor, id)?;
    let file = File::open("/dev/null")?;

    let mut parked = None;
    for _ in 0..100_000 {
        let (sent_slot, put_sent) = slot();
        sender.send_fd(&reactor, &file, Some(SHORT_TIMEOUT), put_sent)?;
        if sent_slot.borrow().is_none() {
            parked = Some(sent_slot);
            break;
        }
        ensure_eq!(sent_slot.take(), Some(true), "synchronous send reported failure");
    }
    let parked = parked.context("send buffer refused to fill up")?;

    let start = Instant::now();
    reactor.run_until_idle()?;
    ensure_eq!(parked.take(), Some(false), "parked send should have timed out");
    ensure!(start.elapsed() < TEST_TIMEOUT, "timeout took unreasonably long to fire");
    ensure!(reactor.is_idle(), "timed-out send left a registration behind");
    Ok(())
}

/// Fills a listener's accept queue without ever accepting, then checks that
/// the next connect resolves to an absent result within its deadline.
pub fn connect_on_full_backlog(id: &'static str) -> TestResult {
    let reactor = PollReactor::new();
    let (path, listener) = bind_listener(&mut NameGen::new(id, ".sock"))?;

    let mut fillers = Vec::new();
    let mut stalled = None;
    for _ in 0..64 {
        let (conn_slot, put_conn) = slot();
        Endpoint::connect(&path, &reactor, Some(SHORT_TIMEOUT), put_conn)?;
        if conn_slot.borrow().is_none() {
            stalled = Some(conn_slot);
            break;
        }
        match conn_slot.take().unwrap() {
            Some(conn) => fillers.push(conn),
            None => bail!("synchronous connect delivered an absent result"),
        }
    }
    let stalled = stalled.context("accept queue refused to fill up")?;

    let start = Instant::now();
    reactor.run_until_idle()?;
    let outcome = stalled.take().context("connect callback never fired")?;
    ensure!(outcome.is_none(), "connect against a full queue should have timed out");
    ensure!(start.elapsed() < TEST_TIMEOUT, "timeout took unreasonably long to fire");

    drop(fillers);
    drop(listener);
    Ok(())
}
