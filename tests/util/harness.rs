use {
    super::{NameGen, TestResult},
    crate::{Endpoint, PollReactor},
    color_eyre::eyre::{ContextCompat, WrapErr},
    std::{cell::RefCell, io, path::PathBuf, rc::Rc, time::Duration},
};

pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Binds and starts a listener on a fresh name, skipping names that happen
/// to be taken.
pub fn bind_listener(namegen: &mut NameGen) -> TestResult<(PathBuf, Endpoint)> {
    use io::ErrorKind::*;
    loop {
        let path = namegen.next().unwrap();
        let listener = match Endpoint::bind(&path) {
            Ok(l) => l,
            Err(e) if matches!(e.kind(), AddrInUse | PermissionDenied) => continue,
            Err(e) => return Err(e).context("listener bind failed"),
        };
        listener.listen(8).context("listen failed")?;
        return Ok((path, listener));
    }
}

/// A slot a completion callback can drop its result into, plus the callback
/// that does so. `None` in the slot means the callback has not fired.
pub fn slot<T: 'static>() -> (Rc<RefCell<Option<T>>>, impl FnOnce(T) + 'static) {
    let cell = Rc::new(RefCell::new(None));
    let writer = {
        let cell = Rc::clone(&cell);
        move |value| *cell.borrow_mut() = Some(value)
    };
    (cell, writer)
}

/// Establishes a client/server connection pair over one reactor.
pub fn connected_pair(reactor: &PollReactor, id: &'static str) -> TestResult<(Endpoint, Endpoint)> {
    let mut namegen = NameGen::new(id, ".sock");
    let (path, listener) = bind_listener(&mut namegen)?;
    let (client_slot, put_client) = slot();
    let (server_slot, put_server) = slot();
    Endpoint::connect(&path, reactor, Some(TEST_TIMEOUT), put_client).context("connect failed")?;
    listener.accept_on(reactor, Some(TEST_TIMEOUT), put_server).context("accept failed")?;
    reactor.run_until_idle().context("reactor run failed")?;
    let client = client_slot
        .take()
        .context("connect callback never fired")?
        .context("connect timed out")?;
    let server = server_slot
        .take()
        .context("accept callback never fired")?
        .context("accept timed out")?;
    Ok((client, server))
}
