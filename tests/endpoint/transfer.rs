//! The canonical scenario: one side binds and accepts, the other connects
//! with a deadline, a descriptor of an open file crosses the connection, and
//! reading through the received descriptor yields the file's contents.

use {
    crate::{tests::util::*, Endpoint, PollReactor},
    color_eyre::eyre::ContextCompat,
    std::{fs::File, io::Read},
};

pub fn run(id: &'static str) -> TestResult {
    let reactor = PollReactor::new();
    let (path, listener) = bind_listener(&mut NameGen::new(id, ".sock"))?;

    let scratch = NameGen::new(id, ".txt").next().unwrap();
    std::fs::write(&scratch, "hello")?;
    let payload = File::open(&scratch)?;

    let (client_slot, put_client) = slot();
    Endpoint::connect(&path, &reactor, Some(TEST_TIMEOUT), put_client)?;
    let (server_slot, put_server) = slot();
    listener.accept_on(&reactor, Some(TEST_TIMEOUT), put_server)?;
    reactor.run_until_idle()?;
    let client = client_slot
        .take()
        .context("connect callback never fired")?
        .context("connect timed out")?;
    let server = server_slot
        .take()
        .context("accept callback never fired")?
        .context("accept timed out")?;

    // Receive first so it parks on read readiness; the send then completes
    // it on the next reactor turn.
    let (recv_slot, put_recv) = slot();
    client.recv_file(&reactor, Some(TEST_TIMEOUT), put_recv)?;
    let (sent_slot, put_sent) = slot();
    server.send_fd(&reactor, &payload, Some(TEST_TIMEOUT), put_sent)?;
    reactor.run_until_idle()?;

    ensure_eq!(sent_slot.take(), Some(true), "send did not succeed");
    let mut received = recv_slot
        .take()
        .context("receive callback never fired")?
        .context("no descriptor came through before the deadline")?;

    // The received descriptor must refer to the very same open file.
    let mut contents = String::new();
    received.read_to_string(&mut contents)?;
    ensure_eq!(contents, "hello");

    std::fs::remove_file(&scratch)?;
    Ok(())
}
