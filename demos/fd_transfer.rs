//{
fn main() -> std::io::Result<()> {
    //}
    use {
        fdrelay::{Endpoint, PollReactor},
        std::{
            cell::RefCell,
            fs::File,
            io::{Read, Seek, SeekFrom, Write},
            rc::Rc,
            time::Duration,
        },
    };

    let dir = std::env::temp_dir();
    let sock = dir.join(format!("fdrelay-demo-{}.sock", std::process::id()));
    let scratch = dir.join(format!("fdrelay-demo-{}.txt", std::process::id()));

    // Something worth sending: an open file with a few bytes in it.
    let mut payload =
        File::options().read(true).write(true).create(true).truncate(true).open(&scratch)?;
    payload.write_all(b"hello")?;
    payload.seek(SeekFrom::Start(0))?;

    let reactor = PollReactor::new();
    let listener = Endpoint::bind(&sock)?;
    listener.listen(8)?;

    let timeout = Some(Duration::from_secs(2));

    // One process plays both sides here; over a real process boundary, the
    // socket path is the only thing the two ends need to agree on.
    let client = Rc::new(RefCell::new(None));
    let server = Rc::new(RefCell::new(None));
    Endpoint::connect(&sock, &reactor, timeout, {
        let client = Rc::clone(&client);
        move |peer| *client.borrow_mut() = peer
    })?;
    listener.accept_on(&reactor, timeout, {
        let server = Rc::clone(&server);
        move |conn| *server.borrow_mut() = conn
    })?;
    reactor.run_until_idle()?;
    let client = client.take().expect("connect timed out");
    let server = server.take().expect("accept timed out");

    // The receive is issued first so it parks on read readiness; the send
    // then completes it on the next reactor turn.
    let received = Rc::new(RefCell::new(None));
    client.recv_file(&reactor, timeout, {
        let received = Rc::clone(&received);
        move |file| *received.borrow_mut() = file
    })?;
    server.send_fd(&reactor, &payload, timeout, |ok| assert!(ok, "send timed out"))?;
    reactor.run_until_idle()?;

    let mut received = received.take().expect("no descriptor came through");
    let mut contents = String::new();
    received.read_to_string(&mut contents)?;
    assert_eq!(contents, "hello");
    println!("received a descriptor reading {contents:?}");

    std::fs::remove_file(&scratch)?;
    //{
    Ok(())
} //}
