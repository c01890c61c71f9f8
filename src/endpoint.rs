//! Named endpoints: connection-oriented Unix-domain sockets that pass file
//! descriptors.

use {
    crate::{
        misc::{is_would_block, retry_on_intr},
        os::unix::{addr::SocketAddr, ancillary, c_wrappers},
        reactor::{Interest, Reactor},
        retry::Pending,
    },
    std::{
        fs::File,
        io,
        os::{
            fd::{AsFd, BorrowedFd, OwnedFd},
            unix::net::UnixStream,
        },
        path::{Path, PathBuf},
        time::Duration,
    },
};

/// Unlinks the socket file a bound endpoint created, once that endpoint is
/// gone.
#[derive(Debug, Default)]
struct ReclaimGuard(Option<PathBuf>);
impl ReclaimGuard {
    fn new(path: PathBuf) -> Self {
        Self(Some(path))
    }
    fn forget(&mut self) {
        self.0 = None;
    }
}
impl Drop for ReclaimGuard {
    fn drop(&mut self) {
        if let Self(Some(path)) = self {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// A connection-oriented Unix-domain socket endpoint that can hand open file
/// descriptors to its peer.
///
/// The endpoint owns exactly one OS handle, always in non-blocking mode.
/// Operations that cannot complete immediately suspend themselves on a
/// [`Reactor`] and deliver their outcome through a completion callback,
/// invoked exactly once per operation: synchronous OS failures are raised as
/// [`io::Error`] before anything is suspended, while timeouts and
/// post-suspension failures arrive as `None`/`false` through the callback.
///
/// Sending is a handoff of interest, not ownership: the kernel duplicates
/// the descriptor into the receiving process and the sender keeps its copy.
/// Send and receive readiness are tracked independently, so one send and one
/// receive may be in flight on the same endpoint at a time; issuing
/// overlapping operations in the *same* direction is the caller's
/// responsibility to avoid.
///
/// # Example
#[doc = doctest_file::include_doctest!("demos/fd_transfer.rs")]
#[derive(Debug)]
pub struct Endpoint {
    fd: OwnedFd,
    reclaim: ReclaimGuard,
}

impl Endpoint {
    fn from_fd(fd: OwnedFd) -> Self {
        Self { fd, reclaim: ReclaimGuard::default() }
    }

    /// Creates a fresh non-blocking endpoint bound to the given filesystem
    /// path.
    ///
    /// The path is encoded byte for byte; paths that do not fit the
    /// platform's socket address structure are rejected with
    /// [`InvalidInput`](io::ErrorKind::InvalidInput). Any `bind(2)` failure
    /// is returned with the OS error code and message. The socket file is
    /// unlinked again when the endpoint is dropped, unless
    /// [`do_not_reclaim_path_on_drop`](Self::do_not_reclaim_path_on_drop)
    /// was called.
    pub fn bind(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let addr = SocketAddr::from_path(path)?;
        let fd = c_wrappers::create_endpoint_socket(true)?;
        c_wrappers::bind(fd.as_fd(), &addr)?;
        Ok(Self { fd, reclaim: ReclaimGuard::new(path.to_owned()) })
    }

    /// Starts accepting connections on a bound endpoint.
    pub fn listen(&self, backlog: i32) -> io::Result<()> {
        c_wrappers::listen(self.fd.as_fd(), backlog)
    }

    /// Accepts one pending connection without blocking, wrapping it in a new
    /// non-blocking endpoint. Fails with
    /// [`WouldBlock`](io::ErrorKind::WouldBlock) if none is queued; see
    /// [`accept_on`](Self::accept_on) for the readiness-driven form.
    pub fn accept(&self) -> io::Result<Endpoint> {
        retry_on_intr(|| c_wrappers::accept(self.fd.as_fd())).map(Self::from_fd)
    }

    /// Accepts a connection through the readiness loop: delivers
    /// `Some(endpoint)` once a connection arrives, or `None` if `timeout`
    /// elapses first.
    pub fn accept_on<F>(
        &self,
        reactor: &dyn Reactor,
        timeout: Option<Duration>,
        on_accept: F,
    ) -> io::Result<()>
    where
        F: FnOnce(Option<Endpoint>) + 'static,
    {
        match retry_on_intr(|| c_wrappers::accept(self.fd.as_fd())) {
            Ok(conn) => {
                on_accept(Some(Self::from_fd(conn)));
                return Ok(());
            }
            Err(e) if is_would_block(&e) => {}
            Err(e) => return Err(e),
        }
        let handle = c_wrappers::duplicate_fd(self.fd.as_fd())?;
        Pending::new(
            handle,
            Interest::Readable,
            timeout,
            |fd| c_wrappers::accept(fd.as_fd()).map(Self::from_fd),
            on_accept,
        )?
        .park(reactor);
        Ok(())
    }

    /// Connects to the endpoint bound at `path`.
    ///
    /// If the connection completes synchronously, `on_connect` is invoked
    /// with `Some(endpoint)` before this function returns. If the OS reports
    /// it as in progress (or the accept queue as momentarily full), the
    /// operation suspends on write readiness; once ready, the pending error
    /// state of the socket decides between `Some(endpoint)` and `None`. If
    /// `timeout` elapses first, `on_connect` receives `None` and the handle
    /// is closed. Any other synchronous failure (no listener at the path,
    /// for instance) is returned as an error and `on_connect` is never
    /// invoked.
    pub fn connect<F>(
        path: impl AsRef<Path>,
        reactor: &dyn Reactor,
        timeout: Option<Duration>,
        on_connect: F,
    ) -> io::Result<()>
    where
        F: FnOnce(Option<Endpoint>) + 'static,
    {
        let addr = SocketAddr::from_path(path.as_ref())?;
        let fd = c_wrappers::create_endpoint_socket(true)?;
        match c_wrappers::connect(fd.as_fd(), &addr) {
            Ok(()) => {
                on_connect(Some(Self::from_fd(fd)));
                Ok(())
            }
            Err(e) if connect_deferred(&e) || is_would_block(&e) => {
                // Deferred: wait for write readiness, then read the verdict
                // off SO_ERROR. Queue-full: re-issue the connect itself once
                // writability suggests the queue may have drained.
                let mut in_progress = connect_deferred(&e);
                let handle = c_wrappers::duplicate_fd(fd.as_fd())?;
                let endpoint = Self::from_fd(fd);
                Pending::new(
                    handle,
                    Interest::Writable,
                    timeout,
                    move |fd| {
                        if in_progress {
                            return match c_wrappers::take_error(fd.as_fd())? {
                                Some(pending) => Err(pending),
                                None => Ok(()),
                            };
                        }
                        match c_wrappers::connect(fd.as_fd(), &addr) {
                            Err(e) if connect_deferred(&e) => {
                                in_progress = true;
                                Err(io::ErrorKind::WouldBlock.into())
                            }
                            other => other,
                        }
                    },
                    move |result: Option<()>| on_connect(result.map(|()| endpoint)),
                )?
                .park(reactor);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Sends the descriptor of `resource` (a file, a stream, another
    /// endpoint, anything that exposes an OS handle) to the peer.
    ///
    /// On synchronous success, `on_sent` is invoked with `true` before this
    /// function returns. If the send buffer is full, the operation suspends
    /// on write readiness, holding duplicates of both handles so the caller
    /// is free to drop its own; `on_sent(false)` reports a timeout or a
    /// post-suspension failure. A synchronous hard failure is returned as an
    /// error and `on_sent` is never invoked.
    pub fn send_fd<F>(
        &self,
        reactor: &dyn Reactor,
        resource: &impl AsFd,
        timeout: Option<Duration>,
        on_sent: F,
    ) -> io::Result<()>
    where
        F: FnOnce(bool) + 'static,
    {
        let donor = resource.as_fd();
        match retry_on_intr(|| ancillary::send_one_fd(self.fd.as_fd(), donor)) {
            Ok(()) => {
                on_sent(true);
                return Ok(());
            }
            Err(e) if is_would_block(&e) => {}
            Err(e) => return Err(e),
        }
        let handle = c_wrappers::duplicate_fd(self.fd.as_fd())?;
        let donor = c_wrappers::duplicate_fd(donor)?;
        Pending::new(
            handle,
            Interest::Writable,
            timeout,
            move |fd| ancillary::send_one_fd(fd.as_fd(), donor.as_fd()),
            move |result: Option<()>| on_sent(result.is_some()),
        )?
        .park(reactor);
        Ok(())
    }

    /// Receives one descriptor from the peer.
    ///
    /// `on_recv` gets `Some` with ownership of the received descriptor, or
    /// `None` when there is no descriptor to deliver: the peer closed the
    /// connection without sending, the message did not carry a well-formed
    /// single-descriptor envelope, or `timeout` elapsed. None of those are
    /// errors. A synchronous hard failure is returned as an error and
    /// `on_recv` is never invoked.
    pub fn recv_fd<F>(
        &self,
        reactor: &dyn Reactor,
        timeout: Option<Duration>,
        on_recv: F,
    ) -> io::Result<()>
    where
        F: FnOnce(Option<OwnedFd>) + 'static,
    {
        match retry_on_intr(|| ancillary::recv_one_fd(self.fd.as_fd())) {
            Ok(received) => {
                on_recv(received);
                return Ok(());
            }
            Err(e) if is_would_block(&e) => {}
            Err(e) => return Err(e),
        }
        let handle = c_wrappers::duplicate_fd(self.fd.as_fd())?;
        Pending::new(
            handle,
            Interest::Readable,
            timeout,
            |fd| ancillary::recv_one_fd(fd.as_fd()),
            move |result: Option<Option<OwnedFd>>| on_recv(result.flatten()),
        )?
        .park(reactor);
        Ok(())
    }

    /// Receives a descriptor and hands it over as a [`File`].
    pub fn recv_file<F>(
        &self,
        reactor: &dyn Reactor,
        timeout: Option<Duration>,
        on_recv: F,
    ) -> io::Result<()>
    where
        F: FnOnce(Option<File>) + 'static,
    {
        self.recv_fd(reactor, timeout, move |fd| on_recv(fd.map(File::from)))
    }

    /// Receives a descriptor and hands it over as a [`UnixStream`]. It is on
    /// the two peers to agree that what travels over this connection really
    /// is a stream socket.
    pub fn recv_stream<F>(
        &self,
        reactor: &dyn Reactor,
        timeout: Option<Duration>,
        on_recv: F,
    ) -> io::Result<()>
    where
        F: FnOnce(Option<UnixStream>) + 'static,
    {
        self.recv_fd(reactor, timeout, move |fd| on_recv(fd.map(UnixStream::from)))
    }

    /// Receives a descriptor and hands it over as another [`Endpoint`],
    /// which is how a connection itself travels across processes.
    pub fn recv_endpoint<F>(
        &self,
        reactor: &dyn Reactor,
        timeout: Option<Duration>,
        on_recv: F,
    ) -> io::Result<()>
    where
        F: FnOnce(Option<Endpoint>) + 'static,
    {
        self.recv_fd(reactor, timeout, move |fd| on_recv(fd.map(Self::from_fd)))
    }

    /// Keeps the socket file on the filesystem when this endpoint is
    /// dropped.
    pub fn do_not_reclaim_path_on_drop(&mut self) {
        self.reclaim.forget();
    }
}

fn connect_deferred(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EINPROGRESS) || e.kind() == io::ErrorKind::Interrupted
}

impl AsFd for Endpoint {
    #[inline]
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

/// Wraps an already-connected (or otherwise obtained) handle. No path is
/// reclaimed on drop, and the handle is left in whatever blocking mode it
/// arrived in.
impl From<OwnedFd> for Endpoint {
    fn from(fd: OwnedFd) -> Self {
        Self::from_fd(fd)
    }
}

impl From<Endpoint> for OwnedFd {
    fn from(mut endpoint: Endpoint) -> Self {
        endpoint.reclaim.forget();
        endpoint.fd
    }
}
