use {
    super::{addr::SocketAddr, unixprelude::*},
    std::{io, mem::size_of, ptr},
};

pub(crate) fn create_endpoint_socket(nonblocking: bool) -> io::Result<OwnedFd> {
    #[allow(unused_mut, clippy::let_and_return)]
    let ty = {
        let mut ty = libc::SOCK_STREAM;
        #[cfg(target_os = "linux")]
        {
            ty |= libc::SOCK_CLOEXEC;
            if nonblocking {
                ty |= libc::SOCK_NONBLOCK;
            }
        }
        ty
    };
    let (success, fd) = unsafe {
        let result = libc::socket(libc::AF_UNIX, ty, 0);
        (result != -1, result)
    };
    let fd = ok_or_ret_errno!(success => unsafe {
        // SAFETY: we just created this descriptor
        OwnedFd::from_raw_fd(fd)
    })?;
    #[cfg(not(target_os = "linux"))]
    {
        set_cloexec(fd.as_fd())?;
        set_nonblocking(fd.as_fd(), nonblocking)?;
    }
    Ok(fd)
}

pub(crate) fn bind(fd: BorrowedFd<'_>, addr: &SocketAddr) -> io::Result<()> {
    let success = unsafe {
        // SAFETY: the address codec guarantees a terminated, length-consistent sockaddr_un
        libc::bind(fd.as_raw_fd(), addr.as_ptr(), addr.len()) != -1
    };
    ok_or_ret_errno!(success => ())
}

pub(crate) fn connect(fd: BorrowedFd<'_>, addr: &SocketAddr) -> io::Result<()> {
    let success = unsafe {
        // SAFETY: as above
        libc::connect(fd.as_raw_fd(), addr.as_ptr(), addr.len()) != -1
    };
    ok_or_ret_errno!(success => ())
}

pub(crate) fn listen(fd: BorrowedFd<'_>, backlog: c_int) -> io::Result<()> {
    let success = unsafe { libc::listen(fd.as_raw_fd(), backlog) != -1 };
    ok_or_ret_errno!(success => ())
}

/// Accepts one pending connection, leaving the new descriptor non-blocking
/// and close-on-exec.
pub(crate) fn accept(fd: BorrowedFd<'_>) -> io::Result<OwnedFd> {
    #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
    {
        let (success, conn) = unsafe {
            let result = libc::accept4(
                fd.as_raw_fd(),
                ptr::null_mut(),
                ptr::null_mut(),
                libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
            );
            (result != -1, result)
        };
        ok_or_ret_errno!(success => unsafe {
            // SAFETY: freshly accepted, nothing else owns it
            OwnedFd::from_raw_fd(conn)
        })
    }
    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
    {
        let (success, conn) = unsafe {
            let result = libc::accept(fd.as_raw_fd(), ptr::null_mut(), ptr::null_mut());
            (result != -1, result)
        };
        let conn = ok_or_ret_errno!(success => unsafe {
            // SAFETY: as above
            OwnedFd::from_raw_fd(conn)
        })?;
        set_cloexec(conn.as_fd())?;
        set_nonblocking(conn.as_fd(), true)?;
        Ok(conn)
    }
}

pub(crate) fn sendmsg(fd: BorrowedFd<'_>, hdr: &libc::msghdr) -> io::Result<usize> {
    let (success, bytes_sent) = unsafe {
        // SAFETY: the caller stages iovecs and control data that outlive the call
        let size_or_err = libc::sendmsg(fd.as_raw_fd(), hdr, 0);
        (size_or_err >= 0, size_or_err as usize)
    };
    ok_or_ret_errno!(success => bytes_sent)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const RECVMSG_FLAGS: c_int = libc::MSG_CMSG_CLOEXEC;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const RECVMSG_FLAGS: c_int = 0;

pub(crate) fn recvmsg(fd: BorrowedFd<'_>, hdr: &mut libc::msghdr) -> io::Result<usize> {
    let (success, bytes_read) = unsafe {
        // SAFETY: as above
        let size_or_err = libc::recvmsg(fd.as_raw_fd(), hdr, RECVMSG_FLAGS);
        (size_or_err >= 0, size_or_err as usize)
    };
    ok_or_ret_errno!(success => bytes_read)
}

/// `poll(2)` over the given descriptors, transparently restarted after signal
/// interruption so callers never observe `EINTR`.
pub(crate) fn poll(fds: &mut [libc::pollfd], timeout_ms: c_int) -> io::Result<usize> {
    loop {
        let (success, ready) = unsafe {
            let result = libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms);
            (result != -1, result)
        };
        match ok_or_ret_errno!(success => ready as usize) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

pub(crate) fn duplicate_fd(fd: BorrowedFd<'_>) -> io::Result<OwnedFd> {
    #[cfg(target_os = "linux")]
    {
        let new_fd = fcntl_int(fd, libc::F_DUPFD_CLOEXEC, 0)?;
        // SAFETY: we just created this descriptor
        Ok(unsafe { OwnedFd::from_raw_fd(new_fd) })
    }
    #[cfg(not(target_os = "linux"))]
    {
        let (success, val) = unsafe {
            let ret = libc::dup(fd.as_raw_fd());
            (ret != -1, ret)
        };
        let new_fd = ok_or_ret_errno!(success => unsafe {
            // SAFETY: as above
            OwnedFd::from_raw_fd(val)
        })?;
        set_cloexec(new_fd.as_fd())?;
        Ok(new_fd)
    }
}

#[cfg(target_os = "linux")]
fn fcntl_int(fd: BorrowedFd<'_>, cmd: c_int, val: c_int) -> io::Result<c_int> {
    let ret = unsafe { libc::fcntl(fd.as_raw_fd(), cmd, val) };
    ok_or_ret_errno!(ret != -1 => ret)
}

pub(crate) fn set_nonblocking(fd: BorrowedFd<'_>, nonblocking: bool) -> io::Result<()> {
    let (old_flags, success) = unsafe {
        // F_GETFL wants no argument, but variadic fcntl is easier to call with one
        let result = libc::fcntl(fd.as_raw_fd(), libc::F_GETFL, 0);
        (result, result != -1)
    };
    if !success {
        return Err(io::Error::last_os_error());
    }
    let new_flags = if nonblocking {
        old_flags | libc::O_NONBLOCK
    } else {
        old_flags & !libc::O_NONBLOCK
    };
    let success = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, new_flags) != -1 };
    ok_or_ret_errno!(success => ())
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn set_cloexec(fd: BorrowedFd<'_>) -> io::Result<()> {
    let (flags, success) = unsafe {
        let ret = libc::fcntl(fd.as_raw_fd(), libc::F_GETFD, 0);
        (ret, ret != -1)
    };
    if !success {
        return Err(io::Error::last_os_error());
    }
    let success = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, flags | libc::FD_CLOEXEC) != -1 };
    ok_or_ret_errno!(success => ())
}

/// Consumes and returns the pending error of a deferred connect, if any.
pub(crate) fn take_error(fd: BorrowedFd<'_>) -> io::Result<Option<io::Error>> {
    let mut pending: c_int = 0;
    let mut len = size_of::<c_int>() as socklen_t;
    let success = unsafe {
        libc::getsockopt(
            fd.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            (&mut pending as *mut c_int).cast(),
            &mut len,
        ) != -1
    };
    ok_or_ret_errno!(success => (pending != 0).then(|| io::Error::from_raw_os_error(pending)))
}
