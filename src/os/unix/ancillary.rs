//! The control-message envelope that carries exactly one file descriptor,
//! and the `sendmsg`/`recvmsg` staging around it.

use {
    super::{c_wrappers, unixprelude::*},
    libc::cmsghdr,
    std::{
        io,
        mem::{size_of, zeroed},
    },
};

/// The single byte of regular payload that accompanies every descriptor
/// transfer. At least one platform family refuses to deliver ancillary data
/// attached to a zero-length message, so one byte is always carried and
/// receivers always discard it; the value itself is a protocol-compatibility
/// shim, not payload.
pub(crate) const PAYLOAD_SENTINEL: u8 = 0x21;

fn rights_len() -> usize {
    unsafe {
        // SAFETY: no preconditions, just a libc pseudo-macro
        libc::CMSG_LEN(size_of::<c_int>() as u32) as usize
    }
}

/// Staging area for the descriptor-passing control message: one `cmsghdr`
/// immediately followed by the descriptor value as a native integer.
///
/// `repr(C)` makes the descriptor land where `CMSG_DATA` points (the header
/// is already aligned for `c_int`), and trailing struct padding rounds the
/// size up to what `CMSG_SPACE` would report, so the whole struct doubles as
/// a correctly sized receive buffer.
#[repr(C)]
pub(crate) struct RightsEnvelope {
    hdr: cmsghdr,
    fd: c_int,
}

impl RightsEnvelope {
    /// Stages a control message that hands `fd` across the connection.
    pub fn new(fd: BorrowedFd<'_>) -> Self {
        // SAFETY: cmsghdr is POD
        let mut hdr = unsafe { zeroed::<cmsghdr>() };
        hdr.cmsg_level = libc::SOL_SOCKET;
        hdr.cmsg_type = libc::SCM_RIGHTS;
        hdr.cmsg_len = rights_len() as _;
        Self { hdr, fd: fd.as_raw_fd() }
    }
    /// An all-zeroes envelope for `recvmsg` to fill in.
    pub fn for_receive() -> Self {
        // SAFETY: as above
        unsafe { zeroed() }
    }

    /// The value for `msg_controllen` when sending: the exact encoded length,
    /// not the padded buffer size.
    pub fn controllen(&self) -> usize {
        self.hdr.cmsg_len as usize
    }

    /// Extracts the descriptor `recvmsg` delivered, if any.
    ///
    /// `controllen` is what the kernel left in `msg_controllen`. A short or
    /// absent control message, a length-field mismatch, or a foreign
    /// level/type all mean "no descriptor available", never an error.
    pub fn into_fd(self, controllen: usize) -> Option<OwnedFd> {
        if controllen < rights_len() {
            return None;
        }
        if self.hdr.cmsg_level != libc::SOL_SOCKET || self.hdr.cmsg_type != libc::SCM_RIGHTS {
            return None;
        }
        if self.hdr.cmsg_len as usize != rights_len() {
            return None;
        }
        // SAFETY: the kernel wrote a descriptor it has transferred to this
        // process; wrapping it immediately is what keeps it from leaking
        Some(unsafe { OwnedFd::from_raw_fd(self.fd) })
    }
}

/// Performs one non-blocking attempt at sending `donor` over `fd`, together
/// with the mandatory payload byte.
pub(crate) fn send_one_fd(fd: BorrowedFd<'_>, donor: BorrowedFd<'_>) -> io::Result<()> {
    let envelope = RightsEnvelope::new(donor);
    let payload = [PAYLOAD_SENTINEL];
    let mut iov = libc::iovec {
        iov_base: payload.as_ptr().cast_mut().cast(),
        iov_len: 1,
    };
    // SAFETY: msghdr is POD
    let mut hdr = unsafe { zeroed::<libc::msghdr>() };
    hdr.msg_iov = &mut iov as *mut libc::iovec;
    hdr.msg_iovlen = 1;
    hdr.msg_control = (&envelope as *const RightsEnvelope).cast_mut().cast();
    hdr.msg_controllen = envelope.controllen() as _;
    c_wrappers::sendmsg(fd, &hdr).map(|_| ())
}

/// Performs one non-blocking attempt at receiving a descriptor from `fd`.
///
/// `Ok(None)` covers both a peer that closed without sending and a message
/// that did not carry a well-formed single-descriptor envelope.
pub(crate) fn recv_one_fd(fd: BorrowedFd<'_>) -> io::Result<Option<OwnedFd>> {
    let mut envelope = RightsEnvelope::for_receive();
    let mut payload = [0u8; 1];
    let mut iov = libc::iovec {
        iov_base: payload.as_mut_ptr().cast(),
        iov_len: 1,
    };
    // SAFETY: as above
    let mut hdr = unsafe { zeroed::<libc::msghdr>() };
    hdr.msg_iov = &mut iov as *mut libc::iovec;
    hdr.msg_iovlen = 1;
    hdr.msg_control = (&mut envelope as *mut RightsEnvelope).cast();
    hdr.msg_controllen = size_of::<RightsEnvelope>() as _;
    let bytes_read = c_wrappers::recvmsg(fd, &mut hdr)?;
    if bytes_read == 0 {
        // End of connection, which is a valid "no descriptor" outcome.
        return Ok(None);
    }
    let received = envelope.into_fd(hdr.msg_controllen as usize);
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    if let Some(fd) = &received {
        // MSG_CMSG_CLOEXEC is Linux-only; everyone else gets the fcntl dance.
        c_wrappers::set_cloexec(fd.as_fd())?;
    }
    Ok(received)
}
