//! The Unix-domain socket plumbing: syscall wrappers and the two wire-format
//! codecs (endpoint addresses and descriptor-passing control messages).

pub(crate) mod addr;
pub(crate) mod ancillary;
pub(crate) mod c_wrappers;

pub(crate) mod unixprelude {
    pub use {
        libc::{c_char, c_int, socklen_t},
        std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd},
    };
}
