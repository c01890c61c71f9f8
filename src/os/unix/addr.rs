use {
    super::unixprelude::*,
    libc::{sa_family_t, sockaddr, sockaddr_un},
    std::{
        io,
        mem::{size_of, zeroed},
        os::unix::ffi::OsStrExt,
        path::Path,
        ptr::copy_nonoverlapping,
        slice,
    },
};

#[cold]
#[inline(never)]
fn path_too_long() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        "endpoint path length exceeds capacity of sun_path of sockaddr_un",
    )
}

/// Capacity of the `sun_path` field, one byte of which is reserved for the
/// nul terminator.
pub(crate) const SUN_LEN: usize = {
    let sun = unsafe { zeroed::<sockaddr_un>() };
    sun.sun_path.len()
};
/// Size of the header that precedes `sun_path`: the family tag, plus the
/// length prefix on platforms that have one. `sun_path` is the last field of
/// `sockaddr_un` on every supported platform, which makes this subtraction
/// the whole layout computation.
pub(crate) const PATH_OFFSET: usize = size_of::<sockaddr_un>() - SUN_LEN;

/// A fully encoded Unix-domain socket address: header bytes, path bytes and
/// nul terminator laid out the way `bind(2)`/`connect(2)` consume them,
/// paired with the length to pass alongside.
///
/// Every native-size assumption of the address wire format lives in this
/// module.
#[derive(Copy, Clone)]
pub(crate) struct SocketAddr {
    sun: sockaddr_un,
    len: socklen_t,
}

impl SocketAddr {
    /// Encodes a filesystem path, byte for byte, into a socket address.
    ///
    /// Fails fast with [`InvalidInput`](io::ErrorKind::InvalidInput) if the
    /// path does not fit `sun_path` together with its terminator, since
    /// silent truncation would name a different filesystem object than
    /// requested.
    #[allow(clippy::arithmetic_side_effects)] // bounded by SUN_LEN
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = path.as_os_str().as_bytes();
        if bytes.len() >= SUN_LEN {
            return Err(path_too_long());
        }
        // SAFETY: sockaddr_un is POD, and all-zeroes gives us the terminator
        // and empty padding for free
        let mut sun = unsafe { zeroed::<sockaddr_un>() };
        sun.sun_family = libc::AF_UNIX as sa_family_t;
        unsafe {
            // SAFETY: the length check above keeps this within sun_path
            copy_nonoverlapping(bytes.as_ptr(), sun.sun_path.as_mut_ptr().cast::<u8>(), bytes.len());
        }
        let len = (PATH_OFFSET + bytes.len() + 1) as socklen_t;
        #[cfg(fdrelay_sun_len)]
        {
            sun.sun_len = len as u8;
        }
        Ok(Self { sun, len })
    }

    /// Pointer to hand to `bind(2)`/`connect(2)`.
    pub fn as_ptr(&self) -> *const sockaddr {
        (&self.sun as *const sockaddr_un).cast()
    }
    /// Encoded length to hand to `bind(2)`/`connect(2)`, terminator included.
    pub fn len(&self) -> socklen_t {
        self.len
    }

    /// The address family tag as encoded.
    pub fn family(&self) -> sa_family_t {
        self.sun.sun_family
    }
    /// The path bytes as originally supplied, terminator excluded.
    #[allow(clippy::arithmetic_side_effects)] // len is at least PATH_OFFSET + 1
    pub fn path_bytes(&self) -> &[u8] {
        let len = self.len as usize - PATH_OFFSET - 1;
        // SAFETY: from_path initialized this many bytes of sun_path
        unsafe { slice::from_raw_parts(self.sun.sun_path.as_ptr().cast::<u8>(), len) }
    }
}
