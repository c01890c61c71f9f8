use {
    crate::{
        os::unix::addr::{SocketAddr, PATH_OFFSET, SUN_LEN},
        tests::util::*,
    },
    color_eyre::eyre::{bail, ensure},
    std::{io, os::unix::ffi::OsStrExt, path::Path},
};

pub fn round_trip() -> TestResult {
    let path = Path::new("/tmp/fdrelay-addr-codec.sock");
    let addr = SocketAddr::from_path(path)?;
    ensure_eq!(addr.path_bytes(), path.as_os_str().as_bytes());
    ensure_eq!(addr.family(), libc::AF_UNIX as libc::sa_family_t);
    // Header bytes, path bytes, terminator, nothing else.
    ensure_eq!(addr.len() as usize, PATH_OFFSET + path.as_os_str().len() + 1);
    Ok(())
}

pub fn fits_at_capacity() -> TestResult {
    // The longest path that fits leaves exactly one byte for the terminator.
    let longest = "x".repeat(SUN_LEN - 1);
    let addr = SocketAddr::from_path(Path::new(&longest))?;
    ensure_eq!(addr.path_bytes().len(), SUN_LEN - 1);
    Ok(())
}

pub fn rejects_overlong() -> TestResult {
    let overlong = format!("/tmp/{}", "x".repeat(SUN_LEN));
    match SocketAddr::from_path(Path::new(&overlong)) {
        Err(e) => {
            ensure!(
                e.kind() == io::ErrorKind::InvalidInput,
                "expected 'invalid input', received '{e}'"
            );
            Ok(())
        }
        Ok(_) => bail!("overlong path was not rejected"),
    }
}
