use {
    crate::{
        os::unix::{ancillary::RightsEnvelope, c_wrappers},
        tests::util::*,
    },
    color_eyre::eyre::{ensure, ContextCompat},
    std::{
        fs::File,
        mem::size_of,
        os::fd::{AsFd, AsRawFd},
    },
};

pub fn round_trip() -> TestResult {
    let donor = File::open("/dev/null")?;
    // Decoding takes ownership, so hand the envelope a duplicate to own.
    let dup = c_wrappers::duplicate_fd(donor.as_fd())?;
    let raw = dup.as_raw_fd();

    let envelope = RightsEnvelope::new(dup.as_fd());
    let controllen = envelope.controllen();
    let rights_len = unsafe { libc::CMSG_LEN(size_of::<libc::c_int>() as u32) } as usize;
    ensure_eq!(controllen, rights_len);

    let decoded = envelope.into_fd(controllen).context("well-formed envelope decoded as absent")?;
    ensure_eq!(decoded.as_raw_fd(), raw);
    std::mem::forget(dup); // ownership went to `decoded` through the envelope
    Ok(())
}

pub fn short_is_absent() -> TestResult {
    let envelope = RightsEnvelope::for_receive();
    ensure!(envelope.into_fd(0).is_none(), "empty control data must decode as absent");
    Ok(())
}

pub fn foreign_is_absent() -> TestResult {
    // An all-zeroes header has neither the right level nor the right type;
    // a plausible length alone must not produce a descriptor.
    let envelope = RightsEnvelope::for_receive();
    ensure!(
        envelope.into_fd(size_of::<RightsEnvelope>()).is_none(),
        "foreign control message must decode as absent"
    );
    Ok(())
}
