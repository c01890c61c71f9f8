use std::env::var_os;

fn main() {
    if var_os("CARGO_CFG_UNIX").is_some() {
        collect_sockaddr_features();
    }
}

/// This can define the following:
/// - `fdrelay_sun_len`, on platforms whose `sockaddr_un` starts with a
///   one-byte total-length field (the BSD family) which the address codec
///   fills in alongside the family tag
fn collect_sockaddr_features() {
    let os = var_os("CARGO_CFG_TARGET_OS")
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let length_prefixed = matches!(
        os.as_str(),
        "macos" | "ios" | "tvos" | "watchos" | "freebsd" | "openbsd" | "netbsd" | "dragonfly"
    );
    if length_prefixed {
        define("fdrelay_sun_len");
    }
}

fn define(cfg: &str) {
    println!("cargo:rustc-cfg={cfg}");
}
