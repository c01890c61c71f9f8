#![doc = include_str!("../README.md")]
// If this was in Cargo.toml, it would cover the demos as well
#![warn(
    missing_docs,
    clippy::panic_in_result_fn,
    clippy::missing_assert_message,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

#[cfg(not(unix))]
compile_error!("descriptor passing is a Unix-domain socket facility; fdrelay does not build for other platforms");

#[macro_use]
mod macros;

mod misc;
mod retry;

pub mod endpoint;
pub mod reactor;

mod os {
    pub(crate) mod unix;
}

pub use {
    endpoint::Endpoint,
    reactor::{Interest, PollReactor, Readiness, Reactor},
};

#[cfg(test)]
#[path = "../tests/index.rs"]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests;
