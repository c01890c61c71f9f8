//! Test utilities for driving endpoints on one reactor inside a single
//! process.
#![allow(dead_code, unused_macros)]

#[macro_use]
mod eyre;
#[macro_use]
mod namegen;
mod harness;

pub use {eyre::*, harness::*, namegen::*, xorshift::*};

pub fn testinit() {
    eyre::install();
}
