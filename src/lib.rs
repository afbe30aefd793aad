//! Manual splits timer for speedruns.
//!
//! Segment times are typed as six digits, committed against a loaded
//! comparison (world record or personal best), and diffed live. The core
//! ([`session`], [`ledger`], [`clock`], [`input`]) is pure state; rendering and
//! I/O sit on top of it in [`presentation`], [`export`] and [`driver`].

pub mod catalog;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod input;
pub mod ledger;
pub mod logging;
pub mod presentation;
pub mod session;
