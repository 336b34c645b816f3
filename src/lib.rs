//! Observatory sequencer library.
//!
//! Drives a roll-off-roof observatory through INDI: roof, cover and light
//! switches, target resolution with an altitude safety gate, slews, and
//! guided imaging sequences with dithering.  The domain core in [`app`]
//! talks to hardware only through port traits; [`adapters`] holds the
//! production implementations.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod filters;
pub mod fsm;
pub mod safety;
pub mod session;
pub mod sky;
