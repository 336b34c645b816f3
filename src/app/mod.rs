//! Application core: sequencing logic behind port traits.
//!
//! The observatory's operating rules live here: command parsing, the
//! altitude gate, the sequence state machine, bounded waits and retries.
//! All interaction with devices, the guider, the name resolver and the
//! clock happens through the **port traits** in [`ports`], so the whole
//! core runs against mocks in tests.

pub mod cancel;
pub mod commands;
pub mod events;
pub mod plan;
pub mod ports;
pub mod properties;
pub mod sequence;
pub mod service;
pub mod settle;
