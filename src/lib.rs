//! Library entrypoint for sitzungsverwaltung.
//!
//! The primary interface is the `sitzungsverwaltung` binary. This lib target
//! exposes the modules to integration tests.

pub mod api_client;
pub mod config;
pub mod domain;
pub mod output;
pub mod release;
pub mod tui;
pub mod update;
