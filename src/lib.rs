//! `lending-ops` library crate.
//!
//! The binary (`lops`) is a thin wrapper around this library so that:
//!
//! - the load -> validate -> filter -> aggregate -> forecast pipeline is testable without spawning processes
//! - data sources sit behind small seams (`QueryRunner`, `SecretProvider`) that tests can fake
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod filter;
pub mod forecast;
pub mod io;
pub mod math;
pub mod metrics;
pub mod plot;
pub mod quality;
pub mod report;
pub mod schema;
