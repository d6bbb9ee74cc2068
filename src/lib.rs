//! Terminal client for the test-case studio.

pub mod cli;
pub mod config;
pub mod transport;
