//! Application surface: configuration and the command-line interface.

pub mod cli;
pub mod config;
