//! Command-line interface
//!
//! Argument definitions and command handlers for the `textclass` binary.

pub mod args;
pub mod commands;
