//! Command-line interface: argument model and command handlers

pub mod args;
pub mod commands;
mod render;

pub use args::{Cli, Commands};
