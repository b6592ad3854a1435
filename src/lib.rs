//! A tiny shell with job control.
//!
//! Commands run as children in their own process groups. The shell tracks
//! them in a bounded job table and moves them between foreground,
//! background and stopped with `fg`, `bg` and the terminal's interrupt and
//! suspend keys.

pub mod config;
pub mod error;
mod shell;

pub use config::{Config, Startup};
pub use shell::Shell;
