//! notegen library
//!
//! Note class configuration engine: class inheritance, array merge operators,
//! deferred templates, and the prompt/view options built from resolved classes.

pub mod cli;
pub mod collab;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod periodic;
