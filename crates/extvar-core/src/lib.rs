//! Core of `extvar`: typed configuration and catalog, the naming and dispatch
//! policy that turns one (ensemble, component, frequency, variable, month)
//! into NCO command lines, and the per-unit extraction driver.

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod io;
pub mod paths;
pub mod task;
pub mod tool_runner;
pub mod types;

pub use error::{ExtvarError, Result};
