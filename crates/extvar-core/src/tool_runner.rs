//! Execution of the external NCO operators.
//!
//! Everything that touches a process goes through [`ToolRunner`], so the
//! extraction driver can be exercised against a recording runner in tests and
//! against [`DryRunRunner`] for `extvar run --dry-run`.
//!
//! Exit status is the only success signal: zero is success, anything else is
//! [`ExtvarError::ToolFailed`]. Missing inputs and unwritable outputs surface
//! this way because the operators report them themselves.

use serde::Serialize;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::Toolchain;
use crate::dispatch::Invocation;
use crate::error::{ExtvarError, Result};

/// Keep at most this much of a failing tool's output (the tail).
const MAX_OUTPUT: usize = 10 * 1024;

pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SystemRunner
// ---------------------------------------------------------------------------

/// Runs invocations as child processes and waits for each to exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        tracing::debug!(command = %invocation, "running");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ExtvarError::ToolSpawnFailed {
                program: invocation.program.clone(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ExtvarError::ToolFailed {
            program: invocation.program.clone(),
            code: output.status.code(),
            output: combine_output(&stdout, &stderr),
        })
    }
}

/// Combine stdout/stderr and cap to the last [`MAX_OUTPUT`] bytes.
fn combine_output(stdout: &str, stderr: &str) -> String {
    let output = match (stdout.trim(), stderr.trim()) {
        ("", err) => err.to_string(),
        (out, "") => out.to_string(),
        (out, err) => format!("{out}\n{err}"),
    };
    if output.len() <= MAX_OUTPUT {
        return output;
    }
    let mut start = output.len() - MAX_OUTPUT;
    while !output.is_char_boundary(start) {
        start += 1;
    }
    output[start..].to_string()
}

// ---------------------------------------------------------------------------
// DryRunRunner
// ---------------------------------------------------------------------------

/// Logs each invocation instead of running it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl ToolRunner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        tracing::info!(op = %invocation.op, "[dry-run] {invocation}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Toolchain detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolStatus {
    pub program: String,
    /// Resolved executable, `None` when it is not on `PATH`.
    pub path: Option<PathBuf>,
}

impl ToolStatus {
    pub fn available(&self) -> bool {
        self.path.is_some()
    }
}

/// Resolve each configured operator against `PATH`.
pub fn detect_toolchain(toolchain: &Toolchain) -> Vec<ToolStatus> {
    toolchain
        .programs()
        .iter()
        .map(|program| ToolStatus {
            program: program.to_string(),
            path: which::which(program).ok(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
