use std::process::Command;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};

/// Run an external program to completion and return its stdout.
///
/// Blocks until the child exits; there is no timeout.
pub fn run_tool(command: &mut Command) -> ExtractResult<Vec<u8>> {
    let program = command.get_program().to_string_lossy().to_string();
    debug!("Running {:?}", command);

    let output = command.output().map_err(|source| ExtractError::Spawn {
        program: program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(ExtractError::ToolFailed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

/// Whether `program` can be launched at all (probe with `--version`).
pub fn is_installed(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}
