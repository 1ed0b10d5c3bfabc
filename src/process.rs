//! Subprocess execution helpers.
//!
//! Every external tool (version control, virtualenv, pip, make) is invoked
//! through these functions so that a failure always carries the command line
//! and the tool's own diagnostic text. Calls block until the child exits; no
//! timeout is applied.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Output, Stdio};
use std::thread;

use log::debug;

use crate::error::CommandError;

/// Render a command line for log and error messages.
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn spawn_error(cmd: &Command, e: std::io::Error) -> CommandError {
    CommandError::Spawn {
        command: describe(cmd),
        message: e.to_string(),
    }
}

/// Run a command to completion, capturing its output.
///
/// Returns the captured output when the command exits successfully.
pub fn output(cmd: &mut Command) -> Result<Output, CommandError> {
    debug!("running {}", describe(cmd));
    let output = cmd.output().map_err(|e| spawn_error(cmd, e))?;
    if !output.status.success() {
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if stderr.trim().is_empty() {
            // some tools (hg) report aborts on stdout
            stderr = String::from_utf8_lossy(&output.stdout).into_owned();
        }
        return Err(CommandError::Failed {
            command: describe(cmd),
            status: output.status.code(),
            stderr,
        });
    }
    Ok(output)
}

/// Run a command, discarding its output.
pub fn run(cmd: &mut Command) -> Result<(), CommandError> {
    output(cmd).map(|_| ())
}

/// Run a command with inherited stdio and return only whether it succeeded.
///
/// Used for targets whose result is nothing more than an exit status.
pub fn status(cmd: &mut Command) -> Result<(), CommandError> {
    debug!("running {}", describe(cmd));
    let status = cmd.status().map_err(|e| spawn_error(cmd, e))?;
    if !status.success() {
        return Err(CommandError::Failed {
            command: describe(cmd),
            status: status.code(),
            stderr: String::new(),
        });
    }
    Ok(())
}

/// Run a command, forwarding each stdout line to the debug log as it arrives.
pub fn run_streaming(cmd: &mut Command) -> Result<(), CommandError> {
    debug!("running {}", describe(cmd));
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(cmd, e))?;

    // drain stderr on the side so a chatty child cannot block on a full pipe
    let stderr = child.stderr.take();
    let drain = thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut text);
        }
        text
    });

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            debug!("{}", line.trim_end());
        }
    }

    let status = child.wait().map_err(|e| spawn_error(cmd, e))?;
    let stderr = drain.join().unwrap_or_default();
    if !status.success() {
        return Err(CommandError::Failed {
            command: describe(cmd),
            status: status.code(),
            stderr,
        });
    }
    Ok(())
}
