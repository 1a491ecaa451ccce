//! Subprocess execution behind a trait, so the pipeline can be driven by a
//! fake runner in tests.

use std::ffi::{OsStr, OsString};
use std::io;
use std::process::{Command as ProcCommand, Stdio};

/// Captured result of one external process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs an external program to completion and captures its output.
///
/// Implementations must not inherit the caller's stdout/stderr. An `Err` is
/// returned only when the program could not be started at all; a non-zero
/// exit is reported through [`ProcessOutput::code`].
pub trait ProcessRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> io::Result<ProcessOutput>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, program: &OsStr, args: &[OsString]) -> io::Result<ProcessOutput> {
        (**self).run(program, args)
    }
}

/// Spawns real processes with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> io::Result<ProcessOutput> {
        let output = ProcCommand::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn system_runner_captures_exit_code_and_streams() {
        let args: Vec<OsString> = vec!["-c".into(), "echo out; echo err >&2; exit 3".into()];
        let output = SystemRunner.run(OsStr::new("sh"), &args).unwrap();
        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr_lossy(), "err\n");
    }

    #[test]
    fn system_runner_reports_missing_program() {
        let err = SystemRunner
            .run(OsStr::new("vid2gif-no-such-program"), &[])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
