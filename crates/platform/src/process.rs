//! Child process execution
//!
//! Three outcomes are kept apart because callers react differently: a
//! process that could not be started at all (`LaunchFailed`, retried once
//! after re-acquiring elevation), one that was killed by a signal
//! (`Crashed`, fatal) and one that exited normally with a non-zero code
//! (`NonZeroExit`).

use ifw_errors::{Error, ProcessError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Command builder
#[derive(Debug, Clone, Default)]
pub struct PlatformCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    stdin: Option<Vec<u8>>,
}

impl PlatformCommand {
    /// Create a new platform command
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<str>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set one environment variable on top of the inherited environment
    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<'a, I>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (k, v) in vars {
            self.env.insert(k.clone(), v.clone());
        }
        self
    }

    /// Bytes written to the child's stdin before it is closed
    pub fn stdin(&mut self, input: impl Into<Vec<u8>>) -> &mut Self {
        self.stdin = Some(input.into());
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// `program arg1 arg2` for logs and error messages
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion and capture output without judging the exit status
    ///
    /// # Errors
    ///
    /// `NotExecutable` if the program does not exist, `LaunchFailed` when
    /// it exists but cannot be started.
    pub async fn output(&self) -> Result<CommandOutput, Error> {
        if self.program.contains(std::path::MAIN_SEPARATOR)
            && !crate::filesystem::occupied(Path::new(&self.program)).await
        {
            return Err(ProcessError::NotExecutable {
                program: self.program.clone(),
            }
            .into());
        }

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        tracing::debug!(command = %self.display(), "spawning process");
        let mut child = command.spawn().map_err(|e| self.launch_error(&e))?;

        if let (Some(input), Some(mut stdin)) = (&self.stdin, child.stdin.take()) {
            use tokio::io::AsyncWriteExt;
            stdin
                .write_all(input)
                .await
                .map_err(|e| self.launch_error(&e))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.launch_error(&e))?;

        Ok(CommandOutput {
            code: output.status.code(),
            signal: exit_signal(&output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Run and require a zero exit code
    ///
    /// # Errors
    ///
    /// Everything [`Self::output`] returns, plus `Crashed` and `NonZeroExit`.
    pub async fn run(&self) -> Result<CommandOutput, Error> {
        let output = self.output().await?;
        output.check(&self.program)?;
        Ok(output)
    }

    /// Only a missing program is final; a permission or format error may
    /// go away once elevation is re-acquired
    fn launch_error(&self, err: &std::io::Error) -> Error {
        match err.kind() {
            std::io::ErrorKind::NotFound => ProcessError::NotExecutable {
                program: self.program.clone(),
            }
            .into(),
            _ => ProcessError::LaunchFailed {
                program: self.program.clone(),
                message: err.to_string(),
            }
            .into(),
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Output from command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Map the exit status to a typed error
    ///
    /// # Errors
    ///
    /// `Crashed` when there is no exit code, `NonZeroExit` otherwise.
    pub fn check(&self, program: &str) -> Result<(), ProcessError> {
        match self.code {
            Some(0) => Ok(()),
            Some(code) => Err(ProcessError::NonZeroExit {
                program: program.to_string(),
                code,
                stderr: self.stderr_lossy().trim().to_string(),
            }),
            None => Err(ProcessError::Crashed {
                program: program.to_string(),
                signal: self.signal,
            }),
        }
    }
}

/// Locate an executable on `PATH`
#[must_use]
pub fn which(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let output = PlatformCommand::new("sh")
            .args(["-c", "echo hello"])
            .run()
            .await
            .unwrap();
        assert_eq!(output.stdout_lossy().trim(), "hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let err = PlatformCommand::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .run()
            .await
            .unwrap_err();
        match err {
            Error::Process(ProcessError::NonZeroExit { code, stderr, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_crash_is_distinguished() {
        let err = PlatformCommand::new("sh")
            .args(["-c", "kill -9 $$"])
            .run()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Process(ProcessError::Crashed { signal: Some(9), .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = PlatformCommand::new("/definitely/not/here")
            .output()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Process(ProcessError::NotExecutable { .. })
        ));
    }

    #[tokio::test]
    async fn test_unstartable_program_is_launch_failure() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("setup.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = PlatformCommand::new(script.display().to_string())
            .output()
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Process(ProcessError::LaunchFailed { .. })),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_env_and_stdin() {
        let output = PlatformCommand::new("sh")
            .args(["-c", "read line; echo \"$GREETING $line\""])
            .env("GREETING", "hi")
            .stdin("there\n")
            .run()
            .await
            .unwrap();
        assert_eq!(output.stdout_lossy().trim(), "hi there");
    }
}
